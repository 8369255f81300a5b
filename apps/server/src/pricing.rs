//! Booking date expansion and price calculation.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;

/// Surcharge applied on top of the raw price: `price += price / SURCHARGE_DIVISOR`.
const SURCHARGE_DIVISOR: f64 = 10.0;

/// Calendar dates covered by a booking.
///
/// A booking with no repetition, or one that starts and ends on the same day,
/// covers only its first day. Otherwise it covers every `week_repetition`-th
/// week from the begin date up to and including the end date.
pub fn booking_dates(
    begin: NaiveDateTime,
    end: NaiveDateTime,
    week_repetition: u32,
) -> BTreeSet<NaiveDate> {
    let first = begin.date();
    let last = end.date();

    if week_repetition == 0 || first == last {
        return BTreeSet::from([first]);
    }

    let step = Duration::weeks(i64::from(week_repetition));
    let mut dates = BTreeSet::new();
    let mut current = first;
    while current <= last {
        dates.insert(current);
        match current.checked_add_signed(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    dates
}

/// Whole hours between the time-of-day parts, truncated toward zero.
///
/// Negative when `end`'s time of day is before `begin`'s; callers decide
/// whether that is acceptable.
pub fn duration_hours(begin: NaiveDateTime, end: NaiveDateTime) -> i64 {
    (end.time() - begin.time()).num_hours()
}

pub fn calculate_price(date_count: usize, hours: i64, hourly_price: f64) -> f64 {
    let raw = date_count as f64 * hours as f64 * hourly_price;
    raw + raw / SURCHARGE_DIVISOR
}
