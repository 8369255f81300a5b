use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::date_utils::datetime_format;
use crate::pricing;

// ── Domain models ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub account_locked: bool,
    pub role: Role,
    pub created_at: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A user about to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    pub city: String,
    pub zip_code: i64,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// A bookable room. Also the request body of room creation and update;
/// `id` is 0 for a room not yet stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "type")]
    pub room_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub equipments: BTreeSet<String>,
    /// Weekdays the room can be booked on.
    #[serde(default)]
    pub days: Vec<Weekday>,
    pub price: f64,
    pub address: Address,
    pub owner_id: i64,
}

impl Room {
    pub fn is_open_on(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl Default for BookingStatus {
    fn default() -> Self {
        BookingStatus::Pending
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    pub id: i64,
    pub status: BookingStatus,
    #[serde(with = "datetime_format")]
    pub begin: NaiveDateTime,
    #[serde(with = "datetime_format")]
    pub end: NaiveDateTime,
    pub week_repetition: u32,
    pub price: f64,
    pub client_id: i64,
    pub room_id: i64,
}

impl Booking {
    /// Dates this booking occupies.
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        pricing::booking_dates(self.begin, self.end, self.week_repetition)
    }

    pub fn duration_hours(&self) -> i64 {
        pricing::duration_hours(self.begin, self.end)
    }

    pub fn calculate_price(&mut self, hourly_price: f64) {
        self.price =
            pricing::calculate_price(self.dates().len(), self.duration_hours(), hourly_price);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub created_on: NaiveDate,
    pub rating: i32,
    pub author_id: i64,
    pub room_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSlot {
    pub id: i64,
    #[serde(with = "datetime_format")]
    pub start: NaiveDateTime,
    #[serde(with = "datetime_format")]
    pub end: NaiveDateTime,
}

// ── API request/response types ──

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthenticationRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthenticationResponse {
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoomSearchQuery {
    pub city: Option<String>,
    pub zip_code: Option<i64>,
    pub day: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Booking creation body. Any client-supplied price is ignored.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub room_id: i64,
    #[serde(with = "datetime_format")]
    pub begin: NaiveDateTime,
    #[serde(with = "datetime_format")]
    pub end: NaiveDateTime,
    #[serde(default)]
    pub week_repetition: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    pub rating: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateTimeSlotRequest {
    #[serde(with = "datetime_format")]
    pub start: NaiveDateTime,
    #[serde(with = "datetime_format")]
    pub end: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct LockRequest {
    pub locked: bool,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
