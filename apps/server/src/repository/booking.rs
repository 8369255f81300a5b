use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::SqlitePool;

use super::BookingRepository;
use crate::models::{Booking, BookingStatus};

const BOOKING_SELECT: &str =
    "SELECT id, status, begin_at, end_at, week_repetition, price, client_id, room_id FROM bookings";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    status: String,
    begin_at: NaiveDateTime,
    end_at: NaiveDateTime,
    week_repetition: i64,
    price: f64,
    client_id: i64,
    room_id: i64,
}

impl TryFrom<BookingRow> for Booking {
    type Error = anyhow::Error;

    fn try_from(row: BookingRow) -> Result<Self> {
        Ok(Booking {
            id: row.id,
            status: row.status.parse::<BookingStatus>().map_err(|e| anyhow!(e))?,
            begin: row.begin_at,
            end: row.end_at,
            week_repetition: u32::try_from(row.week_repetition)
                .with_context(|| format!("booking {} has invalid week_repetition", row.id))?,
            price: row.price,
            client_id: row.client_id,
            room_id: row.room_id,
        })
    }
}

#[derive(Clone)]
pub struct SqliteBookingRepository {
    db: SqlitePool,
}

impl SqliteBookingRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

fn into_bookings(rows: Vec<BookingRow>) -> Result<Vec<Booking>> {
    rows.into_iter().map(Booking::try_from).collect()
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("{BOOKING_SELECT} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find booking by id")?;
        row.map(Booking::try_from).transpose()
    }

    async fn find_by_room(&self, room_id: i64) -> Result<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "{BOOKING_SELECT} WHERE room_id = ? ORDER BY begin_at ASC"
        ))
        .bind(room_id)
        .fetch_all(&self.db)
        .await
        .context("find bookings by room")?;
        into_bookings(rows)
    }

    async fn find_by_client_and_room(&self, client_id: i64, room_id: i64) -> Result<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "{BOOKING_SELECT} WHERE client_id = ? AND room_id = ? ORDER BY begin_at ASC"
        ))
        .bind(client_id)
        .bind(room_id)
        .fetch_all(&self.db)
        .await
        .context("find bookings by client and room")?;
        into_bookings(rows)
    }

    async fn save(&self, booking: Booking) -> Result<Booking> {
        let id = if booking.id == 0 {
            sqlx::query(
                "INSERT INTO bookings (status, begin_at, end_at, week_repetition, price, client_id, room_id)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(booking.status.as_str())
            .bind(booking.begin)
            .bind(booking.end)
            .bind(i64::from(booking.week_repetition))
            .bind(booking.price)
            .bind(booking.client_id)
            .bind(booking.room_id)
            .execute(&self.db)
            .await
            .context("insert booking")?
            .last_insert_rowid()
        } else {
            sqlx::query(
                "UPDATE bookings SET status = ?, begin_at = ?, end_at = ?, week_repetition = ?, price = ?,
                 client_id = ?, room_id = ?
                 WHERE id = ?",
            )
            .bind(booking.status.as_str())
            .bind(booking.begin)
            .bind(booking.end)
            .bind(i64::from(booking.week_repetition))
            .bind(booking.price)
            .bind(booking.client_id)
            .bind(booking.room_id)
            .bind(booking.id)
            .execute(&self.db)
            .await
            .context("update booking")?;
            booking.id
        };

        self.find_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("booking {id} vanished after save"))
    }

    async fn update_status(&self, id: i64, status: BookingStatus) -> Result<()> {
        sqlx::query("UPDATE bookings SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.db)
            .await
            .context("update booking status")?;
        Ok(())
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM bookings WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete booking")?;
        Ok(())
    }
}
