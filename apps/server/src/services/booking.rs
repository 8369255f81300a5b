use std::sync::Arc;

use crate::auth::{authorize_owner, require_user};
use crate::error::AppError;
use crate::models::{Booking, BookingStatus, CreateBookingRequest, Room, User};
use crate::repository::{BookingRepository, RoomRepository};

/// Longest allowed distance between a booking's first and last day.
const MAX_BOOKING_SPAN_DAYS: i64 = 366;

#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    rooms: Arc<dyn RoomRepository>,
}

impl BookingService {
    pub fn new(bookings: Arc<dyn BookingRepository>, rooms: Arc<dyn RoomRepository>) -> Self {
        Self { bookings, rooms }
    }

    async fn room(&self, room_id: i64) -> Result<Room, AppError> {
        self.rooms
            .find_by_id(room_id)
            .await?
            .ok_or_else(|| AppError::not_found("Room"))
    }

    async fn booking(&self, id: i64) -> Result<Booking, AppError> {
        self.bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Booking"))
    }

    /// Book a room for the actor. The price is computed from the room's rate.
    pub async fn create(
        &self,
        req: CreateBookingRequest,
        actor: Option<&User>,
    ) -> Result<Booking, AppError> {
        let client = require_user(actor)?;
        let room = self.room(req.room_id).await?;

        if req.begin > req.end {
            return Err(AppError::validation("Booking must begin before it ends"));
        }
        if req.end.time() < req.begin.time() {
            return Err(AppError::validation(
                "Booking end time must not be earlier than its begin time",
            ));
        }
        if (req.end.date() - req.begin.date()).num_days() > MAX_BOOKING_SPAN_DAYS {
            return Err(AppError::validation(format!(
                "Booking cannot span more than {MAX_BOOKING_SPAN_DAYS} days"
            )));
        }

        let mut booking = Booking {
            id: 0,
            status: BookingStatus::Pending,
            begin: req.begin,
            end: req.end,
            week_repetition: req.week_repetition,
            price: 0.0,
            client_id: client.id,
            room_id: room.id,
        };
        booking.calculate_price(room.price);

        let booking = self.bookings.save(booking).await?;
        tracing::info!(
            booking_id = booking.id,
            room_id = room.id,
            client_id = client.id,
            price = booking.price,
            "booking created"
        );
        Ok(booking)
    }

    /// A booking, visible to its client and to the room owner.
    pub async fn find_by_id(&self, id: i64, actor: Option<&User>) -> Result<Booking, AppError> {
        let user = require_user(actor)?;
        let booking = self.booking(id).await?;
        if booking.client_id == user.id {
            return Ok(booking);
        }
        let room = self.room(booking.room_id).await?;
        authorize_owner(actor, room.owner_id)?;
        Ok(booking)
    }

    /// All bookings of a room, for its owner.
    pub async fn find_by_room(
        &self,
        room_id: i64,
        actor: Option<&User>,
    ) -> Result<Vec<Booking>, AppError> {
        let room = self.room(room_id).await?;
        authorize_owner(actor, room.owner_id)?;
        Ok(self.bookings.find_by_room(room_id).await?)
    }

    /// The actor's own bookings of a room.
    pub async fn find_mine_for_room(
        &self,
        room_id: i64,
        actor: Option<&User>,
    ) -> Result<Vec<Booking>, AppError> {
        let client = require_user(actor)?;
        let room = self.room(room_id).await?;
        Ok(self.bookings.find_by_client_and_room(client.id, room.id).await?)
    }

    /// The room owner may set any status; the client may only cancel.
    pub async fn update_status(
        &self,
        id: i64,
        status: BookingStatus,
        actor: Option<&User>,
    ) -> Result<Booking, AppError> {
        let user = require_user(actor)?;
        let mut booking = self.booking(id).await?;
        let room = self.room(booking.room_id).await?;

        let is_owner = room.owner_id == user.id;
        let is_client = booking.client_id == user.id;
        if !is_owner && !(is_client && status == BookingStatus::Cancelled) {
            tracing::warn!(booking_id = id, user_id = user.id, %status, "status change refused");
            return Err(AppError::forbidden());
        }
        if booking.status == BookingStatus::Cancelled && status != BookingStatus::Cancelled {
            return Err(AppError::validation("A cancelled booking cannot be reopened"));
        }

        self.bookings.update_status(id, status).await?;
        booking.status = status;
        tracing::info!(booking_id = id, %status, "booking status changed");
        Ok(booking)
    }

    pub async fn delete(&self, id: i64, actor: Option<&User>) -> Result<(), AppError> {
        let booking = self.booking(id).await?;
        authorize_owner(actor, booking.client_id)?;
        self.bookings.delete_by_id(id).await?;
        tracing::info!(booking_id = id, "booking deleted");
        Ok(())
    }
}
