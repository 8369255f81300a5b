//! Persistence collaborators: one trait per entity, backed by SQLite.
//!
//! `save` inserts when the entity id is 0 and updates otherwise, returning the
//! stored entity.

mod booking;
mod comment;
mod room;
mod time_slot;
mod user;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Booking, BookingStatus, Comment, NewUser, Room, TimeSlot, User};

pub use booking::SqliteBookingRepository;
pub use comment::SqliteCommentRepository;
pub use room::SqliteRoomRepository;
pub use time_slot::SqliteTimeSlotRepository;
pub use user::SqliteUserRepository;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn exists_by_email(&self, email: &str) -> Result<bool>;
    /// `None` when the email is already registered.
    async fn insert(&self, user: NewUser) -> Result<Option<User>>;
    async fn set_locked(&self, id: i64, locked: bool) -> Result<()>;
}

#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Room>>;
    async fn exists_by_id(&self, id: i64) -> Result<bool>;
    async fn find_all(&self) -> Result<Vec<Room>>;
    async fn find_by_city(&self, city: &str, zip_code: i64) -> Result<Vec<Room>>;
    /// `day` is the weekday name as stored, e.g. `Mon`.
    async fn find_by_city_and_day(&self, city: &str, zip_code: i64, day: &str) -> Result<Vec<Room>>;
    /// Rooms that have coordinates; distance filtering happens in the service.
    async fn find_with_coordinates(&self) -> Result<Vec<Room>>;
    async fn find_by_type(&self, room_type: &str) -> Result<Vec<Room>>;
    async fn find_by_equipment(&self, equipment: &str) -> Result<Vec<Room>>;
    async fn find_by_owner(&self, owner_id: i64) -> Result<Vec<Room>>;
    async fn all_types(&self) -> Result<Vec<String>>;
    async fn all_equipments(&self) -> Result<Vec<String>>;
    async fn save(&self, room: Room) -> Result<Room>;
    async fn delete_by_id(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Booking>>;
    async fn find_by_room(&self, room_id: i64) -> Result<Vec<Booking>>;
    async fn find_by_client_and_room(&self, client_id: i64, room_id: i64) -> Result<Vec<Booking>>;
    async fn save(&self, booking: Booking) -> Result<Booking>;
    async fn update_status(&self, id: i64, status: BookingStatus) -> Result<()>;
    async fn delete_by_id(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>>;
    async fn find_by_room(&self, room_id: i64) -> Result<Vec<Comment>>;
    async fn has_comment(&self, room_id: i64, author_id: i64) -> Result<bool>;
    async fn save(&self, comment: Comment) -> Result<Comment>;
    async fn delete_by_id(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait TimeSlotRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<TimeSlot>>;
    async fn exists_by_id(&self, id: i64) -> Result<bool>;
    async fn save(&self, slot: TimeSlot) -> Result<TimeSlot>;
    async fn delete_by_id(&self, id: i64) -> Result<()>;
}
