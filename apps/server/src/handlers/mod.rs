pub mod admin;
pub mod booking;
pub mod comment;
pub mod health;
pub mod room;
pub mod time_slot;
pub mod user;
