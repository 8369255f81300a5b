//! Business rules over the repositories. The acting user is passed explicitly
//! to every operation that needs authorization.

mod admin;
mod booking;
mod comment;
mod room;
mod time_slot;
mod user;

pub use admin::AdminService;
pub use booking::BookingService;
pub use comment::CommentService;
pub use room::RoomService;
pub use time_slot::TimeSlotService;
pub use user::UserService;
