use std::sync::Arc;

use crate::auth::{authorize_owner, require_user};
use crate::error::AppError;
use crate::models::{Comment, CreateCommentRequest, User};
use crate::repository::{BookingRepository, CommentRepository, RoomRepository};

const RATING_RANGE: std::ops::RangeInclusive<i32> = 1..=5;

#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    bookings: Arc<dyn BookingRepository>,
    rooms: Arc<dyn RoomRepository>,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        bookings: Arc<dyn BookingRepository>,
        rooms: Arc<dyn RoomRepository>,
    ) -> Self {
        Self {
            comments,
            bookings,
            rooms,
        }
    }

    async fn ensure_room(&self, room_id: i64) -> Result<(), AppError> {
        if self.rooms.exists_by_id(room_id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("Room"))
        }
    }

    /// Only clients who booked the room may comment, once.
    pub async fn create(
        &self,
        room_id: i64,
        req: CreateCommentRequest,
        actor: Option<&User>,
    ) -> Result<Comment, AppError> {
        let author = require_user(actor)?;
        self.ensure_room(room_id).await?;

        let content = req.content.trim();
        if content.is_empty() {
            return Err(AppError::validation("Comment content is required"));
        }
        if !RATING_RANGE.contains(&req.rating) {
            return Err(AppError::validation("Rating must be between 1 and 5"));
        }

        if self
            .bookings
            .find_by_client_and_room(author.id, room_id)
            .await?
            .is_empty()
        {
            return Err(AppError::Forbidden("Only clients of this room can comment".into()));
        }
        if self.comments.has_comment(room_id, author.id).await? {
            return Err(AppError::Forbidden("Room already commented".into()));
        }

        let comment = self
            .comments
            .save(Comment {
                id: 0,
                content: content.to_string(),
                created_on: chrono::Utc::now().date_naive(),
                rating: req.rating,
                author_id: author.id,
                room_id,
            })
            .await?;
        tracing::info!(comment_id = comment.id, room_id, "comment created");
        Ok(comment)
    }

    pub async fn find_by_room(&self, room_id: i64) -> Result<Vec<Comment>, AppError> {
        self.ensure_room(room_id).await?;
        Ok(self.comments.find_by_room(room_id).await?)
    }

    pub async fn delete(&self, id: i64, actor: Option<&User>) -> Result<(), AppError> {
        let comment = self
            .comments
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment"))?;
        authorize_owner(actor, comment.author_id)?;
        self.comments.delete_by_id(id).await?;
        Ok(())
    }
}
