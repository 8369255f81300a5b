use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;

use super::CommentRepository;
use crate::models::Comment;

const COMMENT_SELECT: &str = "SELECT id, content, created_on, rating, author_id, room_id FROM comments";

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    content: String,
    created_on: chrono::NaiveDate,
    rating: i32,
    author_id: i64,
    room_id: i64,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            content: row.content,
            created_on: row.created_on,
            rating: row.rating,
            author_id: row.author_id,
            room_id: row.room_id,
        }
    }
}

#[derive(Clone)]
pub struct SqliteCommentRepository {
    db: SqlitePool,
}

impl SqliteCommentRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CommentRepository for SqliteCommentRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(&format!("{COMMENT_SELECT} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find comment by id")?;
        Ok(row.map(Comment::from))
    }

    async fn find_by_room(&self, room_id: i64) -> Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "{COMMENT_SELECT} WHERE room_id = ? ORDER BY created_on DESC, id DESC"
        ))
        .bind(room_id)
        .fetch_all(&self.db)
        .await
        .context("find comments by room")?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn has_comment(&self, room_id: i64, author_id: i64) -> Result<bool> {
        let exists = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM comments WHERE room_id = ? AND author_id = ?",
        )
        .bind(room_id)
        .bind(author_id)
        .fetch_one(&self.db)
        .await?;
        Ok(exists)
    }

    async fn save(&self, comment: Comment) -> Result<Comment> {
        let id = if comment.id == 0 {
            sqlx::query(
                "INSERT INTO comments (content, created_on, rating, author_id, room_id)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&comment.content)
            .bind(comment.created_on)
            .bind(comment.rating)
            .bind(comment.author_id)
            .bind(comment.room_id)
            .execute(&self.db)
            .await
            .context("insert comment")?
            .last_insert_rowid()
        } else {
            sqlx::query("UPDATE comments SET content = ?, rating = ? WHERE id = ?")
                .bind(&comment.content)
                .bind(comment.rating)
                .bind(comment.id)
                .execute(&self.db)
                .await
                .context("update comment")?;
            comment.id
        };

        self.find_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("comment {id} vanished after save"))
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete comment")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::repository::{RoomRepository, SqliteRoomRepository};
    use crate::test_support::{insert_user, sample_room};
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_has_comment() {
        let pool = test_pool().await;
        let owner = insert_user(&pool, "owner@example.com").await;
        let author = insert_user(&pool, "author@example.com").await;
        let room = SqliteRoomRepository::new(pool.clone())
            .save(sample_room(owner.id, "nantes", 44000))
            .await
            .unwrap();
        let repo = SqliteCommentRepository::new(pool);

        assert!(!repo.has_comment(room.id, author.id).await.unwrap());
        let saved = repo
            .save(Comment {
                id: 0,
                content: "Bright and quiet".into(),
                created_on: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                rating: 5,
                author_id: author.id,
                room_id: room.id,
            })
            .await
            .unwrap();

        assert!(repo.has_comment(room.id, author.id).await.unwrap());
        assert!(!repo.has_comment(room.id, owner.id).await.unwrap());
        assert_eq!(repo.find_by_room(room.id).await.unwrap(), vec![saved.clone()]);

        repo.delete_by_id(saved.id).await.unwrap();
        assert!(repo.find_by_room(room.id).await.unwrap().is_empty());
    }
}
