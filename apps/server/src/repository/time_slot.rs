use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::SqlitePool;

use super::TimeSlotRepository;
use crate::models::TimeSlot;

#[derive(sqlx::FromRow)]
struct TimeSlotRow {
    id: i64,
    start_at: NaiveDateTime,
    end_at: NaiveDateTime,
}

impl From<TimeSlotRow> for TimeSlot {
    fn from(row: TimeSlotRow) -> Self {
        TimeSlot {
            id: row.id,
            start: row.start_at,
            end: row.end_at,
        }
    }
}

#[derive(Clone)]
pub struct SqliteTimeSlotRepository {
    db: SqlitePool,
}

impl SqliteTimeSlotRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<TimeSlot>> {
        let row = sqlx::query_as::<_, TimeSlotRow>(
            "SELECT id, start_at, end_at FROM time_slots WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(TimeSlot::from))
    }
}

#[async_trait]
impl TimeSlotRepository for SqliteTimeSlotRepository {
    async fn find_all(&self) -> Result<Vec<TimeSlot>> {
        let rows = sqlx::query_as::<_, TimeSlotRow>(
            "SELECT id, start_at, end_at FROM time_slots ORDER BY start_at ASC",
        )
        .fetch_all(&self.db)
        .await
        .context("list time slots")?;
        Ok(rows.into_iter().map(TimeSlot::from).collect())
    }

    async fn exists_by_id(&self, id: i64) -> Result<bool> {
        let exists = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM time_slots WHERE id = ?")
            .bind(id)
            .fetch_one(&self.db)
            .await?;
        Ok(exists)
    }

    async fn save(&self, slot: TimeSlot) -> Result<TimeSlot> {
        let id = if slot.id == 0 {
            sqlx::query("INSERT INTO time_slots (start_at, end_at) VALUES (?, ?)")
                .bind(slot.start)
                .bind(slot.end)
                .execute(&self.db)
                .await
                .context("insert time slot")?
                .last_insert_rowid()
        } else {
            sqlx::query("UPDATE time_slots SET start_at = ?, end_at = ? WHERE id = ?")
                .bind(slot.start)
                .bind(slot.end)
                .bind(slot.id)
                .execute(&self.db)
                .await
                .context("update time slot")?;
            slot.id
        };

        self.find_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("time slot {id} vanished after save"))
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM time_slots WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete time slot")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::test_support::at;

    #[tokio::test]
    async fn test_save_list_delete() {
        let repo = SqliteTimeSlotRepository::new(test_pool().await);
        let later = repo
            .save(TimeSlot { id: 0, start: at("02/01/2024 09:00"), end: at("02/01/2024 10:00") })
            .await
            .unwrap();
        let earlier = repo
            .save(TimeSlot { id: 0, start: at("01/01/2024 09:00"), end: at("01/01/2024 10:00") })
            .await
            .unwrap();

        assert_eq!(repo.find_all().await.unwrap(), vec![earlier, later.clone()]);
        assert!(repo.exists_by_id(later.id).await.unwrap());

        repo.delete_by_id(later.id).await.unwrap();
        assert!(!repo.exists_by_id(later.id).await.unwrap());
    }
}
