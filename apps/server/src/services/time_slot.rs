use std::sync::Arc;

use crate::auth::{require_admin, require_user};
use crate::error::AppError;
use crate::models::{CreateTimeSlotRequest, TimeSlot, User};
use crate::repository::TimeSlotRepository;

#[derive(Clone)]
pub struct TimeSlotService {
    slots: Arc<dyn TimeSlotRepository>,
}

impl TimeSlotService {
    pub fn new(slots: Arc<dyn TimeSlotRepository>) -> Self {
        Self { slots }
    }

    pub async fn list(&self) -> Result<Vec<TimeSlot>, AppError> {
        Ok(self.slots.find_all().await?)
    }

    pub async fn create(
        &self,
        req: CreateTimeSlotRequest,
        actor: Option<&User>,
    ) -> Result<TimeSlot, AppError> {
        require_user(actor)?;
        if req.start > req.end {
            return Err(AppError::validation("Time slot must start before it ends"));
        }
        Ok(self
            .slots
            .save(TimeSlot {
                id: 0,
                start: req.start,
                end: req.end,
            })
            .await?)
    }

    pub async fn delete(&self, id: i64, actor: Option<&User>) -> Result<(), AppError> {
        require_admin(actor)?;
        if !self.slots.exists_by_id(id).await? {
            return Err(AppError::not_found("Time slot"));
        }
        self.slots.delete_by_id(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::repository::SqliteTimeSlotRepository;
    use crate::test_support::{at, insert_admin, insert_user};

    #[tokio::test]
    async fn test_time_slot_lifecycle() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "user@example.com").await;
        let admin = insert_admin(&pool, "admin@example.com").await;
        let svc = TimeSlotService::new(Arc::new(SqliteTimeSlotRepository::new(pool)));

        let req = || CreateTimeSlotRequest {
            start: at("01/01/2024 09:00"),
            end: at("01/01/2024 10:00"),
        };
        assert!(matches!(svc.create(req(), None).await, Err(AppError::Forbidden(_))));
        let slot = svc.create(req(), Some(&user)).await.unwrap();
        assert_eq!(svc.list().await.unwrap(), vec![slot.clone()]);

        let inverted = CreateTimeSlotRequest {
            start: at("01/01/2024 10:00"),
            end: at("01/01/2024 09:00"),
        };
        assert!(matches!(svc.create(inverted, Some(&user)).await, Err(AppError::Validation(_))));

        assert!(matches!(svc.delete(slot.id, Some(&user)).await, Err(AppError::Forbidden(_))));
        assert!(matches!(svc.delete(404, Some(&admin)).await, Err(AppError::NotFound(_))));
        svc.delete(slot.id, Some(&admin)).await.unwrap();
        assert!(svc.list().await.unwrap().is_empty());
    }
}
