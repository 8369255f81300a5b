use std::sync::Arc;

use crate::auth::require_admin;
use crate::error::AppError;
use crate::models::User;
use crate::repository::UserRepository;

#[derive(Clone)]
pub struct AdminService {
    users: Arc<dyn UserRepository>,
}

impl AdminService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Lock or unlock an account. Locked accounts cannot authenticate.
    pub async fn set_locked(
        &self,
        actor: Option<&User>,
        user_id: i64,
        locked: bool,
    ) -> Result<User, AppError> {
        let admin = require_admin(actor)?;
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::not_found("User"));
        }

        self.users.set_locked(user_id, locked).await?;
        tracing::info!(admin_id = admin.id, user_id, locked, "account lock changed");

        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }
}
