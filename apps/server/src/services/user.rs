use std::sync::Arc;

use crate::auth::{self, JwtService};
use crate::error::AppError;
use crate::models::{NewUser, Role, SignupRequest, User};
use crate::repository::UserRepository;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    jwt: JwtService,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, jwt: JwtService) -> Self {
        Self { users, jwt }
    }

    pub async fn signup(&self, req: SignupRequest) -> Result<User, AppError> {
        let email = normalize_email(&req.email);
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::validation("A valid email is required"));
        }
        if req.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
            return Err(AppError::validation("First and last name are required"));
        }
        if self.users.exists_by_email(&email).await? {
            return Err(AppError::validation("Email already registered"));
        }

        let password_hash = auth::hash_password(req.password).await?;
        // A concurrent signup may have claimed the email since the check above.
        let user = self
            .users
            .insert(NewUser {
                email,
                password_hash,
                first_name: req.first_name.trim().to_string(),
                last_name: req.last_name.trim().to_string(),
                role: Role::User,
            })
            .await?
            .ok_or_else(|| AppError::validation("Email already registered"))?;

        tracing::info!(user_id = user.id, "user signed up");
        Ok(user)
    }

    /// Check credentials and issue a token.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AppError::BadCredentials)?;

        if !auth::verify_password(password.to_string(), user.password_hash.clone()).await? {
            tracing::warn!(user_id = user.id, "authentication failed: wrong password");
            return Err(AppError::BadCredentials);
        }
        if user.account_locked {
            tracing::warn!(user_id = user.id, "authentication refused: account locked");
            return Err(AppError::BadCredentials);
        }

        self.jwt.generate_token(&user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<User, AppError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    pub async fn load_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.find_by_email(email).await?)
    }
}

/// Emails are stored and matched lowercased.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::repository::SqliteUserRepository;

    fn signup_request(email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            email: email.into(),
            password: password.into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        }
    }

    async fn service() -> (UserService, JwtService, sqlx::SqlitePool) {
        let pool = test_pool().await;
        let jwt = JwtService::new("test-secret", 3600);
        let svc = UserService::new(Arc::new(SqliteUserRepository::new(pool.clone())), jwt.clone());
        (svc, jwt, pool)
    }

    #[tokio::test]
    async fn test_signup_then_authenticate() {
        let (svc, jwt, _pool) = service().await;
        let user = svc
            .signup(signup_request(" ada@example.com ", "long enough"))
            .await
            .unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_ne!(user.password_hash, "long enough");

        let token = svc.authenticate("ada@example.com", "long enough").await.unwrap();
        assert!(jwt.validate_token(&token, &user));
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let (svc, _, _pool) = service().await;
        assert!(matches!(
            svc.signup(signup_request("not-an-email", "long enough")).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            svc.signup(signup_request("ada@example.com", "short")).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_signup_duplicate_email() {
        let (svc, _, _pool) = service().await;
        svc.signup(signup_request("ada@example.com", "long enough")).await.unwrap();
        assert!(matches!(
            svc.signup(signup_request("ada@example.com", "another one")).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_duplicate_signup() {
        let (svc, _, _pool) = service().await;
        let (a, b) = tokio::join!(
            svc.signup(signup_request("ada@example.com", "long enough")),
            svc.signup(signup_request("ada@example.com", "long enough")),
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(AppError::Validation(_)))));
    }

    #[tokio::test]
    async fn test_email_is_case_insensitive() {
        let (svc, _, _pool) = service().await;
        let user = svc
            .signup(signup_request("Ada@Example.com", "long enough"))
            .await
            .unwrap();
        assert_eq!(user.email, "ada@example.com");

        assert!(matches!(
            svc.signup(signup_request("ada@example.COM", "another one")).await,
            Err(AppError::Validation(_))
        ));
        assert!(svc.authenticate("ADA@example.com", "long enough").await.is_ok());
    }

    #[tokio::test]
    async fn test_authenticate_bad_credentials() {
        let (svc, _, _pool) = service().await;
        svc.signup(signup_request("ada@example.com", "long enough")).await.unwrap();

        assert!(matches!(
            svc.authenticate("ada@example.com", "wrong password").await,
            Err(AppError::BadCredentials)
        ));
        assert!(matches!(
            svc.authenticate("nobody@example.com", "long enough").await,
            Err(AppError::BadCredentials)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_locked_account() {
        let (svc, _, pool) = service().await;
        let user = svc.signup(signup_request("ada@example.com", "long enough")).await.unwrap();
        SqliteUserRepository::new(pool).set_locked(user.id, true).await.unwrap();

        assert!(matches!(
            svc.authenticate("ada@example.com", "long enough").await,
            Err(AppError::BadCredentials)
        ));
    }

    #[tokio::test]
    async fn test_find_by_id_not_found() {
        let (svc, _, _pool) = service().await;
        assert!(matches!(svc.find_by_id(99).await, Err(AppError::NotFound(_))));
    }
}
