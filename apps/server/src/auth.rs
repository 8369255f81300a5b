use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::{error::AppError, models::User, AppState};

// ── Tokens ──

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The user's email.
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and checks HS256 bearer tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl JwtService {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn generate_token(&self, user: &User) -> Result<String, AppError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user.email.clone(),
            role: user.role.as_str().to_owned(),
            iat: now,
            exp: now + self.ttl_secs,
        };
        self.encode_claims(&claims)
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("token encoding failed: {e}")))
    }

    /// Subject of a token, read without checking signature or expiry.
    pub fn extract_subject(&self, token: &str) -> Option<String> {
        jsonwebtoken::dangerous::insecure_decode::<Claims>(token)
            .ok()
            .map(|data| data.claims.sub)
    }

    /// Signature and expiry hold, the subject is `user`, and the account is usable.
    pub fn validate_token(&self, token: &str, user: &User) -> bool {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => data.claims.sub == user.email && !user.account_locked,
            Err(e) => {
                tracing::debug!(user_id = user.id, "token rejected: {}", e);
                false
            }
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
}

// ── Passwords ──

pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))
    })
    .await
    .map_err(anyhow::Error::from)?
    .map_err(AppError::from)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let verified = tokio::task::spawn_blocking(move || match PasswordHash::new(&hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("stored password hash is malformed: {}", e);
            false
        }
    })
    .await
    .map_err(anyhow::Error::from)?;
    Ok(verified)
}

// ── Request principal ──

/// The authenticated user, stored in request extensions by [`jwt_filter`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// The request's authenticated user, if any. Never rejects.
#[derive(Debug, Clone)]
pub struct Principal(pub Option<User>);

impl Principal {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Principal(
            parts.extensions.get::<AuthUser>().map(|auth| auth.0.clone()),
        ))
    }
}

/// Axum middleware establishing the request principal from a bearer token.
///
/// A missing or invalid token leaves the request unauthenticated; handlers
/// and services decide whether that is acceptable.
pub async fn jwt_filter(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    if req.extensions().get::<AuthUser>().is_none() {
        if let Some(user) = authenticate_headers(&state, req.headers()).await {
            req.extensions_mut().insert(AuthUser(user));
        }
    }
    next.run(req).await
}

async fn authenticate_headers(state: &AppState, headers: &HeaderMap) -> Option<User> {
    let token = bearer_token(headers)?;
    let email = state.jwt.extract_subject(token)?;

    let user = match state.users.load_by_email(&email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::debug!("token subject has no account");
            return None;
        }
        Err(e) => {
            tracing::error!("jwt_filter: loading user failed: {}", e);
            return None;
        }
    };

    state.jwt.validate_token(token, &user).then_some(user)
}

// ── Authorization predicates ──

pub fn require_user(actor: Option<&User>) -> Result<&User, AppError> {
    actor.ok_or_else(AppError::forbidden)
}

/// The actor, if it is the owner identified by `owner_id`.
pub fn authorize_owner(actor: Option<&User>, owner_id: i64) -> Result<&User, AppError> {
    match actor {
        Some(user) if user.id == owner_id => Ok(user),
        Some(user) => {
            tracing::warn!(user_id = user.id, owner_id, "ownership check failed");
            Err(AppError::forbidden())
        }
        None => Err(AppError::forbidden()),
    }
}

pub fn require_admin(actor: Option<&User>) -> Result<&User, AppError> {
    match actor {
        Some(user) if user.is_admin() => Ok(user),
        _ => Err(AppError::forbidden()),
    }
}
