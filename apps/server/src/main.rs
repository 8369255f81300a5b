mod auth;
mod config;
mod date_utils;
mod db;
mod error;
mod handlers;
mod models;
mod pricing;
mod rate_limit;
mod repository;
mod services;
#[cfg(test)]
mod test_support;

use anyhow::Context;
use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use auth::JwtService;
use config::Config;
use rate_limit::{rate_limit_auth, rate_limit_public, rate_limit_write, RateLimiter};
use repository::{
    SqliteBookingRepository, SqliteCommentRepository, SqliteRoomRepository,
    SqliteTimeSlotRepository, SqliteUserRepository,
};
use services::{
    AdminService, BookingService, CommentService, RoomService, TimeSlotService, UserService,
};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub started_at: Instant,
    pub jwt: JwtService,
    pub users: UserService,
    pub rooms: RoomService,
    pub bookings: BookingService,
    pub comments: CommentService,
    pub admin: AdminService,
    pub time_slots: TimeSlotService,
}

/// Rate limit cleanup interval (seconds).
const RATE_LIMIT_CLEANUP_SECS: u64 = 300;
const DB_MAX_CONNECTIONS: u32 = 5;

/// Wire repositories and services over one pool.
pub fn build_state(config: &Config, db: sqlx::SqlitePool) -> AppState {
    let users = Arc::new(SqliteUserRepository::new(db.clone()));
    let rooms = Arc::new(SqliteRoomRepository::new(db.clone()));
    let bookings = Arc::new(SqliteBookingRepository::new(db.clone()));
    let comments = Arc::new(SqliteCommentRepository::new(db.clone()));
    let time_slots = Arc::new(SqliteTimeSlotRepository::new(db.clone()));
    let jwt = JwtService::new(&config.jwt_secret, config.jwt_ttl_secs);

    AppState {
        started_at: Instant::now(),
        users: UserService::new(users.clone(), jwt.clone()),
        rooms: RoomService::new(rooms.clone(), config.search_radius_km),
        bookings: BookingService::new(bookings.clone(), rooms.clone()),
        comments: CommentService::new(comments, bookings, rooms),
        admin: AdminService::new(users),
        time_slots: TimeSlotService::new(time_slots),
        jwt,
        db,
    }
}

fn cors_layer(origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let allow_origin = match origin {
        Some(origin) => {
            let origin: HeaderValue = origin.parse().context("CORS_ORIGIN must be a valid origin")?;
            AllowOrigin::exact(origin)
        }
        None => AllowOrigin::from(Any),
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

/// The HTTP API. Route groups carry their own rate-limit tier; the bearer
/// filter runs on every request.
pub fn app(state: Arc<AppState>, rate_limiter: RateLimiter) -> Router {
    let no_limit_routes = Router::new().route("/api/health", get(handlers::health::health));

    let public_routes = Router::new()
        .route("/api/user/{id}", get(handlers::user::find_by_id))
        .route("/api/rooms", get(handlers::room::search))
        .route("/api/rooms/{id}", get(handlers::room::find_by_id))
        .route("/api/rooms/users/{id}", get(handlers::room::find_by_user))
        .route("/api/rooms/types", get(handlers::room::all_types))
        .route("/api/rooms/types/{type}", get(handlers::room::find_by_type))
        .route("/api/rooms/equipments", get(handlers::room::all_equipments))
        .route(
            "/api/rooms/equipments/{name}",
            get(handlers::room::find_by_equipment),
        )
        .route("/api/rooms/{id}/comments", get(handlers::comment::find_by_room))
        .route("/api/rooms/{id}/bookings", get(handlers::booking::find_by_room))
        .route(
            "/api/rooms/{id}/bookings/mine",
            get(handlers::booking::find_mine_for_room),
        )
        .route("/api/bookings/{id}", get(handlers::booking::find_by_id))
        .route("/api/timeslots", get(handlers::time_slot::list))
        .layer(from_fn_with_state(rate_limiter.clone(), rate_limit_public));

    let auth_routes = Router::new()
        .route("/api/user/signup", post(handlers::user::signup))
        .route("/api/user/authenticate", post(handlers::user::authenticate))
        .layer(from_fn_with_state(rate_limiter.clone(), rate_limit_auth));

    let write_routes = Router::new()
        .route(
            "/api/rooms",
            post(handlers::room::create).put(handlers::room::update),
        )
        .route("/api/rooms/{id}", delete(handlers::room::delete))
        .route("/api/rooms/{id}/comments", post(handlers::comment::create))
        .route("/api/comments/{id}", delete(handlers::comment::delete))
        .route("/api/bookings", post(handlers::booking::create))
        .route("/api/bookings/{id}", delete(handlers::booking::delete))
        .route(
            "/api/bookings/{id}/status",
            put(handlers::booking::update_status),
        )
        .route("/api/timeslots", post(handlers::time_slot::create))
        .route("/api/timeslots/{id}", delete(handlers::time_slot::delete))
        .route(
            "/api/admin/users/{id}/lock",
            put(handlers::admin::set_locked),
        )
        .layer(from_fn_with_state(rate_limiter, rate_limit_write));

    Router::new()
        .merge(no_limit_routes)
        .merge(public_routes)
        .merge(auth_routes)
        .merge(write_routes)
        .layer(from_fn_with_state(state.clone(), auth::jwt_filter))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = db::connect(&config.database_url, DB_MAX_CONNECTIONS).await?;
    db::run_migrations(&pool).await?;

    let state = Arc::new(build_state(&config, pool));

    let rate_limiter = RateLimiter::with_defaults();
    let cleanup_limiter = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(RATE_LIMIT_CLEANUP_SECS));
        loop {
            interval.tick().await;
            cleanup_limiter.cleanup();
        }
    });

    if config.cors_origin.is_none() {
        tracing::warn!("CORS_ORIGIN not set, allowing any origin");
    }
    let router = app(state, rate_limiter)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config.cors_origin.as_deref())?);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("room booking server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn test_app() -> Router {
        let pool = db::test_pool().await;
        let state = Arc::new(build_state(&Config::for_tests(), pool));
        app(state, RateLimiter::new())
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get_json(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        send(app, Method::GET, uri, token, None).await
    }

    async fn post_json(
        app: &Router,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        send(app, Method::POST, uri, token, Some(body)).await
    }

    /// Sign up and authenticate, returning (user id, token).
    async fn register(app: &Router, email: &str) -> (i64, String) {
        let signup = json!({
            "email": email,
            "password": "correct horse",
            "first_name": "Ada",
            "last_name": "Lovelace"
        });
        let (status, body) = post_json(app, "/api/user/signup", None, signup).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_i64().unwrap();

        let credentials = json!({ "email": email, "password": "correct horse" });
        let (status, body) = post_json(app, "/api/user/authenticate", None, credentials).await;
        assert_eq!(status, StatusCode::OK);
        (id, body["data"]["token"].as_str().unwrap().to_string())
    }

    fn room_body(owner_id: i64) -> Value {
        json!({
            "type": "meeting",
            "description": "Bright room",
            "equipments": ["projector"],
            "days": ["Mon", "Tue"],
            "price": 10.0,
            "address": { "street": "1 rue Crucy", "city": "nantes", "zip_code": 44000 },
            "owner_id": owner_id
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app().await;
        let (status, body) = get_json(&app, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["db_ok"], true);
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let app = test_app().await;
        register(&app, "ada@example.com").await;

        let credentials = json!({ "email": "ada@example.com", "password": "wrong password" });
        let (status, body) = post_json(&app, "/api/user/authenticate", None, credentials).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn test_room_create_requires_token() {
        let app = test_app().await;
        let (status, _) = post_json(&app, "/api/rooms", None, room_body(1)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = post_json(&app, "/api/rooms", Some("not-a-token"), room_body(1)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_room_and_booking_flow() {
        let app = test_app().await;
        let (owner_id, owner_token) = register(&app, "owner@example.com").await;
        let (_, client_token) = register(&app, "client@example.com").await;
        let owner = Some(owner_token.as_str());
        let client = Some(client_token.as_str());

        let (status, body) = post_json(&app, "/api/rooms", owner, room_body(owner_id)).await;
        assert_eq!(status, StatusCode::CREATED);
        let room_id = body["data"]["id"].as_i64().unwrap();

        // Someone else cannot claim the owner's room.
        let (status, _) = post_json(&app, "/api/rooms", client, room_body(owner_id)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let search = "/api/rooms?city=nantes&zip_code=44000&day=01/01/2024";
        let (status, body) = get_json(&app, search, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let booking = json!({
            "room_id": room_id,
            "begin": "01/01/2024 10:00",
            "end": "01/01/2024 12:00"
        });
        let (status, body) = post_json(&app, "/api/bookings", client, booking).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["price"], 22.0);
        assert_eq!(body["data"]["status"], "PENDING");

        let room_bookings = format!("/api/rooms/{room_id}/bookings");
        let (status, body) = get_json(&app, &room_bookings, owner).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, _) = get_json(&app, &room_bookings, client).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let room = format!("/api/rooms/{room_id}");
        let (status, _) = send(&app, Method::DELETE, &room, owner, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_not_found() {
        let app = test_app().await;
        let (status, body) = get_json(&app, "/api/rooms/404", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Room not found");

        let (status, _) = get_json(&app, "/api/rooms", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rate_limited_signup() {
        let pool = db::test_pool().await;
        let state = Arc::new(build_state(&Config::for_tests(), pool));
        let limiter = RateLimiter::new();
        limiter.add_tier(
            rate_limit::Tier::Auth,
            rate_limit::RateLimitConfig::per_minute(1),
        );
        let app = app(state, limiter);

        let body = json!({ "email": "ada@example.com", "password": "x" });
        let (first, _) = post_json(&app, "/api/user/authenticate", None, body.clone()).await;
        assert_eq!(first, StatusCode::UNAUTHORIZED);
        let (second, _) = post_json(&app, "/api/user/authenticate", None, body).await;
        assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_cors_origin_must_parse() {
        assert!(cors_layer(Some("https://rooms.example.com")).is_ok());
        assert!(cors_layer(None).is_ok());
        assert!(cors_layer(Some("bad\norigin")).is_err());
    }
}
