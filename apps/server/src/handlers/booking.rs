use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{auth::Principal, error::AppError, models::*, AppState};

/// POST /api/bookings (price is computed server-side)
pub async fn create(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Booking>>), AppError> {
    let booking = state.bookings.create(body, principal.user()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(booking))))
}

/// GET /api/bookings/{id}
pub async fn find_by_id(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Booking>>, AppError> {
    let booking = state.bookings.find_by_id(id, principal.user()).await?;
    Ok(Json(ApiResponse::success(booking)))
}

/// PUT /api/bookings/{id}/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(body): Json<UpdateBookingStatusRequest>,
) -> Result<Json<ApiResponse<Booking>>, AppError> {
    let booking = state
        .bookings
        .update_status(id, body.status, principal.user())
        .await?;
    Ok(Json(ApiResponse::success(booking)))
}

/// DELETE /api/bookings/{id}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.bookings.delete(id, principal.user()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/rooms/{id}/bookings (room owner only)
pub async fn find_by_room(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(room_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<Booking>>>, AppError> {
    let bookings = state.bookings.find_by_room(room_id, principal.user()).await?;
    Ok(Json(ApiResponse::success(bookings)))
}

/// GET /api/rooms/{id}/bookings/mine
pub async fn find_mine_for_room(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(room_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<Booking>>>, AppError> {
    let bookings = state
        .bookings
        .find_mine_for_room(room_id, principal.user())
        .await?;
    Ok(Json(ApiResponse::success(bookings)))
}
