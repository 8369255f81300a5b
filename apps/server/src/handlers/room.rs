use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{auth::Principal, error::AppError, models::*, AppState};

/// GET /api/rooms?city=&zip_code=&day=&lat=&lon=
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoomSearchQuery>,
) -> Result<Json<ApiResponse<Vec<Room>>>, AppError> {
    let rooms = state.rooms.find_all(&query).await?;
    Ok(Json(ApiResponse::success(rooms)))
}

/// GET /api/rooms/{id}
pub async fn find_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Room>>, AppError> {
    Ok(Json(ApiResponse::success(state.rooms.find_by_id(id).await?)))
}

/// GET /api/rooms/users/{id} (rooms owned by a user)
pub async fn find_by_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<Room>>>, AppError> {
    Ok(Json(ApiResponse::success(state.rooms.find_by_user(user_id).await?)))
}

/// GET /api/rooms/types
pub async fn all_types(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    Ok(Json(ApiResponse::success(state.rooms.all_types().await?)))
}

/// GET /api/rooms/types/{type}
pub async fn find_by_type(
    State(state): State<Arc<AppState>>,
    Path(room_type): Path<String>,
) -> Result<Json<ApiResponse<Vec<Room>>>, AppError> {
    Ok(Json(ApiResponse::success(state.rooms.find_by_type(&room_type).await?)))
}

/// GET /api/rooms/equipments
pub async fn all_equipments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    Ok(Json(ApiResponse::success(state.rooms.all_equipments().await?)))
}

/// GET /api/rooms/equipments/{name}
pub async fn find_by_equipment(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<Vec<Room>>>, AppError> {
    Ok(Json(ApiResponse::success(state.rooms.find_by_equipment(&name).await?)))
}

/// POST /api/rooms
pub async fn create(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(body): Json<Room>,
) -> Result<(StatusCode, Json<ApiResponse<Room>>), AppError> {
    let room = state.rooms.create(body, principal.user()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(room))))
}

/// PUT /api/rooms
pub async fn update(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(body): Json<Room>,
) -> Result<Json<ApiResponse<Room>>, AppError> {
    let room = state.rooms.update(body, principal.user()).await?;
    Ok(Json(ApiResponse::success(room)))
}

/// DELETE /api/rooms/{id}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.rooms.delete(id, principal.user()).await?;
    Ok(StatusCode::NO_CONTENT)
}
