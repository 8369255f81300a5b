use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{auth::Principal, error::AppError, models::*, AppState};

/// GET /api/rooms/{id}/comments
pub async fn find_by_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<Comment>>>, AppError> {
    Ok(Json(ApiResponse::success(state.comments.find_by_room(room_id).await?)))
}

/// POST /api/rooms/{id}/comments
pub async fn create(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(room_id): Path<i64>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Comment>>), AppError> {
    let comment = state
        .comments
        .create(room_id, body, principal.user())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(comment))))
}

/// DELETE /api/comments/{id}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.comments.delete(id, principal.user()).await?;
    Ok(StatusCode::NO_CONTENT)
}
