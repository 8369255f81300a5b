use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{auth::Principal, error::AppError, models::*, AppState};

/// GET /api/timeslots
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<TimeSlot>>>, AppError> {
    Ok(Json(ApiResponse::success(state.time_slots.list().await?)))
}

/// POST /api/timeslots
pub async fn create(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(body): Json<CreateTimeSlotRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TimeSlot>>), AppError> {
    let slot = state.time_slots.create(body, principal.user()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(slot))))
}

/// DELETE /api/timeslots/{id} (admin only)
pub async fn delete(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.time_slots.delete(id, principal.user()).await?;
    Ok(StatusCode::NO_CONTENT)
}
