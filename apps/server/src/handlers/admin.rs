use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{auth::Principal, error::AppError, models::*, AppState};

/// PUT /api/admin/users/{id}/lock
pub async fn set_locked(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(body): Json<LockRequest>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = state
        .admin
        .set_locked(principal.user(), id, body.locked)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}
