use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{error::AppError, models::*, AppState};

/// POST /api/user/signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), AppError> {
    let user = state.users.signup(body).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// POST /api/user/authenticate (returns a signed bearer token)
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AuthenticationRequest>,
) -> Result<Json<ApiResponse<AuthenticationResponse>>, AppError> {
    let token = state.users.authenticate(&body.email, &body.password).await?;
    Ok(Json(ApiResponse::success(AuthenticationResponse { token })))
}

/// GET /api/user/{id}
pub async fn find_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = state.users.find_by_id(id).await?;
    Ok(Json(ApiResponse::success(user)))
}
