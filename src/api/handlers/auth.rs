//! Login, refresh, and current-profile endpoints. Token issuance itself
//! lives in the state; these handlers only translate outcomes to HTTP.

use super::ApiFailure;
use crate::api::state::ApiState;
use crate::auth::backend::{LoginResponse, RefreshResponse, UserProfile};
use axum::{
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair plus signed-in profile", body = LoginResponse),
        (status = 401, description = "Unknown credential pair"),
    ),
    tag = "auth"
)]
pub async fn login(
    Extension(state): Extension<Arc<ApiState>>,
    Json(payload): Json<LoginRequest>,
) -> Response {
    match state.issue_login(&payload.email, &payload.password).await {
        Some(response) => {
            info!("issued session for {}", payload.email);
            Json(response).into_response()
        }
        None => {
            warn!("login rejected for {}", payload.email);
            ApiFailure::invalid_credentials().into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Fresh access token", body = RefreshResponse),
        (status = 401, description = "Refresh token unknown or revoked"),
    ),
    tag = "auth"
)]
pub async fn refresh(
    Extension(state): Extension<Arc<ApiState>>,
    Json(payload): Json<RefreshRequest>,
) -> Response {
    match state.issue_refresh(&payload.refresh_token).await {
        Some(response) => Json(response).into_response(),
        None => ApiFailure::refresh_invalid().into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Profile of the signed-in operator", body = UserProfile),
        (status = 401, description = "Missing or expired bearer token"),
    ),
    tag = "auth"
)]
pub async fn me(Extension(state): Extension<Arc<ApiState>>) -> Json<UserProfile> {
    Json(state.profile().clone())
}
