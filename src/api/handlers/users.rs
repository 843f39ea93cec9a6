//! User directory endpoints: server-side paging/search plus validated
//! create, update, and delete.
//!
//! Flow overview:
//! 1) `require_bearer` has already authenticated the request.
//! 2) Reads clamp their paging inputs instead of rejecting them.
//! 3) Writes validate name/email and surface distinct conflict codes.

use super::{valid_email, ApiFailure};
use crate::api::state::{ApiState, UserRecord, WriteError};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub items: Vec<UserRecord>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserPayload {
    pub name: String,
    pub email: String,
    pub role: String,
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(
        ("q" = Option<String>, Query, description = "Case-insensitive substring over name or email"),
        ("page" = Option<i64>, Query, description = "1-based page, clamped to at least 1"),
        ("limit" = Option<i64>, Query, description = "Page size, clamped to 1..=50"),
    ),
    responses(
        (status = 200, description = "One page of the directory", body = UserListResponse),
        (status = 401, description = "Missing or expired bearer token"),
    ),
    tag = "users"
)]
pub async fn list(
    Extension(state): Extension<Arc<ApiState>>,
    Query(query): Query<ListQuery>,
) -> Json<UserListResponse> {
    let q = query.q.unwrap_or_default();
    let page = query.page.unwrap_or(1).max(1) as u64;
    let limit = query.limit.unwrap_or(10).clamp(1, 50) as u64;

    let (items, total) = state.page_users(&q, page, limit).await;

    Json(UserListResponse {
        items,
        total,
        page,
        limit,
    })
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = UserPayload,
    responses(
        (status = 201, description = "User created", body = UserRecord),
        (status = 400, description = "Name missing or email malformed"),
        (status = 409, description = "Email already held by another user"),
        (status = 401, description = "Missing or expired bearer token"),
    ),
    tag = "users"
)]
pub async fn create(
    Extension(state): Extension<Arc<ApiState>>,
    Json(payload): Json<UserPayload>,
) -> Response {
    let (name, email, role) = match validate(&payload) {
        Ok(fields) => fields,
        Err(failure) => return failure.into_response(),
    };

    match state.create_user(&name, &email, &role).await {
        Ok(user) => {
            info!("created user {} <{}>", user.id, user.email);
            (StatusCode::CREATED, Json(user)).into_response()
        }
        Err(WriteError::EmailTaken) => ApiFailure::email_already_exists().into_response(),
        Err(WriteError::NotFound) => ApiFailure::user_not_found().into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id")),
    request_body = UserPayload,
    responses(
        (status = 200, description = "User updated", body = UserRecord),
        (status = 400, description = "Name missing or email malformed"),
        (status = 404, description = "Unknown user id"),
        (status = 409, description = "Email already held by another user"),
        (status = 401, description = "Missing or expired bearer token"),
    ),
    tag = "users"
)]
pub async fn update(
    Path(id): Path<String>,
    Extension(state): Extension<Arc<ApiState>>,
    Json(payload): Json<UserPayload>,
) -> Response {
    let (name, email, role) = match validate(&payload) {
        Ok(fields) => fields,
        Err(failure) => return failure.into_response(),
    };

    match state.update_user(&id, &name, &email, &role).await {
        Ok(user) => Json(user).into_response(),
        Err(WriteError::NotFound) => ApiFailure::user_not_found().into_response(),
        Err(WriteError::EmailTaken) => ApiFailure::email_already_exists().into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "Unknown user id"),
        (status = 401, description = "Missing or expired bearer token"),
    ),
    tag = "users"
)]
pub async fn remove(
    Path(id): Path<String>,
    Extension(state): Extension<Arc<ApiState>>,
) -> Response {
    if state.remove_user(&id).await {
        info!("deleted user {id}");
        StatusCode::NO_CONTENT.into_response()
    } else {
        ApiFailure::user_not_found().into_response()
    }
}

fn validate(payload: &UserPayload) -> Result<(String, String, String), ApiFailure> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiFailure::name_required());
    }

    let email = payload.email.trim().to_string();
    if !valid_email(&email) {
        return Err(ApiFailure::email_invalid());
    }

    Ok((name, email, payload.role.trim().to_string()))
}
