use axum::{response::Json, Extension};
use serde::Serialize;
use std::sync::Arc;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use utoipa::ToSchema;

use crate::api::state::ApiState;

/// Static demo metrics for the landing page.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub status: String,
    pub mode: String,
    pub server_time: String,
    pub active_users: u64,
}

#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    responses(
        (status = 200, description = "Demo metrics", body = DashboardSummary),
        (status = 401, description = "Missing or expired bearer token"),
    ),
    tag = "dashboard"
)]
pub async fn summary(Extension(_state): Extension<Arc<ApiState>>) -> Json<DashboardSummary> {
    let server_time = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    Json(DashboardSummary {
        status: "OK".to_string(),
        mode: "demo".to_string(),
        server_time,
        active_users: 12,
    })
}
