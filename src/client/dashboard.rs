//! Dashboard summary fetch.

use super::{ApiClient, ApiError};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub status: String,
    pub mode: String,
    pub server_time: String,
    pub active_users: u64,
}

/// Fetches the demo metrics shown on the landing page.
pub async fn fetch_summary(api: &ApiClient) -> Result<DashboardSummary, ApiError> {
    api.get_json("/dashboard/summary").await
}
