//! OpenAPI description of the simulated surface, served at
//! `/api/openapi.json`.

use axum::response::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::health::health,
        crate::api::handlers::auth::login,
        crate::api::handlers::auth::refresh,
        crate::api::handlers::auth::me,
        crate::api::handlers::dashboard::summary,
        crate::api::handlers::users::list,
        crate::api::handlers::users::create,
        crate::api::handlers::users::update,
        crate::api::handlers::users::remove,
    ),
    components(schemas(
        crate::api::handlers::auth::LoginRequest,
        crate::api::handlers::auth::RefreshRequest,
        crate::api::handlers::users::UserPayload,
        crate::api::handlers::users::UserListResponse,
        crate::api::handlers::dashboard::DashboardSummary,
        crate::api::state::UserRecord,
        crate::auth::backend::LoginResponse,
        crate::auth::backend::RefreshResponse,
        crate::auth::backend::UserProfile,
    )),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Login, refresh, and the signed-in profile"),
        (name = "dashboard", description = "Demo metrics"),
        (name = "users", description = "User directory CRUD"),
    )
)]
pub struct ApiDoc;

pub async fn serve() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
