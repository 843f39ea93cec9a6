//! The development backend: an axum router simulating the production REST
//! API with artificial latency, bearer validation, and demo data.

use crate::cli::globals::GlobalArgs;
use anyhow::Result;
use axum::{
    extract::{MatchedPath, Request},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod handlers;
mod openapi;
pub mod state;

use state::ApiState;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// Builds the full router around a shared state. Exposed so tests can mount
/// the simulator on an ephemeral listener.
#[must_use]
pub fn router(state: Arc<ApiState>) -> Router {
    let protected = Router::new()
        .route("/me", get(handlers::auth::me))
        .route("/dashboard/summary", get(handlers::dashboard::summary))
        .route(
            "/users",
            get(handlers::users::list).post(handlers::users::create),
        )
        .route(
            "/users/:id",
            put(handlers::users::update).delete(handlers::users::remove),
        )
        .route_layer(middleware::from_fn(handlers::require_bearer));

    let api = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
        .route("/openapi.json", get(openapi::serve))
        .merge(protected);

    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(Any);

    Router::new().nest("/api", api).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors)
            .layer(Extension(state))
            .layer(middleware::from_fn(simulate_latency)),
    )
}

/// Start the server
/// # Errors
/// Return error if failed to bind or serve
pub async fn new(port: u16, globals: &GlobalArgs) -> Result<()> {
    let state = Arc::new(ApiState::new(globals));
    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Fixed artificial delay in front of every response, so the simulated
/// network feels like one.
async fn simulate_latency(
    Extension(state): Extension<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Response {
    tokio::time::sleep(state.latency()).await;
    next.run(request).await
}

fn make_span(request: &Request) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
