//! Shared harness: boots the simulator on an ephemeral port and wires a
//! session + client against it.

use backdesk::api::state::ApiState;
use backdesk::auth::{HttpAuthBackend, SessionManager, TokenStore};
use backdesk::cli::globals::GlobalArgs;
use backdesk::client::ApiClient;
use secrecy::SecretString;
use std::sync::Arc;

#[must_use]
pub fn demo_globals(latency_ms: u64, access_ttl_secs: u64) -> GlobalArgs {
    GlobalArgs {
        latency_ms,
        access_ttl_secs,
        demo_email: "admin@panpan.dev".to_string(),
        demo_password: SecretString::from("1234".to_string()),
    }
}

pub async fn spawn_server(globals: GlobalArgs) -> (String, Arc<ApiState>) {
    let state = Arc::new(ApiState::new(&globals));
    let app = backdesk::api::router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });

    (format!("http://{addr}/api"), state)
}

#[must_use]
pub fn session_for(base_url: &str, dir: &tempfile::TempDir) -> Arc<SessionManager> {
    let backend = Arc::new(HttpAuthBackend::new(base_url).unwrap());
    let store = TokenStore::new(dir.path().join("tokens.json"));
    Arc::new(SessionManager::new(backend, store))
}

#[must_use]
pub fn client_for(base_url: &str, session: Arc<SessionManager>) -> Arc<ApiClient> {
    Arc::new(ApiClient::new(base_url, session).unwrap())
}
