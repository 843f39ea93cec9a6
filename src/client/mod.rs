//! Request-authorization pipeline around the HTTP client.
//!
//! Every call to the API base path gets the current bearer token attached.
//! A 401 answer triggers at most one concurrent refresh through the session
//! manager; once the shared refresh settles the original request is retried
//! exactly once with the new token. Unrecoverable authorization failures
//! force a logout and surface the original failure.

pub mod dashboard;
pub mod error;
pub mod users;

pub use error::ApiError;

use crate::auth::SessionManager;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Arc<SessionManager>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .map_err(|err| {
                warn!("failed to build HTTP client: {err}");
                ApiError::unknown()
            })?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        })
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request_json(Method::GET, path, None).await
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(|_| ApiError::unknown())?;
        self.request_json(Method::POST, path, Some(body)).await
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(|_| ApiError::unknown())?;
        self.request_json(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, None).await.map(|_| ())
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let response = self.send(method, path, body).await?;
        response.json::<T>().await.map_err(|err| {
            debug!("failed to decode response body: {err}");
            ApiError::unknown()
        })
    }

    /// Dispatches one request through the authorization pipeline.
    #[instrument(skip(self, body))]
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Response, ApiError> {
        let url = self.url(path);

        // Targets outside the API base pass through untouched: no bearer,
        // no refresh handling.
        if !self.is_api(&url) {
            let response = self.dispatch(method, &url, &body, None).await?;
            return error_for_status(response).await;
        }

        let token = self.session.access_token().await;
        let response = self
            .dispatch(method.clone(), &url, &body, token.as_deref())
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return error_for_status(response).await;
        }

        let original = failure_from(response).await;

        if self.session.refresh_token().await.is_none() {
            debug!("401 without refresh token; forcing logout");
            self.session.logout().await;
            return Err(original);
        }

        if let Err(err) = self.session.refresh_access_token().await {
            debug!("refresh after 401 failed: {err}; forcing logout");
            self.session.logout().await;
            return Err(original);
        }

        let Some(new_token) = self.session.access_token().await else {
            self.session.logout().await;
            return Err(original);
        };

        debug!("retrying once with refreshed token");
        let retry = self
            .dispatch(method, &url, &body, Some(new_token.as_str()))
            .await?;
        error_for_status(retry).await
    }

    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        body: &Option<Value>,
        bearer: Option<&str>,
    ) -> Result<Response, ApiError> {
        let mut builder = self.http.request(method, url);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(|err| {
            warn!("request to {url} failed: {err}");
            ApiError::unknown()
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    fn is_api(&self, url: &str) -> bool {
        url.starts_with(&self.base_url)
    }
}

async fn error_for_status(response: Response) -> Result<Response, ApiError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(failure_from(response).await)
    }
}

/// Builds the normalized error for a failed response, pulling the
/// machine-readable code out of the body when one is present.
async fn failure_from(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let code = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("code").and_then(Value::as_str).map(str::to_string));

    ApiError::normalize(status, code)
}
