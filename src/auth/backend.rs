//! Authentication backend contract and its HTTP implementation.
//!
//! The wire shapes here are shared with the development API so client and
//! simulator cannot drift apart.

use super::error::AuthError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};
use utoipa::ToSchema;

/// Profile of the signed-in operator. Immutable once fetched; replaced
/// wholesale on re-fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in_sec: u64,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in_sec: u64,
}

/// The three calls the session manager needs from an authentication service.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AuthError>;
    async fn me(&self, access_token: &str) -> Result<UserProfile, AuthError>;
}

/// [`AuthBackend`] speaking JSON over HTTP against an API base URL.
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    #[instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let payload = json!({ "email": email, "password": password });

        let response = self
            .http
            .post(self.endpoint("/login"))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let code = error_code(response).await;
            debug!("login rejected: {} {}", status, code);

            return Err(if status == 401 {
                AuthError::InvalidCredentials
            } else {
                AuthError::Backend { status, code }
            });
        }

        Ok(response.json().await?)
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AuthError> {
        let payload = json!({ "refreshToken": refresh_token });

        let response = self
            .http
            .post(self.endpoint("/refresh"))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let code = error_code(response).await;
            debug!("refresh rejected: {} {}", status, code);

            return Err(if status == 401 {
                AuthError::RefreshInvalid
            } else {
                AuthError::Backend { status, code }
            });
        }

        Ok(response.json().await?)
    }

    #[instrument(skip(self, access_token))]
    async fn me(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        let response = self
            .http
            .get(self.endpoint("/me"))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let code = error_code(response).await;
            return Err(AuthError::Backend { status, code });
        }

        Ok(response.json().await?)
    }
}

/// Pulls the machine-readable `code` out of an error body, falling back to
/// `UNKNOWN` when the body is empty or not the expected shape.
async fn error_code(response: reqwest::Response) -> String {
    response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("code").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| "UNKNOWN".to_string())
}
