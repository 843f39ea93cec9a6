use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Access/refresh token pair with the absolute expiry of the access token.
///
/// `expires_at` is milliseconds since the Unix epoch so the record stays
/// meaningful across process restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: u64,
}

impl AuthTokens {
    /// Builds a pair from a login response, anchoring expiry to the current
    /// wall clock.
    #[must_use]
    pub fn new(access_token: String, refresh_token: String, expires_in_secs: u64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: now_ms() + expires_in_secs * 1000,
        }
    }

    /// Returns a copy carrying a fresh access token. The refresh token is
    /// long-lived relative to the access token and is never rotated here.
    #[must_use]
    pub fn with_access(&self, access_token: String, expires_in_secs: u64) -> Self {
        Self {
            access_token,
            refresh_token: self.refresh_token.clone(),
            expires_at: now_ms() + expires_in_secs * 1000,
        }
    }

    /// True once the access token must be treated as invalid.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= now_ms()
    }
}

/// Current wall clock in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}
