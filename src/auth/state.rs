//! In-memory authentication state.
//!
//! The state is a plain snapshot mutated through a single entry point on the
//! session manager; everything a caller can ask about the session is derived
//! from the snapshot, never cached separately.

use super::backend::UserProfile;
use super::tokens::{now_ms, AuthTokens};

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub user: Option<UserProfile>,
    pub tokens: Option<AuthTokens>,
    pub loading: bool,
}

impl SessionState {
    /// True iff tokens are present and the access token is not yet past its
    /// absolute expiry.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tokens
            .as_ref()
            .map_or(false, |tokens| tokens.expires_at > now_ms())
    }

    #[must_use]
    pub fn roles(&self) -> &[String] {
        self.user.as_ref().map_or(&[], |user| &user.roles)
    }

    /// True when no role is required, or when the signed-in user holds at
    /// least one of the required roles.
    #[must_use]
    pub fn has_any_role(&self, required: &[&str]) -> bool {
        if required.is_empty() {
            return true;
        }

        let roles = self.roles();
        required
            .iter()
            .any(|needed| roles.iter().any(|held| held == needed))
    }
}
