use thiserror::Error;

/// Failures raised by session operations against the authentication backend.
///
/// Variants are `Clone` so a settled refresh outcome can be handed to every
/// caller that joined the same in-flight operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("no refresh token stored")]
    NoRefreshToken,

    #[error("refresh token rejected")]
    RefreshInvalid,

    #[error("authentication backend returned {status}: {code}")]
    Backend { status: u16, code: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
