pub mod auth;
pub mod dashboard;
pub mod health;
pub mod users;

// common pieces shared by the handlers
use crate::api::state::{AccessDenied, ApiState};
use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
    Extension,
};
use regex::Regex;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

/// Machine-readable failure answered by the simulator. The `code` is what
/// clients key their normalization on; the message is a courtesy.
#[derive(Debug, Clone, Copy)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: &'static str,
}

impl ApiFailure {
    #[must_use]
    pub fn invalid_credentials() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "INVALID_CREDENTIALS",
            message: "Invalid email or password",
        }
    }

    #[must_use]
    pub fn refresh_invalid() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "REFRESH_INVALID",
            message: "Refresh token rejected",
        }
    }

    #[must_use]
    pub fn name_required() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "NAME_REQUIRED",
            message: "Name is required",
        }
    }

    #[must_use]
    pub fn email_invalid() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "EMAIL_INVALID",
            message: "Email is invalid",
        }
    }

    #[must_use]
    pub fn email_already_exists() -> Self {
        Self {
            status: StatusCode::CONFLICT,
            code: "EMAIL_ALREADY_EXISTS",
            message: "Email already exists",
        }
    }

    #[must_use]
    pub fn user_not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "USER_NOT_FOUND",
            message: "User not found",
        }
    }
}

impl From<AccessDenied> for ApiFailure {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::NoToken => Self {
                status: StatusCode::UNAUTHORIZED,
                code: "NO_TOKEN",
                message: "Missing or malformed bearer token",
            },
            AccessDenied::Expired => Self {
                status: StatusCode::UNAUTHORIZED,
                code: "TOKEN_EXPIRED",
                message: "Access token expired",
            },
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "code": self.code, "message": self.message })),
        )
            .into_response()
    }
}

/// Guard for the protected routes. Answers 401 with a `NO_TOKEN` or
/// `TOKEN_EXPIRED` code so clients can tell the two apart.
pub async fn require_bearer(
    Extension(state): Extension<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match state.verify_access(header).await {
        Ok(()) => next.run(request).await,
        Err(denied) => {
            debug!("rejecting {}: {:?}", request.uri().path(), denied);
            ApiFailure::from(denied).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(valid_email("user1@demo.dev"));
        assert!(valid_email("a.b+c@sub.example.org"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing@tld"));
        assert!(!valid_email("spaces in@demo.dev"));
        assert!(!valid_email(""));
    }

    #[test]
    fn test_failure_codes_carry_expected_status() {
        assert_eq!(
            ApiFailure::email_already_exists().status,
            StatusCode::CONFLICT
        );
        assert_eq!(ApiFailure::name_required().status, StatusCode::BAD_REQUEST);
        assert_eq!(ApiFailure::user_not_found().status, StatusCode::NOT_FOUND);
        assert_eq!(
            ApiFailure::from(AccessDenied::NoToken).code,
            "NO_TOKEN"
        );
        assert_eq!(
            ApiFailure::from(AccessDenied::Expired).code,
            "TOKEN_EXPIRED"
        );
    }
}
