//! Normalization of backend failures into the stable `{code, message}` shape
//! the presentation layer displays. Unrecognized codes fall back to a fixed
//! generic message.

use thiserror::Error;

pub const DEFAULT_MESSAGE: &str = "Something went wrong";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Transport failures and unparseable responses.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            code: "UNKNOWN".to_string(),
            message: DEFAULT_MESSAGE.to_string(),
        }
    }

    /// Maps an HTTP status plus the machine-readable code from the error
    /// body into a displayable error.
    #[must_use]
    pub fn normalize(status: u16, code: Option<String>) -> Self {
        let code = code
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| "UNKNOWN".to_string());

        let message = match status {
            401 => "Session expired".to_string(),
            403 => "No permission".to_string(),
            404 => "Not found".to_string(),
            _ => message_from_code(&code).to_string(),
        };

        Self { code, message }
    }
}

fn message_from_code(code: &str) -> &'static str {
    match code {
        "EMAIL_ALREADY_EXISTS" => "Email already exists",
        "EMAIL_INVALID" => "Email is invalid",
        "NAME_REQUIRED" => "Name is required",
        "USER_NOT_FOUND" => "User not found",
        _ => DEFAULT_MESSAGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_failures_use_session_message() {
        let err = ApiError::normalize(401, Some("TOKEN_EXPIRED".into()));
        assert_eq!(err.code, "TOKEN_EXPIRED");
        assert_eq!(err.message, "Session expired");
    }

    #[test]
    fn test_conflict_maps_to_code_specific_message() {
        let err = ApiError::normalize(409, Some("EMAIL_ALREADY_EXISTS".into()));
        assert_eq!(err.message, "Email already exists");

        let err = ApiError::normalize(400, Some("NAME_REQUIRED".into()));
        assert_eq!(err.message, "Name is required");

        let err = ApiError::normalize(400, Some("EMAIL_INVALID".into()));
        assert_eq!(err.message, "Email is invalid");
    }

    #[test]
    fn test_not_found_uses_status_message() {
        let err = ApiError::normalize(404, Some("USER_NOT_FOUND".into()));
        assert_eq!(err.message, "Not found");
    }

    #[test]
    fn test_unrecognized_code_falls_back() {
        let err = ApiError::normalize(500, Some("WHATEVER".into()));
        assert_eq!(err.message, DEFAULT_MESSAGE);

        let err = ApiError::normalize(400, None);
        assert_eq!(err.code, "UNKNOWN");
        assert_eq!(err.message, DEFAULT_MESSAGE);
    }
}
