//! Errors reported by the management channel.

use thiserror::Error;

/// Failure of a management request.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bearer token missing or wrong.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Request body rejected.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// HTTP status code to answer with.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Validation(_) => 400,
        }
    }

    /// Machine-readable code placed in the response body.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(AppError::Unauthorized("invalid management token".into()), 401, "UNAUTHORIZED")]
    #[case(AppError::Validation("block_size without max_concurrency".into()), 400, "VALIDATION_ERROR")]
    fn test_status_and_code(#[case] err: AppError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_message_carries_detail() {
        let err = AppError::Unauthorized("invalid management token".into());
        assert_eq!(err.to_string(), "Authentication failed: invalid management token");
    }
}
