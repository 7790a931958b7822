//! Error types for the contents service and their HTTP mapping.

use axum::http::StatusCode;
use thiserror::Error;

/// Classification of a failure reported by a storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Container or blob does not exist.
    NotFound,
    /// The caller is authenticated but lacks permission.
    PermissionDenied,
    /// No usable credential or the token was rejected.
    Unauthenticated,
    /// Network fault, still failing after the transport retries.
    Transport,
    /// Anything the backend reported that fits none of the above.
    Other,
}

impl BackendErrorKind {
    /// Returns the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendErrorKind::NotFound => "NotFound",
            BackendErrorKind::PermissionDenied => "PermissionDenied",
            BackendErrorKind::Unauthenticated => "Unauthenticated",
            BackendErrorKind::Transport => "Transport",
            BackendErrorKind::Other => "Other",
        }
    }

    /// Returns the HTTP status code the web layer uses for this kind.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BackendErrorKind::NotFound => StatusCode::NOT_FOUND,
            BackendErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
            BackendErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            BackendErrorKind::Transport | BackendErrorKind::Other => StatusCode::BAD_GATEWAY,
        }
    }

    /// Returns the default message for this kind.
    pub fn default_message(&self) -> &'static str {
        match self {
            BackendErrorKind::NotFound => "The specified resource does not exist.",
            BackendErrorKind::PermissionDenied => {
                "This request is not authorized to perform this operation."
            }
            BackendErrorKind::Unauthenticated => {
                "No credential could authenticate against the storage account."
            }
            BackendErrorKind::Transport => "The storage service could not be reached.",
            BackendErrorKind::Other => "The storage service failed to process the request.",
        }
    }
}

/// Failure reported by a storage backend.
#[derive(Debug, Error)]
#[error("{}: {}", .kind.as_str(), .message)]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    /// Creates a new backend error with the default message for `kind`.
    pub fn new(kind: BackendErrorKind) -> Self {
        Self {
            message: kind.default_message().to_string(),
            kind,
        }
    }

    /// Creates a new backend error with a custom message.
    pub fn with_message(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_message(BackendErrorKind::NotFound, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == BackendErrorKind::NotFound
    }
}

/// Errors surfaced by the contents service.
#[derive(Debug, Error)]
pub enum ContentsError {
    /// Settings are missing or malformed; no backend call was issued.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The storage backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The caller cancelled the operation or its deadline passed.
    #[error("the operation was cancelled")]
    Cancelled,
}

impl ContentsError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ContentsError::Configuration(message.into())
    }

    /// Returns the HTTP status code the web layer renders this error with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ContentsError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ContentsError::Backend(err) => err.kind.status_code(),
            ContentsError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ContentsError::Cancelled)
    }
}

/// Result type alias for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Result type alias for contents service operations.
pub type ContentsResult<T> = Result<T, ContentsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::not_found("container 'reports' does not exist");
        assert_eq!(err.to_string(), "NotFound: container 'reports' does not exist");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_status_codes() {
        let not_found: ContentsError = BackendError::new(BackendErrorKind::NotFound).into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let denied: ContentsError = BackendError::new(BackendErrorKind::PermissionDenied).into();
        assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);

        assert_eq!(
            ContentsError::configuration("missing account").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ContentsError::Cancelled.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_cancelled_is_distinct_from_backend_errors() {
        assert!(ContentsError::Cancelled.is_cancelled());
        let transport: ContentsError = BackendError::new(BackendErrorKind::Transport).into();
        assert!(!transport.is_cancelled());
    }
}
