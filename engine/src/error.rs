use casino_lobby_types::ValidationError;
use std::time::Duration;
use thiserror::Error;

/// Error type for lobby resolution and the sources it reads from.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("source call timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl Error {
    pub fn not_found(what: &'static str, key: impl Into<String>) -> Self {
        Error::NotFound {
            what,
            key: key.into(),
        }
    }

    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        Error::SourceUnavailable(reason.to_string())
    }

    /// Whether the error came from an external source rather than the request.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::SourceUnavailable(_) | Error::Timeout(_))
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Invalid(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
