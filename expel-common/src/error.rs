//! Common error types for ExpelAI

use thiserror::Error;

/// Common result type for ExpelAI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the record store and service layers
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A record failed its field constraints (required field, enum, range)
    ///
    /// `field` is the wire name of the offending field (e.g. `riskLevel`).
    #[error("Validation failed for `{field}`: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for building a validation error
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            field,
            message: message.into(),
        }
    }

    /// Field name for validation errors, `None` for every other kind
    pub fn invalid_field(&self) -> Option<&'static str> {
        match self {
            Error::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_field() {
        let err = Error::validation("riskLevel", "is required");
        assert_eq!(err.invalid_field(), Some("riskLevel"));
        assert_eq!(err.to_string(), "Validation failed for `riskLevel`: is required");
    }

    #[test]
    fn test_non_validation_error_has_no_field() {
        let err = Error::Config("missing".to_string());
        assert_eq!(err.invalid_field(), None);
    }
}
