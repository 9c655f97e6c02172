//! Validation failures for configuration values.

use thiserror::Error;

/// Errors raised while validating configuration before it is used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required field was left empty.
    #[error("connection parameter '{field}' must not be empty")]
    MissingField {
        /// Name of the empty field.
        field: &'static str,
    },
    /// A field holds a value outside its accepted format.
    #[error("connection parameter '{field}' has invalid value '{value}': expected {expected}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was supplied.
        value: String,
        /// Description of the accepted format.
        expected: &'static str,
    },
    /// A pool was configured without room for any connection.
    #[error("pool capacity must be at least one connection")]
    EmptyPool,
    /// A pool acquire timeout of zero would fail every wait immediately.
    #[error("pool acquire timeout must be greater than zero")]
    ZeroAcquireTimeout,
}

impl ConfigError {
    pub(crate) fn invalid(
        field: &'static str,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::InvalidField {
            field,
            value: value.into(),
            expected,
        }
    }
}
