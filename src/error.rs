//! Error types for carbonsense operations.
//!
//! Every failure the core can surface maps onto one of three caller-facing
//! kinds (validation, not-found, internal). Degenerate numeric input and
//! unreadable model artifacts are recovered locally and never show up here.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for carbonsense operations.
///
/// # Examples
///
/// ```
/// use carbonsense::error::{CarbonError, ErrorKind};
///
/// let err = CarbonError::MissingFields(vec!["last_month_emission".to_string()]);
/// assert_eq!(err.kind(), ErrorKind::Validation);
/// assert!(err.to_string().contains("last_month_emission"));
/// ```
#[derive(Debug, Error)]
pub enum CarbonError {
    /// A batch operation received no records.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Required fields were absent from a request.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// A field was present but its value is unusable.
    #[error("invalid value for field `{field}`: {reason}")]
    InvalidField {
        /// Field name
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// The requested user is not part of the clustering result.
    #[error("user `{0}` not found in clustering results")]
    UserNotFound(String),

    /// Matrix/vector dimensions don't match for the operation.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Invalid hyperparameter value provided.
    #[error("invalid hyperparameter: {param} = {value}, expected {constraint}")]
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// An estimator or transformer was used before `fit`.
    #[error("{0} is not fitted, call fit() first")]
    NotFitted(&'static str),

    /// The emission model could neither be loaded nor trained.
    #[error("emission model unavailable: {0}")]
    ModelUnavailable(String),

    /// A persisted artifact is corrupt or has an unexpected layout.
    #[error("invalid artifact format in {path}: {message}")]
    Format {
        /// Artifact location
        path: PathBuf,
        /// Error description
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be read or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with string message.
    #[error("{0}")]
    Other(String),
}

/// Caller-facing classification of a [`CarbonError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is malformed or incomplete.
    Validation,
    /// The request referenced something that does not exist.
    NotFound,
    /// Anything else; reported with a descriptive message.
    Internal,
}

impl CarbonError {
    /// Classifies the error for the outer request layer.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput(_) | Self::MissingFields(_) | Self::InvalidField { .. } => {
                ErrorKind::Validation
            }
            Self::UserNotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Internal,
        }
    }

    /// Create a dimension mismatch error with descriptive context
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }

    /// Create an empty input error
    #[must_use]
    pub fn empty_input(context: &str) -> Self {
        Self::EmptyInput(context.to_string())
    }

    /// Create a format error for an artifact at `path`
    #[must_use]
    pub fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<&str> for CarbonError {
    fn from(msg: &str) -> Self {
        CarbonError::Other(msg.to_string())
    }
}

impl From<String> for CarbonError {
    fn from(msg: String) -> Self {
        CarbonError::Other(msg)
    }
}

impl From<serde_json::Error> for CarbonError {
    fn from(err: serde_json::Error) -> Self {
        CarbonError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, CarbonError>;
