//! Error types for the carbonsense CLI.

use carbonsense::error::{CarbonError, ErrorKind};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Result type alias for CLI operations
pub(crate) type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub(crate) enum CliError {
    /// Input file could not be read
    #[error("could not read {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Standard input could not be read
    #[error("could not read stdin: {0}")]
    Stdin(#[source] std::io::Error),

    /// Input was not valid JSON or had the wrong shape
    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    /// Request failed in the library
    #[error("{0}")]
    Carbon(#[from] CarbonError),
}

impl CliError {
    /// Get exit code for this error
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::Input { .. } | Self::Stdin(_) => ExitCode::from(3),
            Self::Json(_) => ExitCode::from(4),
            Self::Carbon(e) => match e.kind() {
                ErrorKind::Validation => ExitCode::from(5),
                ErrorKind::NotFound => ExitCode::from(6),
                ErrorKind::Internal => ExitCode::from(1),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_error_kind() {
        let not_found = CliError::from(CarbonError::UserNotFound("u".to_string()));
        assert_eq!(not_found.exit_code(), ExitCode::from(6));

        let missing = CliError::from(CarbonError::MissingFields(vec!["userId".to_string()]));
        assert_eq!(missing.exit_code(), ExitCode::from(5));

        let unavailable = CliError::from(CarbonError::ModelUnavailable("disk".to_string()));
        assert_eq!(unavailable.exit_code(), ExitCode::from(1));
    }

    #[test]
    fn test_input_error_names_path() {
        let err = CliError::Input {
            path: PathBuf::from("profiles.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("profiles.json"));
        assert_eq!(err.exit_code(), ExitCode::from(3));
    }
}
