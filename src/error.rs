use std::path::PathBuf;

use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Error during file I/O operations
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// Error during JSON serialization or deserialization
    #[error("json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    /// Error when user input fails.
    #[error("inquire error: {0}")]
    Inquire(#[from] inquire::InquireError),
    /// Error when a named registry configuration does not exist
    #[error("Unknown registry: \"{0}\"")]
    NotFound(String),
    /// Error when removing a profile that must always exist
    #[error("The {0} registry cannot be removed.")]
    Protected(String),
    /// Error when the data directory cannot be created
    #[error("Cannot create {path:?}: {source}")]
    Init {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Error during input validation.
    #[error("validation error: {0}")]
    Validation(String),
    /// Error when an ini file contains a line that cannot be read
    #[error("{}:{line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    /// Error when executing npm commands
    #[error("npm command failed: {0}")]
    NpmCommand(String),
}

impl AppError {
    /// Process exit code reported for this error
    ///
    /// Failures of the external npm process map to 2, everything else to 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::NpmCommand(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npm_failures_exit_with_two() {
        assert_eq!(AppError::NpmCommand("boom".to_string()).exit_code(), 2);
    }

    #[test]
    fn lookup_and_validation_failures_exit_with_one() {
        assert_eq!(AppError::NotFound("x".to_string()).exit_code(), 1);
        assert_eq!(AppError::Protected("default".to_string()).exit_code(), 1);
        assert_eq!(AppError::Validation("bad".to_string()).exit_code(), 1);
    }

    #[test]
    fn not_found_message_names_the_registry() {
        let err = AppError::NotFound("unknown".to_string());
        assert_eq!(err.to_string(), "Unknown registry: \"unknown\"");
    }
}
