//! Error types for the contagium_io crate.
//!
//! Provides structured error handling for all I/O operations including
//! configuration loading, input parsing and the log sinks.

use contagium_core::SimError;
use thiserror::Error;

/// Main error type for contagium_io operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// File system errors
    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    /// TOML configuration errors
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV sink errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// SQLite sink errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON errors (run manifest)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input file parse errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Errors surfaced from the engine's validation
    #[error("{0}")]
    Sim(#[from] SimError),

    /// Generic error with context
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<IoError>,
    },
}

/// Result type alias for contagium_io operations.
pub type Result<T> = std::result::Result<T, IoError>;

impl IoError {
    /// Creates a new parse error.
    #[must_use]
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse(msg.into())
    }

    /// Wraps an error with additional context.
    #[must_use]
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IoError::parse("line 3: bad weight");
        assert_eq!(err.to_string(), "Parse error: line 3: bad weight");
    }

    #[test]
    fn test_error_context() {
        let err = IoError::parse("missing h: tag").with_context("reading seeds.fa");
        assert!(err.to_string().contains("reading seeds.fa"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: IoError = io_err.into();
        assert!(matches!(err, IoError::FileSystem(_)));
    }
}
