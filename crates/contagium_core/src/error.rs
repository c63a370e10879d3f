//! Error types for the simulation engine.

use thiserror::Error;

/// Main error type for engine operations.
///
/// Config and Domain errors abort a run before the generation loop starts;
/// Runtime errors abort the current instance and let the driver move on to
/// the next one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Invalid or inconsistent configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid input data (sequences, network, fitness tables).
    #[error("domain error: {0}")]
    Domain(String),

    /// Failure while the generation loop is running.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    #[must_use]
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    #[must_use]
    pub fn domain<S: Into<String>>(msg: S) -> Self {
        Self::Domain(msg.into())
    }

    #[must_use]
    pub fn runtime<S: Into<String>>(msg: S) -> Self {
        Self::Runtime(msg.into())
    }
}
