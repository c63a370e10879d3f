//! Input parsing and log sinks for the Contagium simulator.
//!
//! Everything that touches the filesystem lives here: TOML configuration
//! loading and validation, the pathogen seed / host network / fitness
//! matrix parsers, the CSV and SQLite log sinks, and the run manifest.

pub mod config;
pub mod csv_log;
pub mod error;
pub mod fitness_file;
pub mod manifest;
pub mod network_file;
pub mod seed;
pub mod sink;
pub mod sqlite_log;

pub use error::{IoError, Result};
pub use sink::LogSinkHandle;
