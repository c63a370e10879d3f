//! TOML configuration loading.

use crate::error::Result;
use contagium_core::config::SimulationConfig;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Load, deserialize and validate a run configuration.
///
/// Every config-time error fires here, before any instance starts.
pub fn load_config(path: &Path) -> Result<SimulationConfig> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok(config)
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<SimulationConfig> {
    let config: SimulationConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Stable hash of the run-relevant configuration, recorded in the run
/// manifest so results can be matched to the exact settings.
#[must_use]
pub fn fingerprint(config: &SimulationConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{:?}", config.simulation).as_bytes());
    hasher.update(format!("{:?}", config.intrahost_model).as_bytes());
    hasher.update(format!("{:?}", config.fitness_model).as_bytes());
    hasher.update(format!("{:?}", config.transmission_model).as_bytes());
    hasher.update(format!("{:?}", config.stop_condition).as_bytes());
    hex::encode(hasher.finalize())
}
