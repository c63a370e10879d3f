//! Run manifest: one JSON file tying results to their settings.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Outcome of one instance as recorded in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub instance: u32,
    pub generations_run: u64,
    #[serde(default)]
    pub stop_reason: Option<String>,
    pub nodes: usize,
    pub genotypes: usize,
    /// Present when the instance aborted on a runtime error.
    #[serde(default)]
    pub error: Option<String>,
}

/// Everything offline tooling needs to interpret a run's log streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// RFC 3339 start timestamp.
    pub started_at: String,
    #[serde(default)]
    pub finished_at: Option<String>,
    pub seed: u64,
    pub threads: usize,
    /// Sink kind: "csv" or "sqlite".
    pub logger: String,
    pub config_fingerprint: String,
    /// Character-to-state mapping used for the hex sequence renderings.
    pub translation: BTreeMap<String, u8>,
    pub instances: Vec<InstanceRecord>,
}

impl RunManifest {
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
