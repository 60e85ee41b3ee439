//! Engine Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Experiment engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Value recorded for conversions that do not carry one
    pub default_conversion_value: f64,
    /// Incomplete tallies younger than this are assumed to be in flight
    pub reconcile_grace_secs: u64,
    /// Default tracing filter for binaries embedding the engine
    pub log_level: String,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            default_conversion_value: 1.0,
            reconcile_grace_secs: 30,
            log_level: "info".into(),
        }
    }
}

impl ExperimentConfig {
    /// Load from file
    pub fn load(path: &str) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save to file
    pub fn save(&self, path: &str) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    pub fn reconcile_grace(&self) -> Duration {
        Duration::from_secs(self.reconcile_grace_secs)
    }
}
