//! CLI Configuration

use clap::ValueEnum;
use leadgen_experiments::ExperimentConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::output::OutputFormat;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    pub default_format: Option<String>,
    pub log_level: Option<String>,
    pub default_conversion_value: Option<f64>,
    pub reconcile_grace_secs: Option<u64>,
}

impl Config {
    pub fn load(profile: Option<&str>) -> Result<Self, String> {
        let path = Self::config_path(profile)?;
        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| e.to_string())?;
            toml::from_str(&content).map_err(|e| e.to_string())
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, profile: Option<&str>) -> Result<PathBuf, String> {
        let path = Self::config_path(profile)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(&path, content).map_err(|e| e.to_string())?;
        Ok(path)
    }

    /// Engine settings with unset keys left at their defaults
    pub fn engine(&self) -> ExperimentConfig {
        let mut engine = ExperimentConfig::default();
        if let Some(value) = self.default_conversion_value {
            engine.default_conversion_value = value;
        }
        if let Some(secs) = self.reconcile_grace_secs {
            engine.reconcile_grace_secs = secs;
        }
        if let Some(level) = &self.log_level {
            engine.log_level = level.clone();
        }
        engine
    }

    pub fn format(&self) -> OutputFormat {
        self.default_format
            .as_deref()
            .and_then(|f| OutputFormat::from_str(f, true).ok())
            .unwrap_or(OutputFormat::Table)
    }

    fn config_path(profile: Option<&str>) -> Result<PathBuf, String> {
        let home = dirs::home_dir().ok_or("Cannot find home directory")?;
        let filename = match profile {
            Some(p) => format!("config.{}.toml", p),
            None => "config.toml".to_string(),
        };
        Ok(home.join(".leadgen").join(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_overrides() {
        let config: Config = toml::from_str("reconcile_grace_secs = 5\nlog_level = \"debug\"").unwrap();
        let engine = config.engine();
        assert_eq!(engine.reconcile_grace_secs, 5);
        assert_eq!(engine.log_level, "debug");
        assert_eq!(engine.default_conversion_value, 1.0);
    }

    #[test]
    fn test_format_falls_back_to_table() {
        let config = Config {
            default_format: Some("xml".into()),
            ..Default::default()
        };
        assert!(matches!(config.format(), OutputFormat::Table));

        let config = Config {
            default_format: Some("JSON".into()),
            ..Default::default()
        };
        assert!(matches!(config.format(), OutputFormat::Json));
    }
}
