//! Config commands

use crate::config::Config;
use crate::ConfigCommands;

const KEYS: [&str; 4] = ["default_format", "log_level", "default_conversion_value", "reconcile_grace_secs"];

fn show<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "(not set)".into())
}

fn lookup(config: &Config, key: &str) -> Result<String, String> {
    let value = match key {
        "default_format" => show(config.default_format.clone()),
        "log_level" => show(config.log_level.clone()),
        "default_conversion_value" => show(config.default_conversion_value),
        "reconcile_grace_secs" => show(config.reconcile_grace_secs),
        _ => return Err(format!("Unknown config key: {}", key)),
    };
    Ok(value)
}

pub async fn handle(action: ConfigCommands, profile: Option<&str>) -> Result<(), String> {
    match action {
        ConfigCommands::Init => {
            let engine = leadgen_experiments::ExperimentConfig::default();
            let config = Config {
                default_format: Some("table".into()),
                log_level: Some(engine.log_level),
                default_conversion_value: Some(engine.default_conversion_value),
                reconcile_grace_secs: Some(engine.reconcile_grace_secs),
            };
            let path = config.save(profile)?;
            println!("Configuration initialized at {}", path.display());
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load(profile).unwrap_or_default();
            match key.as_str() {
                "default_format" => config.default_format = Some(value),
                "log_level" => config.log_level = Some(value),
                "default_conversion_value" => {
                    config.default_conversion_value =
                        Some(value.parse().map_err(|_| format!("Not a number: {}", value))?)
                }
                "reconcile_grace_secs" => {
                    config.reconcile_grace_secs =
                        Some(value.parse().map_err(|_| format!("Not a whole number of seconds: {}", value))?)
                }
                _ => return Err(format!("Unknown config key: {}", key)),
            }
            config.save(profile)?;
            println!("Set {} successfully", key);
        }
        ConfigCommands::Get { key } => {
            let config = Config::load(profile).unwrap_or_default();
            println!("{}: {}", key, lookup(&config, &key)?);
        }
        ConfigCommands::List => {
            let config = Config::load(profile).unwrap_or_default();
            for key in KEYS {
                println!("{}: {}", key, lookup(&config, key)?);
            }
        }
    }
    Ok(())
}
