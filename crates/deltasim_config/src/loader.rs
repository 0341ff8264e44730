//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use deltasim_common::{parse_duration, Frequency};
use std::path::Path;

/// File name looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "deltasim.toml";

/// Loads and validates `deltasim.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks required fields and that every string setting parses.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.project.top.is_empty() {
        return Err(ConfigError::MissingField("project.top".to_string()));
    }
    if let Some(limit) = &config.simulation.time_limit {
        parse_duration(limit).map_err(|e| ConfigError::invalid("simulation.time_limit", e))?;
    }
    if config.simulation.max_deltas == Some(0) {
        return Err(ConfigError::invalid(
            "simulation.max_deltas",
            "must be at least 1",
        ));
    }
    if let Some(path) = &config.waveform.path {
        if path.is_empty() {
            return Err(ConfigError::invalid("waveform.path", "must not be empty"));
        }
    }
    for (name, clock) in &config.clocks {
        let field = format!("clocks.{name}.frequency");
        let freq: Frequency = clock
            .frequency
            .parse()
            .map_err(|e| ConfigError::invalid(field.clone(), e))?;
        if freq.half_period_fs().is_none() {
            return Err(ConfigError::invalid(
                field,
                "period is below the femtosecond resolution",
            ));
        }
    }
    Ok(())
}
