pub mod builtin;

use crate::error::GraneroError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Engine settings that vary between sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Prefix given to bare silo numbers, so "SILO 1" reads as "AP-1".
    pub silo_prefix: String,
    /// Extra spellings of silos (alias -> silo id), e.g. "SILO NORTE".
    #[serde(default)]
    pub silo_aliases: BTreeMap<String, String>,
    /// Vertical distance, in points, that starts a new text line when
    /// assembling positioned tokens.
    #[serde(default = "default_line_gap")]
    pub line_gap: f32,
}

fn default_line_gap() -> f32 {
    3.0
}

/// Load engine config from a JSON file.
pub fn load_config(path: &Path) -> Result<EngineConfig, GraneroError> {
    let content = std::fs::read_to_string(path).map_err(|e| GraneroError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_config(&content, path)
}

/// Parse engine config from a JSON string.
pub fn parse_config(json: &str, source: &Path) -> Result<EngineConfig, GraneroError> {
    let config: EngineConfig = serde_json::from_str(json).map_err(|e| GraneroError::ConfigLoad {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse engine config from a JSON string (no file path context).
pub fn parse_config_str(json: &str) -> Result<EngineConfig, GraneroError> {
    let config: EngineConfig = serde_json::from_str(json)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &EngineConfig) -> Result<(), GraneroError> {
    let prefix = config.silo_prefix.trim();
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(GraneroError::ConfigInvalid(format!(
            "silo_prefix must be letters only, got '{}'",
            config.silo_prefix
        )));
    }

    if !(config.line_gap.is_finite() && config.line_gap > 0.0) {
        return Err(GraneroError::ConfigInvalid(format!(
            "line_gap must be a positive number, got {}",
            config.line_gap
        )));
    }

    for (alias, silo) in &config.silo_aliases {
        if alias.trim().is_empty() || silo.trim().is_empty() {
            return Err(GraneroError::ConfigInvalid(format!(
                "silo alias '{}' -> '{}' must not be empty",
                alias, silo
            )));
        }
    }

    Ok(())
}
