//! Configuration loading with JSON/YAML format auto-detection.

use std::path::Path;

use crate::config::ConnectorConfig;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Auto,
}

/// Reads and validates a configuration file. The format is picked from the
/// file extension, falling back to content sniffing.
pub fn load_config(path: &Path) -> Result<ConnectorConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => ConfigFormat::Json,
        Some("yaml") | Some("yml") => ConfigFormat::Yaml,
        _ => ConfigFormat::Auto,
    };
    parse_config(&content, format)
}

/// Parses and validates configuration content.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<ConnectorConfig, ConfigError> {
    let format = match format {
        ConfigFormat::Auto => detect_format(content)?,
        format => format,
    };

    let config: ConnectorConfig = match format {
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::InvalidJson {
                reason: e.to_string(),
            })?
        }
        ConfigFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidYaml {
                reason: e.to_string(),
            })?
        }
        ConfigFormat::Auto => unreachable!("auto format is resolved above"),
    };

    config.validate()?;
    Ok(config)
}

fn detect_format(content: &str) -> Result<ConfigFormat, ConfigError> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(ConfigFormat::Json);
    }
    if serde_yaml::from_str::<serde_yaml::Value>(content).is_ok() {
        return Ok(ConfigFormat::Yaml);
    }
    Err(ConfigError::UnknownFormat)
}
