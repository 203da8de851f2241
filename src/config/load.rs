//! Loading pattern configuration from YAML files

use super::schema::PatternSpec;
use super::validate::validate_config;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Load, parse and validate a pattern configuration file
///
/// # Example
///
/// ```no_run
/// use concarne::config::{build_pattern, load_config};
///
/// let spec = load_config("pattern.yaml")?;
/// let built = build_pattern(&spec)?;
/// let loss = built.training_loss()?;
/// # let _ = loss;
/// # Ok::<(), concarne::Error>(())
/// ```
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<PatternSpec> {
    let path = config_path.as_ref();
    let yaml_content = fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let spec = parse_config(&yaml_content)?;
    debug!(path = %path.display(), pattern = ?spec.pattern, "loaded config");
    Ok(spec)
}

/// Parse and validate a pattern configuration from a YAML string
pub fn parse_config(yaml: &str) -> Result<PatternSpec> {
    let spec: PatternSpec = serde_yaml::from_str(yaml)
        .map_err(|e| Error::ConfigError(format!("Failed to parse YAML config: {}", e)))?;

    validate_config(&spec).map_err(|e| Error::ConfigError(format!("Invalid config: {}", e)))?;

    Ok(spec)
}
