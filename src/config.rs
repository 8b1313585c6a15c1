//! Migration configuration
//!
//! Loaded from a JSON file by the embedding framework, or built in code.
//! Every field is optional in the file; omitted fields take the defaults
//! below.
//!
//! ```json
//! {
//!   "conversion": "checked",
//!   "ambiguous_mappings": "warn",
//!   "log_level": "info",
//!   "trace_fields": false
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::observability::Severity;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How representation conversions treat values that do not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionPolicy {
    /// Overflow, fractional or non-finite values fail the load, as do
    /// integers a float target cannot hold exactly
    #[default]
    Checked,
    /// Plain casts: integers wrap, floats saturate and truncate
    Lossy,
}

/// What to do when one older field is the predecessor of several newer ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Log MAPPING_AMBIGUOUS and accept
    #[default]
    Warn,
    /// Refuse to build the class schema
    Reject,
}

/// Configuration for class registration and object loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Conversion policy (optional, default "checked")
    #[serde(default)]
    pub conversion: ConversionPolicy,

    /// Fan-out mapping policy (optional, default "warn")
    #[serde(default)]
    pub ambiguous_mappings: AmbiguityPolicy,

    /// Minimum severity written by the logger (optional, default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit one FIELD_RESOLVED trace event per field (optional, default false)
    #[serde(default)]
    pub trace_fields: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            conversion: ConversionPolicy::default(),
            ambiguous_mappings: AmbiguityPolicy::default(),
            log_level: default_log_level(),
            trace_fields: false,
        }
    }
}

impl MigrationConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: MigrationConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field values that serde cannot check
    pub fn validate(&self) -> ConfigResult<()> {
        self.severity_floor().map(|_| ())
    }

    /// The configured minimum log severity
    pub fn severity_floor(&self) -> ConfigResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "log_level '{}' is not one of trace, info, warn, error, fatal",
                self.log_level
            ))
        })
    }

    /// Applies the log level to the process-wide logger
    pub fn apply_logging(&self) -> ConfigResult<()> {
        crate::observability::Logger::set_min_severity(self.severity_floor()?);
        Ok(())
    }

    /// Config with lossy conversions
    pub fn lossy() -> Self {
        Self {
            conversion: ConversionPolicy::Lossy,
            ..Self::default()
        }
    }

    /// Config that rejects fan-out mappings
    pub fn strict() -> Self {
        Self {
            ambiguous_mappings: AmbiguityPolicy::Reject,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = MigrationConfig::default();
        assert_eq!(config.conversion, ConversionPolicy::Checked);
        assert_eq!(config.ambiguous_mappings, AmbiguityPolicy::Warn);
        assert_eq!(config.log_level, "info");
        assert!(!config.trace_fields);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = MigrationConfig::from_json("{}").unwrap();
        assert_eq!(config, MigrationConfig::default());
    }

    #[test]
    fn test_parse_all_fields() {
        let config = MigrationConfig::from_json(
            r#"{"conversion": "lossy", "ambiguous_mappings": "reject", "log_level": "warn", "trace_fields": true}"#,
        )
        .unwrap();
        assert_eq!(config.conversion, ConversionPolicy::Lossy);
        assert_eq!(config.ambiguous_mappings, AmbiguityPolicy::Reject);
        assert_eq!(config.severity_floor().unwrap(), Severity::Warn);
        assert!(config.trace_fields);
    }

    #[test]
    fn test_invalid_log_level() {
        let err = MigrationConfig::from_json(r#"{"log_level": "loud"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let err = MigrationConfig::from_json(r#"{"conversion": "yolo"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"conversion": "lossy"}}"#).unwrap();

        let config = MigrationConfig::load(file.path()).unwrap();
        assert_eq!(config.conversion, ConversionPolicy::Lossy);
    }

    #[test]
    fn test_load_missing_file() {
        let err = MigrationConfig::load(Path::new("/nonexistent/paramig.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/paramig.json"));
    }
}
