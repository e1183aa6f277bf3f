//! Indexer configuration
//!
//! Read from a `.yaml`/`.yml` or `.json` file. Every section is optional and
//! falls back to its defaults.

use crate::resolver::DEFAULT_BUILTIN_TYPES;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// What to do when one column (or one asset) cannot be indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop and report the first failure
    #[default]
    Abort,
    /// Log the failure, record it, and carry on
    Skip,
}

impl std::str::FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(ErrorPolicy::Abort),
            "skip" => Ok(ErrorPolicy::Skip),
            _ => Err(format!("Unknown error policy: {}", s)),
        }
    }
}

/// Type resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Field types emitted without package qualification
    pub builtin_types: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            builtin_types: DEFAULT_BUILTIN_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Column-level settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    pub on_error: ErrorPolicy,
}

/// Directory indexing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Asset-level failure handling
    pub on_error: ErrorPolicy,

    /// File name suffixes of table documents
    pub include: Vec<String>,

    /// Follow symbolic links while walking
    pub follow_links: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            on_error: ErrorPolicy::Abort,
            include: vec![".gdst.json".to_string()],
            follow_links: true,
        }
    }
}

impl BatchConfig {
    pub fn matches(&self, file_name: &str) -> bool {
        self.include.iter().any(|suffix| file_name.ends_with(suffix.as_str()))
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub resolver: ResolverConfig,
    pub columns: ColumnsConfig,
    pub batch: BatchConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.include.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::Invalid(
                "batch.include entries must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::new();

        assert_eq!(config.columns.on_error, ErrorPolicy::Abort);
        assert_eq!(config.batch.on_error, ErrorPolicy::Abort);
        assert!(config.resolver.builtin_types.contains(&"int".to_string()));
        assert!(config.batch.matches("rates.gdst.json"));
        assert!(!config.batch.matches("rates.json"));
    }

    #[test]
    fn test_load_yaml() {
        let file = write_config(
            ".yaml",
            "columns:\n  on_error: skip\nbatch:\n  include: [\".dtable.json\"]\n",
        );

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.columns.on_error, ErrorPolicy::Skip);
        assert_eq!(config.batch.on_error, ErrorPolicy::Abort);
        assert_eq!(config.batch.include, vec![".dtable.json".to_string()]);
        assert!(!config.resolver.builtin_types.is_empty());
    }

    #[test]
    fn test_load_json() {
        let file = write_config(
            ".json",
            r#"{ "resolver": { "builtin_types": ["int"] }, "batch": { "on_error": "skip" } }"#,
        );

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.resolver.builtin_types, vec!["int".to_string()]);
        assert_eq!(config.batch.on_error, ErrorPolicy::Skip);
    }

    #[test]
    fn test_unknown_extension() {
        let file = write_config(".toml", "");
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_empty_include_rejected() {
        let file = write_config(".yaml", "batch:\n  include: [\"\"]\n");
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_error_policy_from_str() {
        assert_eq!("Skip".parse::<ErrorPolicy>(), Ok(ErrorPolicy::Skip));
        assert_eq!("abort".parse::<ErrorPolicy>(), Ok(ErrorPolicy::Abort));
        assert!("retry".parse::<ErrorPolicy>().is_err());
    }
}
