// src/config.rs

//! Converter configuration
//!
//! Settings can be kept in a TOML file and overridden on the command line:
//!
//! ```toml
//! output_dir = "target/features"
//! artifacts_dir = "target/artifacts"
//! strict_validation = true
//! filtering_patterns = ["/jcr_root/etc/.*", "/jcr_root/var/.*"]
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Where feature model JSON files are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Root of the local artifact repository; defaults to `<output_dir>/artifacts`
    #[serde(default)]
    pub artifacts_dir: Option<PathBuf>,

    /// Entry paths matching any of these patterns abort the conversion
    #[serde(default)]
    pub filtering_patterns: Vec<String>,

    /// Reject input archives without vault properties
    #[serde(default)]
    pub strict_validation: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("features")
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            artifacts_dir: None,
            filtering_patterns: Vec::new(),
            strict_validation: false,
        }
    }
}

impl ConverterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: ConverterConfig = toml::from_str(&content).map_err(|e| {
            Error::ConfigError(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check that every filtering pattern compiles
    pub fn validate(&self) -> Result<()> {
        for pattern in &self.filtering_patterns {
            regex::Regex::new(pattern).map_err(|e| {
                Error::ConfigError(format!("Invalid filtering pattern '{}': {}", pattern, e))
            })?;
        }
        Ok(())
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.artifacts_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join("artifacts"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ConverterConfig::new();
        assert_eq!(config.output_dir, PathBuf::from("features"));
        assert_eq!(config.artifacts_dir(), PathBuf::from("features/artifacts"));
        assert!(config.filtering_patterns.is_empty());
        assert!(!config.strict_validation);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cpconvert.toml");
        std::fs::write(
            &path,
            r#"
output_dir = "out"
filtering_patterns = ["/jcr_root/var/.*"]
"#,
        )
        .unwrap();

        let config = ConverterConfig::load(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.filtering_patterns, vec!["/jcr_root/var/.*".to_string()]);
        assert_eq!(config.artifacts_dir(), PathBuf::from("out/artifacts"));
    }

    #[test]
    fn test_load_rejects_bad_pattern() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cpconvert.toml");
        std::fs::write(&path, "filtering_patterns = [\"(unclosed\"]\n").unwrap();

        let err = ConverterConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConverterConfig::load(Path::new("/nonexistent/cpconvert.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
