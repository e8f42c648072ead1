// src/error.rs

//! Error types for content package conversion

use thiserror::Error;

/// Result type used throughout the converter
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting content packages
#[derive(Error, Debug)]
pub enum Error {
    /// Input file missing, not a regular file, or otherwise unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required package property is absent
    #[error("{property} property not found in content-package {package}, please check META-INF/vault/properties.xml")]
    MissingMetadata { property: String, package: String },

    /// Dependency ordering found a cycle
    #[error("Cyclic dependency detected, {0} was previously visited already")]
    CyclicDependency(String),

    /// Entry path rejected by the configured resource filter
    #[error("Path '{path}' in archive {properties} not allowed by user configuration, please check configured filtering patterns")]
    PolicyViolation { path: String, properties: String },

    /// Malformed archive metadata or entry content
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A collaborator was used before it was initialized
    #[error("Invalid converter state: {0}")]
    StateError(String),

    /// Converter configuration could not be loaded
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O failure with context
    #[error("I/O error: {0}")]
    IoError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::ParseError(format!("XML: {}", err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::ParseError(format!("XML attribute: {}", err))
    }
}
