//! Error types for configuration loading

use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration-specific error type
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error while reading a configuration file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Configuration parsed but failed validation
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
