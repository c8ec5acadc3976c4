//! Settings loading and validation

use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::types::CompletionSettings;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

/// Completion settings loader
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings from a YAML file
    pub fn load_from_yaml(path: &Path) -> Result<CompletionSettings> {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_string(&content, ConfigFormat::Yaml)
    }

    /// Load settings from a JSON file
    pub fn load_from_json(path: &Path) -> Result<CompletionSettings> {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_string(&content, ConfigFormat::Json)
    }

    /// Load settings from a string
    pub fn load_from_string(content: &str, format: ConfigFormat) -> Result<CompletionSettings> {
        let settings: CompletionSettings = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };
        Self::validate(&settings)?;
        Ok(settings)
    }

    /// Validate loaded settings
    fn validate(settings: &CompletionSettings) -> Result<()> {
        if settings.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model identifier must not be empty".to_string(),
            ));
        }
        if settings.debounce_delay_ms > 5_000 {
            return Err(ConfigError::ValidationError(format!(
                "debounce delay {}ms exceeds the 5000ms ceiling",
                settings.debounce_delay_ms
            )));
        }
        for (model, params) in &settings.model_params {
            if let Some(temperature) = params.temperature {
                if !(0.0..=2.0).contains(&temperature) {
                    return Err(ConfigError::ValidationError(format!(
                        "temperature {} for model {} is outside 0.0..=2.0",
                        temperature, model
                    )));
                }
            }
        }
        Ok(())
    }
}
