//! Configuration management
//!
//! Settings are read from a JSON file (`<config dir>/agent-llm-adapter/config.json`
//! unless a path is given). API keys missing from the file fall back to the
//! provider's environment variable.

pub mod models;
pub mod settings;

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

pub use self::{
    models::{BackendProfile, ProviderType},
    settings::{AdapterSettings, MIN_DIAGNOSTIC_MAX_CHARS},
};
use crate::error::{AdapterError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Adapter-wide settings
    #[serde(flatten)]
    pub settings: AdapterSettings,

    /// Backend profiles
    #[serde(default)]
    pub backends: Vec<BackendProfile>,

    /// Name of the profile used when none is requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_backend: Option<String>,
}

impl Config {
    /// Load configuration from the default location
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_path())
    }

    /// Load configuration from a specific path, defaulting when it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| AdapterError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let config: Self =
            serde_json::from_str(&contents).map_err(|e| AdapterError::ConfigParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the configuration directory path
    #[must_use]
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agent-llm-adapter")
    }

    /// Get the config file path
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Check every profile and the default pointer
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::ConfigValidation`] on the first invalid entry
    pub fn validate(&self) -> Result<()> {
        if self.settings.diagnostic_max_chars < MIN_DIAGNOSTIC_MAX_CHARS {
            return Err(AdapterError::ConfigValidation(format!(
                "diagnostic_max_chars must be at least {MIN_DIAGNOSTIC_MAX_CHARS}"
            )));
        }
        for profile in &self.backends {
            profile.validate()?;
        }
        if let Some(name) = &self.default_backend {
            if self.get_backend(name).is_none() {
                return Err(AdapterError::ConfigValidation(format!(
                    "default_backend '{name}' has no matching profile"
                )));
            }
        }
        Ok(())
    }

    /// Get a backend profile by name
    #[must_use]
    pub fn get_backend(&self, name: &str) -> Option<&BackendProfile> {
        self.backends.iter().find(|profile| profile.name == name)
    }

    /// Resolve the requested profile, or the default one
    ///
    /// Falls back to the first profile when no default is configured.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::BackendNotFound`] when nothing matches
    pub fn select_backend(&self, name: Option<&str>) -> Result<&BackendProfile> {
        match name.or(self.default_backend.as_deref()) {
            Some(name) => self
                .get_backend(name)
                .ok_or_else(|| AdapterError::BackendNotFound(name.to_string())),
            None => self
                .backends
                .first()
                .ok_or_else(|| AdapterError::BackendNotFound("<none configured>".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn sample() -> Config {
        let mut openai = BackendProfile::new("main", ProviderType::OpenAI, "gpt-4o-mini");
        openai.temperature = Some(0.7);
        let anthropic = BackendProfile::new("claude", ProviderType::Anthropic, "claude-3-5-haiku");
        Config {
            settings: AdapterSettings::default(),
            backends: vec![openai, anthropic],
            default_backend: Some("claude".to_string()),
        }
    }

    #[test]
    fn test_config_paths() {
        let path = Config::config_path();
        assert!(path.ends_with("agent-llm-adapter/config.json"));
    }

    #[test]
    fn test_missing_file_yields_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from_path(&temp_dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let config = sample();
        config.save_to_path(&config_path).unwrap();

        let loaded = Config::load_from_path(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, "{ not json").unwrap();

        let err = Config::load_from_path(&config_path).unwrap_err();
        assert!(matches!(err, AdapterError::ConfigParse { ref path, .. } if path == &config_path));
    }

    #[test]
    fn test_select_backend() {
        let config = sample();
        assert_eq!(config.select_backend(None).unwrap().name, "claude");
        assert_eq!(config.select_backend(Some("main")).unwrap().name, "main");
        assert!(matches!(
            config.select_backend(Some("missing")),
            Err(AdapterError::BackendNotFound(_))
        ));
    }

    #[test]
    fn test_small_diagnostic_bound_is_invalid() {
        let mut config = sample();
        config.settings.diagnostic_max_chars = 10;
        assert!(matches!(
            config.validate(),
            Err(AdapterError::ConfigValidation(_))
        ));

        config.settings.diagnostic_max_chars = MIN_DIAGNOSTIC_MAX_CHARS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dangling_default_is_invalid() {
        let mut config = sample();
        config.default_backend = Some("gone".to_string());
        assert!(config.validate().is_err());
    }
}
