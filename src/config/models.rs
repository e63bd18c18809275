//! Backend profiles

use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, Result};

/// Backend provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Anthropic,
    OpenAI,
    Groq,
    Ollama,
    #[serde(rename = "custom-openai")]
    CustomOpenAI,
}

impl ProviderType {
    /// Get the default base URL for this provider
    #[must_use]
    pub const fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Self::Anthropic => Some("https://api.anthropic.com"),
            Self::OpenAI => Some("https://api.openai.com/v1"),
            Self::Groq => Some("https://api.groq.com/openai/v1"),
            Self::Ollama => Some("http://localhost:11434/v1"),
            Self::CustomOpenAI => None, // Custom requires user-specified endpoint
        }
    }

    /// Environment variable holding the API key for this provider
    #[must_use]
    pub const fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::OpenAI | Self::CustomOpenAI => Some("OPENAI_API_KEY"),
            Self::Groq => Some("GROQ_API_KEY"),
            Self::Ollama => None,
        }
    }

    /// Check if this provider requires an API key
    #[must_use]
    pub const fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anthropic => write!(f, "anthropic"),
            Self::OpenAI => write!(f, "openai"),
            Self::Groq => write!(f, "groq"),
            Self::Ollama => write!(f, "ollama"),
            Self::CustomOpenAI => write!(f, "custom-openai"),
        }
    }
}

/// Backend profile configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendProfile {
    /// User-friendly name for the profile
    pub name: String,

    /// Provider type
    pub provider: ProviderType,

    /// Actual model identifier
    pub model_name: String,

    /// Custom API endpoint (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// API key; empty means "read from the environment"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    /// Default sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Default output token limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Request timeout in seconds, applied by the HTTP client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl BackendProfile {
    /// Create a new backend profile
    #[must_use]
    pub fn new(name: impl Into<String>, provider: ProviderType, model_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider,
            model_name: model_name.into(),
            base_url: None,
            api_key: String::new(),
            temperature: None,
            max_tokens: None,
            timeout_secs: None,
        }
    }

    /// Get the effective base URL (custom or default)
    #[must_use]
    pub fn effective_base_url(&self) -> Option<String> {
        self.base_url
            .clone()
            .or_else(|| self.provider.default_base_url().map(String::from))
            .map(|url| url.trim_end_matches('/').to_string())
    }

    /// Resolve the API key from the profile or the provider's environment variable
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::MissingApiKey`] when the provider needs a key and none is set
    pub fn resolve_api_key(&self) -> Result<Option<String>> {
        if !self.api_key.is_empty() {
            return Ok(Some(self.api_key.clone()));
        }
        let from_env = self
            .provider
            .api_key_env()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty());
        match from_env {
            Some(key) => Ok(Some(key)),
            None if self.provider.requires_api_key() => Err(AdapterError::MissingApiKey {
                provider: self.provider.to_string(),
            }),
            None => Ok(None),
        }
    }

    /// Check the profile for obviously broken settings
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::ConfigValidation`] describing the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AdapterError::ConfigValidation(
                "backend profile name is empty".to_string(),
            ));
        }
        if self.model_name.trim().is_empty() {
            return Err(AdapterError::ConfigValidation(format!(
                "backend '{}' has no model_name",
                self.name
            )));
        }
        if self.effective_base_url().is_none() {
            return Err(AdapterError::ConfigValidation(format!(
                "backend '{}' needs a base_url for provider {}",
                self.name, self.provider
            )));
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(AdapterError::ConfigValidation(format!(
                    "backend '{}' temperature {temperature} is outside 0.0-2.0",
                    self.name
                )));
            }
        }
        Ok(())
    }
}
