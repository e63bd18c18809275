//! Capability delegation
//!
//! Agent frameworks probe the chat model for optional attributes (provider,
//! model name, temperature, token limit) before using them. The adapter
//! answers those probes through [`Capabilities`]: identity fields come from
//! the [`AdapterIdentity`] fixed at construction, everything else is
//! forwarded to the backend. Fields outside that set are reachable only if
//! the backend declares them through
//! [`ChatBackend::extension`](crate::services::ChatBackend::extension), or
//! through the raw handle returned by [`ChatAdapter::backend`].

use std::fmt;

use serde::Serialize;
use serde_json::{Number, Value};

use super::invocation::ChatAdapter;
use crate::{
    error::{AdapterError, Result},
    services::ChatBackend,
};

/// Model name reported when the backend declares none
pub const UNKNOWN_MODEL: &str = "unknown";

/// Backend family label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderLabel {
    OpenAI,
    Google,
    Anthropic,
    Unknown,
}

impl ProviderLabel {
    /// Derive the label from a backend's declared kind, e.g. `ChatOpenAI`
    #[must_use]
    pub fn from_kind(kind: &str) -> Self {
        let kind = kind.to_lowercase();
        if kind.contains("openai") {
            Self::OpenAI
        } else if kind.contains("google") || kind.contains("gemini") {
            Self::Google
        } else if kind.contains("anthropic") {
            Self::Anthropic
        } else {
            Self::Unknown
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Google => "google",
            Self::Anthropic => "anthropic",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProviderLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the wrapped backend, fixed when the adapter is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterIdentity {
    provider: ProviderLabel,
    model_name: String,
}

impl AdapterIdentity {
    /// Inspect the backend once
    pub fn from_backend<B: ChatBackend + ?Sized>(backend: &B) -> Self {
        Self {
            provider: ProviderLabel::from_kind(backend.kind()),
            model_name: backend
                .model_name()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
        }
    }

    #[must_use]
    pub const fn provider(&self) -> ProviderLabel {
        self.provider
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Capabilities an agent framework may probe on the chat model
pub trait Capabilities {
    /// Backend family
    fn provider(&self) -> ProviderLabel;

    /// Model identifier
    fn model_name(&self) -> &str;

    /// Sampling temperature
    ///
    /// # Errors
    ///
    /// [`AdapterError::CapabilityNotFound`] if the backend has none
    fn temperature(&self) -> Result<f32>;

    /// Output token limit
    ///
    /// # Errors
    ///
    /// [`AdapterError::CapabilityNotFound`] if the backend has none
    fn max_tokens(&self) -> Result<u32>;

    /// Look a capability up by name
    ///
    /// # Errors
    ///
    /// [`AdapterError::CapabilityNotFound`] naming the field when neither the
    /// adapter nor the backend exposes it
    fn capability(&self, name: &str) -> Result<Value>;
}

impl<B: ChatBackend + ?Sized> Capabilities for ChatAdapter<B> {
    fn provider(&self) -> ProviderLabel {
        self.identity().provider()
    }

    fn model_name(&self) -> &str {
        self.identity().model_name()
    }

    fn temperature(&self) -> Result<f32> {
        self.backend()
            .temperature()
            .ok_or_else(|| AdapterError::capability_not_found("temperature"))
    }

    fn max_tokens(&self) -> Result<u32> {
        self.backend()
            .max_tokens()
            .ok_or_else(|| AdapterError::capability_not_found("max_tokens"))
    }

    fn capability(&self, name: &str) -> Result<Value> {
        match name {
            "provider" => Ok(Value::from(Capabilities::provider(self).as_str())),
            "model_name" | "model" => Ok(Value::from(Capabilities::model_name(self))),
            "temperature" => Capabilities::temperature(self).map(f32_to_json),
            "max_tokens" => Capabilities::max_tokens(self).map(Value::from),
            other => self
                .backend()
                .extension(other)
                .ok_or_else(|| AdapterError::capability_not_found(other)),
        }
    }
}

/// Widen through the shortest decimal form so `0.7_f32` reads back as `0.7`
fn f32_to_json(value: f32) -> Value {
    value
        .to_string()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or(Value::Null, Value::Number)
}
