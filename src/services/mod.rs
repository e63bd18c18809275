//! Service layer for backend chat services
//!
//! This module defines the [`ChatBackend`] contract the invocation adapter
//! talks to, plus concrete backends for:
//! - OpenAI and OpenAI-compatible endpoints (Ollama, Groq, custom)
//! - Anthropic

pub mod adapters;
pub mod anthropic;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    config::models::{BackendProfile, ProviderType},
    error::{BackendError, Result},
    messages::Conversation,
};

/// Per-call settings passed through to the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationOptions {
    /// Temperature for sampling (0.0-2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Top-p for nucleus sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Stop sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

/// Core trait for backend chat services
///
/// A backend turns a [`Conversation`] into completion text. Besides
/// `complete`, it declares the handful of capabilities agent frameworks probe
/// for. Anything beyond that set must be declared explicitly through
/// [`ChatBackend::extension`].
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Declared backend kind, e.g. `ChatOpenAI`
    fn kind(&self) -> &str;

    /// Configured model identifier
    fn model_name(&self) -> Option<String>;

    /// Default sampling temperature, if the backend has one
    fn temperature(&self) -> Option<f32> {
        None
    }

    /// Default output token limit, if the backend has one
    fn max_tokens(&self) -> Option<u32> {
        None
    }

    /// Backend-specific fields exposed by name
    fn extension(&self, name: &str) -> Option<serde_json::Value> {
        let _ = name;
        None
    }

    /// Produce a completion for the conversation
    async fn complete(
        &self,
        conversation: &Conversation,
        options: Option<&InvocationOptions>,
    ) -> std::result::Result<String, BackendError>;
}

/// Factory for creating backends
pub struct BackendFactory;

impl BackendFactory {
    /// Create a backend from a profile
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client cannot be built
    pub fn create(profile: &BackendProfile) -> Result<Arc<dyn ChatBackend>> {
        match profile.provider {
            ProviderType::Anthropic => Ok(Arc::new(anthropic::AnthropicBackend::new(
                profile.clone(),
            )?)),
            // Ollama, Groq and custom endpoints speak the OpenAI chat API
            ProviderType::OpenAI
            | ProviderType::CustomOpenAI
            | ProviderType::Ollama
            | ProviderType::Groq => Ok(Arc::new(openai::OpenAiBackend::new(profile.clone())?)),
        }
    }
}

static SECRET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"sk-ant-[A-Za-z0-9_\-]{10,}",
        r"sk-[A-Za-z0-9_\-]{20,}",
        r"gsk_[A-Za-z0-9]{20,}",
        r"Bearer\s+[A-Za-z0-9._\-]{10,}",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

const TRUNCATION_MARKER: &str = "...";

/// Collapse whitespace, redact API keys and bound error text to `max_chars`
#[must_use]
pub fn sanitize_error_text(raw: &str, max_chars: usize) -> String {
    let mut sanitized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    for regex in SECRET_PATTERNS.iter() {
        sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
    }

    if sanitized.chars().count() <= max_chars {
        return sanitized;
    }
    let keep = max_chars.saturating_sub(TRUNCATION_MARKER.len());
    let mut shortened: String = sanitized.chars().take(keep).collect();
    if max_chars >= TRUNCATION_MARKER.len() {
        shortened.push_str(TRUNCATION_MARKER);
    }
    shortened
}

/// Maximum characters of an HTTP error body kept in [`BackendError::HttpStatus`]
pub(crate) const MAX_ERROR_BODY_CHARS: usize = 512;

/// Return the body of a successful response, or a sanitized status error
pub(crate) async fn check_http_response(
    response: reqwest::Response,
) -> std::result::Result<String, BackendError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(BackendError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_error_text(&body, MAX_ERROR_BODY_CHARS),
        });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_redacts_keys() {
        let text = sanitize_error_text(
            "invalid key sk-abcdefghijklmnopqrstuvwxyz0123 supplied",
            200,
        );
        assert_eq!(text, "invalid key [REDACTED] supplied");
    }

    #[test]
    fn test_sanitize_bounds_length() {
        let raw = "x".repeat(1000);
        let text = sanitize_error_text(&raw, 64);
        assert_eq!(text.chars().count(), 64);
        assert!(text.ends_with("..."));
    }

    #[test]
    fn test_sanitize_collapses_whitespace() {
        assert_eq!(sanitize_error_text("a\n\n  b\tc", 64), "a b c");
    }

    #[test]
    fn test_options_skip_unset_fields() {
        let options = InvocationOptions {
            temperature: Some(0.2),
            ..InvocationOptions::default()
        };
        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(json, r#"{"temperature":0.2}"#);
    }
}
