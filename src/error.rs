//! Error types for the adapter

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`AdapterError`]
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Failure reported by a backend chat service.
///
/// Transient (network, rate limit) and permanent (authentication, invalid
/// request) failures share one category as far as the adapter is concerned.
/// Only [`BackendError::Cancelled`] is treated differently.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP transport failure
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Response did not match the expected shape
    #[error("response parse error: {0}")]
    Parse(String),

    /// The in-flight call was cancelled
    #[error("backend call cancelled")]
    Cancelled,

    /// Backend-specific failure
    #[error("{0}")]
    Other(String),
}

impl From<String> for BackendError {
    fn from(s: String) -> Self {
        BackendError::Other(s)
    }
}

impl From<&str> for BackendError {
    fn from(s: &str) -> Self {
        BackendError::Other(s.to_string())
    }
}

/// Main error type for the adapter
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The backend failed on the original call and on the diagnostic retry
    #[error("backend invocation failed after retry: {source}")]
    BackendInvocationFailed {
        #[source]
        source: BackendError,
    },

    /// Neither the adapter nor the backend exposes the requested capability
    #[error("capability not found: {name}")]
    CapabilityNotFound { name: String },

    /// Invocation cancelled by the caller
    #[error("invocation cancelled")]
    Cancelled,

    /// Blocking invocation could not drive its runtime
    #[error("runtime error: {0}")]
    Runtime(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parse error
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ConfigValidation(String),

    /// No API key configured or present in the environment
    #[error("Missing API key for provider: {provider}")]
    MissingApiKey { provider: String },

    /// No backend profile with the requested name
    #[error("Backend not found: {0}")]
    BackendNotFound(String),

    /// HTTP client construction error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AdapterError {
    /// Shorthand for [`AdapterError::CapabilityNotFound`]
    pub fn capability_not_found(name: impl Into<String>) -> Self {
        Self::CapabilityNotFound { name: name.into() }
    }
}
