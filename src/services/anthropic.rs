//! Anthropic messages API backend

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::models::BackendProfile,
    error::{AdapterError, BackendError, Result},
    messages::{Conversation, Role},
};

use super::{check_http_response, ChatBackend, InvocationOptions};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The messages API rejects requests without `max_tokens`
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic messages API backend
pub struct AnthropicBackend {
    client: Client,
    profile: BackendProfile,
    base_url: String,
}

impl AnthropicBackend {
    /// Create a new Anthropic backend
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or malformed, or the client cannot be built
    pub fn new(profile: BackendProfile) -> Result<Self> {
        let api_key = profile
            .resolve_api_key()?
            .ok_or_else(|| AdapterError::MissingApiKey {
                provider: "anthropic".to_string(),
            })?;

        let base_url = profile
            .effective_base_url()
            .unwrap_or_else(|| "https://api.anthropic.com".to_string());

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            header::HeaderValue::from_str(&api_key).map_err(|_| {
                AdapterError::ConfigValidation("Invalid API key format".to_string())
            })?,
        );
        headers.insert(
            "anthropic-version",
            header::HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let mut builder = Client::builder().default_headers(headers);
        if let Some(secs) = profile.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            profile,
            base_url,
        })
    }

    /// Split system turns out of the conversation; the API takes them separately
    fn convert_messages(conversation: &Conversation) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system = Vec::new();
        let mut messages = Vec::new();
        for turn in conversation {
            match turn.role {
                Role::System => system.push(turn.text.as_str()),
                Role::User | Role::Assistant => messages.push(AnthropicMessage {
                    role: turn.role.as_str().to_string(),
                    content: turn.text.clone(),
                }),
            }
        }
        // A conversation made only of system turns still needs one user message.
        if messages.is_empty() {
            messages.push(AnthropicMessage {
                role: Role::User.as_str().to_string(),
                content: system.join("\n\n"),
            });
            return (None, messages);
        }
        let system = if system.is_empty() {
            None
        } else {
            Some(system.join("\n\n"))
        };
        (system, messages)
    }
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
    fn kind(&self) -> &str {
        "ChatAnthropic"
    }

    fn model_name(&self) -> Option<String> {
        Some(self.profile.model_name.clone())
    }

    fn temperature(&self) -> Option<f32> {
        self.profile.temperature
    }

    fn max_tokens(&self) -> Option<u32> {
        self.profile.max_tokens
    }

    fn extension(&self, name: &str) -> Option<serde_json::Value> {
        match name {
            "base_url" | "anthropic_api_url" => Some(self.base_url.clone().into()),
            "anthropic_version" => Some(ANTHROPIC_VERSION.into()),
            "timeout_secs" => self.profile.timeout_secs.map(Into::into),
            _ => None,
        }
    }

    async fn complete(
        &self,
        conversation: &Conversation,
        options: Option<&InvocationOptions>,
    ) -> std::result::Result<String, BackendError> {
        let options = options.cloned().unwrap_or_default();
        let (system, messages) = Self::convert_messages(conversation);

        let request = AnthropicRequest {
            model: self.profile.model_name.clone(),
            messages,
            system,
            max_tokens: options
                .max_tokens
                .or(self.profile.max_tokens)
                .unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: options.temperature.or(self.profile.temperature),
            top_p: options.top_p,
            stop_sequences: options.stop_sequences,
        };
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "sending messages request"
        );

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .json(&request)
            .send()
            .await?;
        let body = check_http_response(response).await?;

        let api_response: AnthropicResponse =
            serde_json::from_str(&body).map_err(|e| BackendError::Parse(e.to_string()))?;
        debug!(
            stop_reason = api_response.stop_reason.as_deref().unwrap_or("?"),
            "messages response received"
        );

        Ok(api_response
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text),
                AnthropicContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

// Anthropic API types

#[derive(Debug, Clone, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}
