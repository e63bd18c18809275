//! OpenAI chat completions backend
//!
//! Supports:
//! - OpenAI official API
//! - OpenAI-compatible endpoints (Ollama, Groq, LM Studio, etc.)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::models::BackendProfile,
    error::{AdapterError, BackendError, Result},
    messages::Conversation,
};

use super::{check_http_response, ChatBackend, InvocationOptions};

/// OpenAI chat completions backend
pub struct OpenAiBackend {
    client: Client,
    profile: BackendProfile,
    base_url: String,
}

impl OpenAiBackend {
    /// Create a new OpenAI backend
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or malformed, or the client cannot be built
    pub fn new(profile: BackendProfile) -> Result<Self> {
        let api_key = profile.resolve_api_key()?;

        let base_url = profile.effective_base_url().ok_or_else(|| {
            AdapterError::ConfigValidation(format!("backend '{}' has no base_url", profile.name))
        })?;

        let mut headers = header::HeaderMap::new();
        if let Some(api_key) = api_key {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
                    AdapterError::ConfigValidation("Invalid API key format".to_string())
                })?,
            );
        }

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

    /// Convert a conversation to OpenAI format
    fn convert_messages(conversation: &Conversation) -> Vec<OpenAIMessage> {
        conversation
            .iter()
            .map(|turn| OpenAIMessage {
                role: turn.role.as_str().to_string(),
                content: Some(turn.text.clone()),
            })
            .collect()
    }

    fn build_request(
        &self,
        conversation: &Conversation,
        options: Option<&InvocationOptions>,
    ) -> OpenAIRequest {
        let options = options.cloned().unwrap_or_default();
        OpenAIRequest {
            model: self.profile.model_name.clone(),
            messages: Self::convert_messages(conversation),
            temperature: options.temperature.or(self.profile.temperature),
            max_tokens: options.max_tokens.or(self.profile.max_tokens),
            top_p: options.top_p,
            stop: options.stop_sequences,
            stream: Some(false),
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn kind(&self) -> &str {
        "ChatOpenAI"
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
            "base_url" | "openai_api_base" => Some(self.base_url.clone().into()),
            "provider_type" => Some(self.profile.provider.to_string().into()),
            "timeout_secs" => self.profile.timeout_secs.map(Into::into),
            _ => None,
        }
    }

    async fn complete(
        &self,
        conversation: &Conversation,
        options: Option<&InvocationOptions>,
    ) -> std::result::Result<String, BackendError> {
        let request = self.build_request(conversation, options);
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request)
            .send()
            .await?;
        let body = check_http_response(response).await?;

        let api_response: OpenAIResponse =
            serde_json::from_str(&body).map_err(|e| BackendError::Parse(e.to_string()))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Parse("No choices in response".to_string()))?;
        debug!(
            model = api_response.model.as_deref().unwrap_or("?"),
            finish_reason = choice.finish_reason.as_deref().unwrap_or("?"),
            "chat completion received"
        );

        Ok(choice.message.content.unwrap_or_default())
    }
}

// OpenAI API types

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::{config::models::ProviderType, messages::Turn};

    fn profile(base_url: &str) -> BackendProfile {
        let mut profile = BackendProfile::new("test", ProviderType::OpenAI, "gpt-4o-mini");
        profile.base_url = Some(base_url.to_string());
        profile.api_key = "test-key".to_string();
        profile.temperature = Some(0.7);
        profile
    }

    #[tokio::test]
    async fn test_complete_sends_turns_and_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "be terse"},
                    {"role": "user", "content": "ping"}
                ],
                "temperature": 0.7
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "pong"},
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(profile(&server.uri())).unwrap();
        let conversation =
            Conversation::new(vec![Turn::system("be terse"), Turn::user("ping")]).unwrap();
        let text = backend.complete(&conversation, None).await.unwrap();
        assert_eq!(text, "pong");
    }

    #[tokio::test]
    async fn test_call_options_override_profile_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"max_tokens": 64, "temperature": 0.0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "ok"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(profile(&server.uri())).unwrap();
        let options = InvocationOptions {
            temperature: Some(0.0),
            max_tokens: Some(64),
            ..InvocationOptions::default()
        };
        let conversation = Conversation::single(Turn::user("hi"));
        let text = backend.complete(&conversation, Some(&options)).await.unwrap();
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit reached"))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(profile(&server.uri())).unwrap();
        let err = backend
            .complete(&Conversation::single(Turn::user("hi")), None)
            .await
            .unwrap_err();
        match err {
            BackendError::HttpStatus { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "Rate limit reached");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(profile(&server.uri())).unwrap();
        let err = backend
            .complete(&Conversation::single(Turn::user("hi")), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Parse(_)));
    }

    #[test]
    fn test_capabilities() {
        let backend = OpenAiBackend::new(profile("http://localhost:9")).unwrap();
        assert_eq!(backend.kind(), "ChatOpenAI");
        assert_eq!(backend.model_name().as_deref(), Some("gpt-4o-mini"));
        assert_eq!(backend.temperature(), Some(0.7));
        assert_eq!(backend.max_tokens(), None);
        assert_eq!(
            backend.extension("base_url"),
            Some(json!("http://localhost:9"))
        );
        assert_eq!(backend.extension("nope"), None);
    }
}
