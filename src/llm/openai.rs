//! OpenAI-compatible chat-completions client
//!
//! Works against any endpoint speaking the OpenAI chat-completions shape
//! (OpenAI itself, SiliconFlow, vLLM gateways). The pipeline deliberately
//! does not retry backend calls: a failed call degrades at the task runner
//! instead, to bound end-to-end latency.

use crate::llm::provider::{
    CompletionRequest, CompletionResponse, LlmError, LlmProvider, Message, MessageRole, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Provider configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(90),
        }
    }
}

/// OpenAI-compatible provider implementation
pub struct OpenAiCompatibleProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::NotConfigured("API key is required".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Convert internal message to wire format (pure function)
    fn convert_message(message: &Message) -> WireMessage {
        WireMessage {
            role: match message.role {
                MessageRole::System => "system".to_string(),
                MessageRole::User => "user".to_string(),
                MessageRole::Assistant => "assistant".to_string(),
            },
            content: message.content.clone(),
        }
    }

    /// Parse a wire response into the provider-neutral shape (pure function)
    fn parse_completion_response(
        wire: WireCompletionResponse,
    ) -> Result<CompletionResponse, LlmError> {
        let choice = wire
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))?;

        let content = choice
            .message
            .content
            .ok_or_else(|| LlmError::InvalidResponse("choice has no content".to_string()))?;

        let usage = wire.usage.unwrap_or_default();

        Ok(CompletionResponse {
            content,
            model: wire.model,
            usage: TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            },
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let wire_request = WireCompletionRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(
            model = %wire_request.model,
            messages = wire_request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| {
                warn!("Completion request failed: {e}");
                LlmError::NetworkError(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => LlmError::AuthenticationFailed(format!("{status}: {body}")),
                429 => LlmError::RateLimitExceeded(body),
                s if s >= 500 => LlmError::ApiError(format!("{status}: {body}")),
                _ => LlmError::RequestFailed(format!("{status}: {body}")),
            });
        }

        let wire: WireCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Self::parse_completion_response(wire)
    }
}

#[derive(Debug, Serialize)]
struct WireCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireCompletionResponse {
    model: String,
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(OpenAiConfig {
            api_key: "test-key".to_string(),
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_requires_api_key() {
        let result = OpenAiCompatibleProvider::new(OpenAiConfig::default());
        assert!(matches!(result, Err(LlmError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "test-model",
                "choices": [{"message": {"role": "assistant", "content": "Rating: 7/10"}}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let request = CompletionRequest::from_role_context("test-model", "system", "user");
        let response = provider.complete(request).await.unwrap();

        assert_eq!(response.content, "Rating: 7/10");
        assert_eq!(response.usage.total_tokens, 15);
    }

    #[tokio::test]
    async fn test_auth_failure_maps_to_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let request = CompletionRequest::from_role_context("test-model", "system", "user");
        let result = provider.complete(request).await;

        assert!(matches!(result, Err(LlmError::AuthenticationFailed(_))));
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_rate_limit_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let request = CompletionRequest::from_role_context("test-model", "system", "user");
        let result = provider.complete(request).await;

        assert!(matches!(result, Err(LlmError::RateLimitExceeded(_))));
    }

    #[tokio::test]
    async fn test_empty_choices_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "test-model",
                "choices": []
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let request = CompletionRequest::from_role_context("test-model", "system", "user");
        let result = provider.complete(request).await;

        assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
    }
}
