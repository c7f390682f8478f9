//! Mock reasoning backend and market data source
//!
//! The mock provider keys canned behavior on the `role` request metadata
//! that the task runner records, so one provider instance can script a whole
//! pipeline run: per-role responses, failures, and completion delays.

use crate::llm::{CompletionRequest, CompletionResponse, LlmError, LlmProvider, TokenUsage};
use crate::tools::{MarketDataSource, ToolError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scriptable in-memory reasoning backend
pub struct MockLlmProvider {
    responses: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    failures: HashSet<String>,
    calls: Arc<Mutex<Vec<String>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            delays: HashMap::new(),
            failures: HashSet::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Canned response for a role
    pub fn with_response(mut self, role: &str, response: &str) -> Self {
        self.responses.insert(role.to_string(), response.to_string());
        self
    }

    /// Make every call for a role fail
    pub fn with_failure(mut self, role: &str) -> Self {
        self.failures.insert(role.to_string());
        self
    }

    /// Delay completion for a role, for scheduling and timeout tests
    pub fn with_delay(mut self, role: &str, delay: Duration) -> Self {
        self.delays.insert(role.to_string(), delay);
        self
    }

    /// Roles called so far, in call order
    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().expect("call log lock").clone()
    }

    /// Handle to the call log that survives moving the provider into an Arc
    pub fn call_log_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }

    /// Full requests received so far, in call order
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("request log lock").clone()
    }

    /// Handle to the request log that survives moving the provider into an Arc
    pub fn request_log_handle(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        self.requests.clone()
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let role = request
            .metadata
            .get("role")
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());

        self.calls.lock().expect("call log lock").push(role.clone());
        self.requests
            .lock()
            .expect("request log lock")
            .push(request.clone());

        if let Some(delay) = self.delays.get(&role) {
            tokio::time::sleep(*delay).await;
        }

        if self.failures.contains(&role) {
            return Err(LlmError::ApiError(format!("scripted failure for {role}")));
        }

        let content = self
            .responses
            .get(&role)
            .cloned()
            .unwrap_or_else(|| "No particular view either way.".to_string());

        Ok(CompletionResponse {
            content,
            model: request.model,
            usage: TokenUsage {
                prompt_tokens: 50,
                completion_tokens: 50,
                total_tokens: 100,
            },
        })
    }
}

/// Market data source returning fixed text for every query
pub struct StaticMarketDataSource;

#[async_trait]
impl MarketDataSource for StaticMarketDataSource {
    async fn price_history(&self, symbol: &str) -> Result<String, ToolError> {
        Ok(format!("{symbol}: 30-day closes trending up"))
    }

    async fn news(&self, symbol: &str) -> Result<String, ToolError> {
        Ok(format!("{symbol}: earnings beat expectations"))
    }

    async fn technical_indicators(&self, symbol: &str) -> Result<String, ToolError> {
        Ok(format!("{symbol}: RSI 58, MACD positive"))
    }

    async fn social_sentiment(&self, symbol: &str) -> Result<String, ToolError> {
        Ok(format!("{symbol}: retail chatter mildly positive"))
    }

    async fn macro_indicators(&self) -> Result<String, ToolError> {
        Ok("rates steady, CPI cooling".to_string())
    }

    async fn fundamentals(&self, symbol: &str) -> Result<String, ToolError> {
        Ok(format!("{symbol}: revenue +12% YoY, margin stable"))
    }

    async fn event_impact(&self, symbol: &str) -> Result<String, ToolError> {
        Ok(format!("{symbol}: no major events scheduled"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionRequest;

    #[tokio::test]
    async fn test_mock_provider_keys_on_role_metadata() {
        let provider = MockLlmProvider::new().with_response("trader", "Buy. Half position.");

        let request = CompletionRequest::from_role_context("m", "s", "u")
            .with_metadata("role", "trader");
        let response = provider.complete(request).await.unwrap();
        assert_eq!(response.content, "Buy. Half position.");

        assert_eq!(provider.call_log(), vec!["trader"]);

        let recorded = provider.recorded_requests();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].messages[1].content, "u");
    }

    #[tokio::test]
    async fn test_mock_provider_scripted_failure() {
        let provider = MockLlmProvider::new().with_failure("trader");

        let request = CompletionRequest::from_role_context("m", "s", "u")
            .with_metadata("role", "trader");
        assert!(provider.complete(request).await.is_err());
    }

    #[tokio::test]
    async fn test_unscripted_role_gets_neutral_text() {
        let provider = MockLlmProvider::new();
        let request = CompletionRequest::from_role_context("m", "s", "u")
            .with_metadata("role", "news_analyst");
        let response = provider.complete(request).await.unwrap();
        assert!(!response.content.is_empty());
    }
}
