//! Single reasoning task execution
//!
//! One runner is shared by every stage of a run. A backend fault or timeout
//! never escapes: the task degrades into explanatory output with a neutral
//! rating, and the pipeline keeps moving.

use crate::agents::{AgentRole, AgentTask};
use crate::extract::{self, NEUTRAL_RATING};
use crate::llm::{CompletionRequest, LlmProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Executes one role's reasoning call against the backend
pub struct TaskRunner {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl TaskRunner {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: Option<u32>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens,
            timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one task to completion.
    ///
    /// Always produces an [`AgentTask`]. On backend failure or timeout the
    /// output states that the analysis is unavailable, and rated roles fall
    /// back to the neutral rating so downstream arithmetic stays defined.
    pub async fn run(&self, role: AgentRole, context: &str) -> AgentTask {
        let request = CompletionRequest::from_role_context(
            self.model.clone(),
            role.system_prompt(),
            context,
        )
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens)
        .with_metadata("role", role.as_str());

        let outcome = tokio::time::timeout(self.timeout, self.provider.complete(request)).await;

        // Degraded tasks never carry an extracted rating; rated roles fall
        // back to the neutral midpoint.
        let (content, degraded) = match outcome {
            Ok(Ok(response)) => {
                debug!(
                    role = role.as_str(),
                    tokens = response.usage.total_tokens,
                    "Task completed"
                );
                (response.content, false)
            }
            Ok(Err(e)) => {
                warn!(role = role.as_str(), error = %e, "Task degraded on backend failure");
                (format!("{} analysis unavailable: {e}", role.as_str()), true)
            }
            Err(_) => {
                warn!(
                    role = role.as_str(),
                    timeout_secs = self.timeout.as_secs(),
                    "Task degraded on timeout"
                );
                (
                    format!(
                        "{} analysis unavailable: timed out after {}s",
                        role.as_str(),
                        self.timeout.as_secs()
                    ),
                    true,
                )
            }
        };

        let rating = role.requires_rating().then(|| {
            if degraded {
                NEUTRAL_RATING
            } else {
                extract::extract_rating(&content)
            }
        });

        AgentTask::new(role, content, rating)
    }
}
