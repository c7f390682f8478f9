//! Error taxonomy for pipeline runs
//!
//! Faults inside a single reasoning call never surface here: the task runner
//! converts them into degraded task output. This module only covers the
//! faults that terminate a run, which the server turns into one terminal
//! `error` event on the stream.

use thiserror::Error;

/// Top-level error for a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] crate::config::ConfigError),

    #[error("Reasoning backend is not configured: {0}")]
    BackendNotConfigured(String),

    #[error("Event consumer disconnected")]
    StreamClosed,

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PipelineError {
    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True when the run ended because the consumer went away.
    ///
    /// These are not reported as `error` events; there is nobody left to
    /// read them.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, PipelineError::StreamClosed)
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
