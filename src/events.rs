//! Ordered progress event stream
//!
//! Every orchestrator, stage, and debate transition becomes one [`Event`]
//! with a monotonic sequence number, delivered to the transport consumer in
//! emission order. The emitter is the only writer of sequence numbers, so
//! total order over a run is guaranteed by construction.

use crate::error::{PipelineError, PipelineResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Event discriminator, matching the wire protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Status,
    LayerStart,
    AgentOutput,
    DebateTriggered,
    RiskAssessment,
    FinalResult,
    Error,
}

/// One unit of the progress stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub seq: u64,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    fn new(event_type: EventType) -> Self {
        Self {
            seq: 0, // assigned by the emitter
            event_type,
            layer: None,
            role: None,
            message: None,
            data: None,
            timestamp: Utc::now(),
        }
    }

    pub fn status(message: impl Into<String>) -> Self {
        Self::new(EventType::Status).with_message(message)
    }

    pub fn layer_start(layer: u8, message: impl Into<String>) -> Self {
        Self::new(EventType::LayerStart)
            .with_layer(layer)
            .with_message(message)
    }

    pub fn agent_output(layer: u8, role: impl Into<String>, data: serde_json::Value) -> Self {
        Self::new(EventType::AgentOutput)
            .with_layer(layer)
            .with_role(role)
            .with_data(data)
    }

    pub fn debate_triggered(data: serde_json::Value) -> Self {
        Self::new(EventType::DebateTriggered)
            .with_layer(2)
            .with_data(data)
    }

    pub fn risk_assessment(data: serde_json::Value) -> Self {
        Self::new(EventType::RiskAssessment)
            .with_layer(4)
            .with_data(data)
    }

    pub fn final_result(data: serde_json::Value) -> Self {
        Self::new(EventType::FinalResult).with_data(data)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventType::Error).with_message(message)
    }

    pub fn with_layer(mut self, layer: u8) -> Self {
        self.layer = Some(layer);
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Assigns sequence numbers and forwards events to the consumer channel
#[derive(Clone)]
pub struct EventEmitter {
    sender: mpsc::Sender<Event>,
    next_seq: Arc<AtomicU64>,
}

impl EventEmitter {
    /// Create an emitter and the consumer side of the stream
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Event>) {
        let (sender, receiver) = mpsc::channel(buffer);
        (
            Self {
                sender,
                next_seq: Arc::new(AtomicU64::new(1)),
            },
            receiver,
        )
    }

    /// Emit one event with the next sequence number.
    ///
    /// Fails with [`PipelineError::StreamClosed`] once the consumer is gone;
    /// callers treat that as a signal to stop scheduling work.
    pub async fn emit(&self, mut event: Event) -> PipelineResult<()> {
        event.seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.sender
            .send(event)
            .await
            .map_err(|_| PipelineError::StreamClosed)
    }
}
