//! TradeCouncil - multi-agent stock analysis pipeline
//!
//! A four-layer committee of reasoning agents over an OpenAI-compatible
//! backend:
//! - Layer 1: four analysts review fundamentals, sentiment, news, and
//!   technicals concurrently
//! - Layer 2: bullish and bearish researchers take positions; a large
//!   conviction gap triggers a moderated debate
//! - Layer 3: a trader drafts the plan
//! - Layer 4: three risk managers review it and a portfolio manager makes
//!   the final call
//!
//! Progress streams to HTTP clients as NDJSON events with monotonic
//! sequence numbers. Individual reasoning faults degrade in place; a run
//! only fails outright on configuration problems or consumer disconnect.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tradecouncil::events::EventEmitter;
//! use tradecouncil::pipeline::{PipelineOrchestrator, TaskRunner};
//! use tradecouncil::testing::{MockLlmProvider, StaticMarketDataSource};
//! use tradecouncil::tools::ToolRegistry;
//!
//! # async fn run() {
//! let provider = Arc::new(MockLlmProvider::new());
//! let runner = Arc::new(TaskRunner::new(
//!     provider,
//!     "Qwen/Qwen2.5-7B-Instruct",
//!     0.7,
//!     None,
//!     Duration::from_secs(90),
//! ));
//! let tools = Arc::new(ToolRegistry::with_builtin(Arc::new(StaticMarketDataSource)));
//! let (emitter, mut events) = EventEmitter::channel(64);
//!
//! let orchestrator = PipelineOrchestrator::new(runner, tools, emitter, 3.0, 2);
//! tokio::spawn(async move { orchestrator.execute("600519").await });
//! while let Some(event) = events.recv().await {
//!     println!("{}", serde_json::to_string(&event).unwrap());
//! }
//! # }
//! ```

pub mod agents;
pub mod config;
pub mod error;
pub mod events;
pub mod extract;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod testing;
pub mod tools;

pub use config::AppConfig;
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{FinalDecision, PipelineOrchestrator};
