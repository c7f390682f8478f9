//! Four-layer analysis pipeline
//!
//! The orchestrator drives analyst, researcher, trader, and risk layers over
//! a shared task runner. Stages own concurrency and event emission, the
//! debate coordinator owns the conditional researcher sub-protocol, and the
//! runner owns degradation of individual reasoning calls.

pub mod debate;
pub mod orchestrator;
pub mod runner;
pub mod stage;

pub use debate::{DebateCoordinator, DebateOutcome, DebateRound};
pub use orchestrator::{DebateSummary, FinalDecision, PipelineOrchestrator, SupportingScores};
pub use runner::TaskRunner;
pub use stage::{StageExecutor, StageMode, StageResult, TaskSpec};
