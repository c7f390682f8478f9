//! Stage execution over one pipeline layer
//!
//! A stage is an ordered list of task specs plus an execution mode. In
//! concurrent mode every task starts immediately, but results are awaited
//! and emitted in declared order, so the event stream is deterministic
//! regardless of which backend call finishes first.

use crate::agents::{AgentRole, AgentTask};
use crate::error::{PipelineError, PipelineResult};
use crate::events::{Event, EventEmitter};
use crate::pipeline::runner::TaskRunner;
use std::sync::Arc;
use tracing::info;

/// One task to run within a stage
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub role: AgentRole,
    pub context: String,
}

impl TaskSpec {
    pub fn new(role: AgentRole, context: impl Into<String>) -> Self {
        Self {
            role,
            context: context.into(),
        }
    }
}

/// How a stage schedules its tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMode {
    Sequential,
    Concurrent,
}

/// Completed stage with tasks in declared order
#[derive(Debug, Clone)]
pub struct StageResult {
    pub layer: u8,
    pub tasks: Vec<AgentTask>,
}

impl StageResult {
    /// First task produced by the given role, if the stage ran it
    pub fn task(&self, role: AgentRole) -> Option<&AgentTask> {
        self.tasks.iter().find(|t| t.role == role)
    }

    /// Rating of the given role's task, if present and rated
    pub fn rating_of(&self, role: AgentRole) -> Option<f64> {
        self.task(role).and_then(|t| t.rating)
    }
}

/// Runs stages and reports per-task progress on the event stream
pub struct StageExecutor {
    runner: Arc<TaskRunner>,
    emitter: EventEmitter,
}

impl StageExecutor {
    pub fn new(runner: Arc<TaskRunner>, emitter: EventEmitter) -> Self {
        Self { runner, emitter }
    }

    /// Run one stage to completion.
    ///
    /// Emits a `status` event as each task starts and an `agent_output`
    /// event as each result is ready, both in declared task order.
    pub async fn run_stage(
        &self,
        layer: u8,
        mode: StageMode,
        specs: Vec<TaskSpec>,
    ) -> PipelineResult<StageResult> {
        info!(layer, tasks = specs.len(), ?mode, "Running stage");

        let tasks = match mode {
            StageMode::Sequential => self.run_sequential(specs).await?,
            StageMode::Concurrent => self.run_concurrent(specs).await?,
        };

        for task in &tasks {
            self.emitter
                .emit(Event::agent_output(
                    layer,
                    task.role.as_str(),
                    serde_json::to_value(task)
                        .map_err(|e| PipelineError::internal(e.to_string()))?,
                ))
                .await?;
        }

        Ok(StageResult { layer, tasks })
    }

    async fn run_sequential(&self, specs: Vec<TaskSpec>) -> PipelineResult<Vec<AgentTask>> {
        let mut tasks = Vec::with_capacity(specs.len());
        for spec in specs {
            self.emitter
                .emit(Event::status(spec.role.working_notice()))
                .await?;
            tasks.push(self.runner.run(spec.role, &spec.context).await);
        }
        Ok(tasks)
    }

    async fn run_concurrent(&self, specs: Vec<TaskSpec>) -> PipelineResult<Vec<AgentTask>> {
        let mut handles = Vec::with_capacity(specs.len());
        for spec in specs {
            self.emitter
                .emit(Event::status(spec.role.working_notice()))
                .await?;
            let runner = self.runner.clone();
            handles.push(tokio::spawn(async move {
                runner.run(spec.role, &spec.context).await
            }));
        }

        // Awaiting handles in declared order buffers out-of-order finishes.
        let mut tasks = Vec::with_capacity(handles.len());
        for handle in handles {
            tasks.push(
                handle
                    .await
                    .map_err(|e| PipelineError::internal(format!("stage task panicked: {e}")))?,
            );
        }
        Ok(tasks)
    }
}
