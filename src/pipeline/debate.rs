//! Conditional researcher debate
//!
//! Triggered only when the bull and bear conviction ratings diverge by at
//! least the configured threshold. A round is moderator framing, then a
//! bull rebuttal, then a bear rebuttal that sees the bull's same-round
//! rebuttal. Rounds always run to the configured maximum; there is no early
//! convergence exit, so transcript length is predictable.

use crate::agents::{AgentRole, AgentTask};
use crate::error::{PipelineError, PipelineResult};
use crate::events::{Event, EventEmitter};
use crate::extract::NEUTRAL_RATING;
use crate::pipeline::runner::TaskRunner;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// One completed debate round
#[derive(Debug, Clone, Serialize)]
pub struct DebateRound {
    pub round: u32,
    pub moderator: AgentTask,
    pub bull_rebuttal: AgentTask,
    pub bear_rebuttal: AgentTask,
}

/// Result of the debate decision and any rounds that ran
#[derive(Debug, Clone, Serialize)]
pub struct DebateOutcome {
    pub triggered: bool,
    pub score_delta: f64,
    pub rounds: Vec<DebateRound>,
}

impl DebateOutcome {
    fn skipped(score_delta: f64) -> Self {
        Self {
            triggered: false,
            score_delta,
            rounds: Vec::new(),
        }
    }

    /// Transcript lines for downstream context, empty when no debate ran
    pub fn transcript(&self) -> String {
        let mut lines = Vec::new();
        for round in &self.rounds {
            lines.push(format!("Round {} moderator: {}", round.round, round.moderator.output));
            lines.push(format!("Round {} bull: {}", round.round, round.bull_rebuttal.output));
            lines.push(format!("Round {} bear: {}", round.round, round.bear_rebuttal.output));
        }
        lines.join("\n")
    }
}

/// Decides whether to debate and drives the rounds
pub struct DebateCoordinator {
    runner: Arc<TaskRunner>,
    emitter: EventEmitter,
    threshold: f64,
    max_rounds: u32,
}

impl DebateCoordinator {
    pub fn new(
        runner: Arc<TaskRunner>,
        emitter: EventEmitter,
        threshold: f64,
        max_rounds: u32,
    ) -> Self {
        Self {
            runner,
            emitter,
            threshold,
            max_rounds,
        }
    }

    /// Run the debate decision against the two researcher positions.
    ///
    /// A missing rating counts as the neutral midpoint, so degraded
    /// researchers rarely trigger a debate on their own.
    pub async fn run(
        &self,
        symbol: &str,
        bull: &AgentTask,
        bear: &AgentTask,
    ) -> PipelineResult<DebateOutcome> {
        let bull_score = bull.rating.unwrap_or(NEUTRAL_RATING);
        let bear_score = bear.rating.unwrap_or(NEUTRAL_RATING);
        let score_delta = (bull_score - bear_score).abs();

        if score_delta < self.threshold {
            info!(score_delta, threshold = self.threshold, "Debate skipped");
            return Ok(DebateOutcome::skipped(score_delta));
        }

        info!(
            score_delta,
            threshold = self.threshold,
            rounds = self.max_rounds,
            "Debate triggered"
        );
        self.emitter
            .emit(Event::debate_triggered(json!({
                "bullish_score": bull_score,
                "bearish_score": bear_score,
                "score_delta": score_delta,
                "threshold": self.threshold,
                "max_rounds": self.max_rounds,
            })))
            .await?;

        let mut rounds = Vec::with_capacity(self.max_rounds as usize);
        for round in 1..=self.max_rounds {
            self.emitter
                .emit(Event::status(format!(
                    "Debate round {round} of {}",
                    self.max_rounds
                )))
                .await?;
            let completed = self.run_round(symbol, bull, bear, round, &rounds).await?;
            rounds.push(completed);
        }

        Ok(DebateOutcome {
            triggered: true,
            score_delta,
            rounds,
        })
    }

    async fn run_round(
        &self,
        symbol: &str,
        bull: &AgentTask,
        bear: &AgentTask,
        round: u32,
        prior: &[DebateRound],
    ) -> PipelineResult<DebateRound> {
        let history = prior
            .iter()
            .map(|r| {
                format!(
                    "Round {}:\nModerator: {}\nBull: {}\nBear: {}",
                    r.round, r.moderator.output, r.bull_rebuttal.output, r.bear_rebuttal.output
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let moderator_context = format!(
            "Stock: {symbol}\nDebate round {round}.\n\n\
             Bullish position:\n{}\n\nBearish position:\n{}\n\n\
             Prior rounds:\n{}",
            bull.output,
            bear.output,
            if history.is_empty() { "none" } else { &history },
        );
        let moderator = self
            .run_and_emit(AgentRole::DebateModerator, &moderator_context)
            .await?;

        let bull_context = format!(
            "Stock: {symbol}\nDebate round {round}.\n\n\
             Moderator framing:\n{}\n\nOpposing bearish position:\n{}\n\n\
             Your original position:\n{}\n\nRebut the bearish case.",
            moderator.output, bear.output, bull.output,
        );
        let bull_rebuttal = self
            .run_and_emit(AgentRole::BullishResearcher, &bull_context)
            .await?;

        // The bear sees the bull's rebuttal from this same round.
        let bear_context = format!(
            "Stock: {symbol}\nDebate round {round}.\n\n\
             Moderator framing:\n{}\n\nOpposing bullish rebuttal:\n{}\n\n\
             Your original position:\n{}\n\nRebut the bullish case.",
            moderator.output, bull_rebuttal.output, bear.output,
        );
        let bear_rebuttal = self
            .run_and_emit(AgentRole::BearishResearcher, &bear_context)
            .await?;

        Ok(DebateRound {
            round,
            moderator,
            bull_rebuttal,
            bear_rebuttal,
        })
    }

    async fn run_and_emit(&self, role: AgentRole, context: &str) -> PipelineResult<AgentTask> {
        let task = self.runner.run(role, context).await;
        self.emitter
            .emit(Event::agent_output(
                2,
                role.as_str(),
                serde_json::to_value(&task).map_err(|e| PipelineError::internal(e.to_string()))?,
            ))
            .await?;
        Ok(task)
    }
}
