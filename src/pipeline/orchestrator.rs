//! Four-layer run orchestration
//!
//! Drives analyst, researcher, trader, and risk layers in order, threading
//! each layer's output into the next layer's context and reporting every
//! transition on the event stream. The run ends with exactly one terminal
//! event: `final_result` on success, `error` on a terminating fault, or
//! silence when the consumer disconnected mid-run.

use crate::agents::AgentRole;
use crate::error::{PipelineError, PipelineResult};
use crate::events::{Event, EventEmitter};
use crate::extract::{
    self, Confidence, PositionSize, Recommendation, NEUTRAL_RATING,
};
use crate::pipeline::debate::{DebateCoordinator, DebateOutcome};
use crate::pipeline::runner::TaskRunner;
use crate::pipeline::stage::{StageExecutor, StageMode, StageResult, TaskSpec};
use crate::tools::ToolRegistry;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

/// Analyst reports are cut to this many characters in the trader context;
/// the trader weighs conclusions, not full reports.
const TRADER_REPORT_CHARS: usize = 200;

/// Ratings backing the final decision
#[derive(Debug, Clone, Serialize)]
pub struct SupportingScores {
    pub fundamentals: f64,
    pub technical: f64,
    pub bullish: f64,
    pub bearish: f64,
    pub score_diff: f64,
}

/// Debate facts carried into the final result
#[derive(Debug, Clone, Serialize)]
pub struct DebateSummary {
    pub triggered: bool,
    pub rounds: u32,
}

/// The synthesized outcome of a full run
#[derive(Debug, Clone, Serialize)]
pub struct FinalDecision {
    pub symbol: String,
    pub recommendation: Recommendation,
    pub confidence: Confidence,
    pub position: PositionSize,
    pub position_suggestions: BTreeMap<String, String>,
    pub scores: SupportingScores,
    pub debate: DebateSummary,
    pub summary: String,
}

/// Per-run accumulator, written only by the orchestrator between stages
/// and dropped once the final event is out
struct PipelineState {
    analysts: StageResult,
    researchers: StageResult,
    debate: DebateOutcome,
    trader: StageResult,
}

/// Drives one analysis run end to end
pub struct PipelineOrchestrator {
    tools: Arc<ToolRegistry>,
    emitter: EventEmitter,
    stages: StageExecutor,
    debate: DebateCoordinator,
}

impl PipelineOrchestrator {
    pub fn new(
        runner: Arc<TaskRunner>,
        tools: Arc<ToolRegistry>,
        emitter: EventEmitter,
        debate_threshold: f64,
        max_debate_rounds: u32,
    ) -> Self {
        Self {
            tools,
            emitter: emitter.clone(),
            stages: StageExecutor::new(runner.clone(), emitter.clone()),
            debate: DebateCoordinator::new(runner, emitter, debate_threshold, max_debate_rounds),
        }
    }

    /// Run the pipeline and report the outcome on the stream.
    ///
    /// Terminating faults become one `error` event, except a consumer
    /// disconnect, which has nobody left to notify.
    pub async fn execute(&self, symbol: &str) {
        match self.run(symbol).await {
            Ok(decision) => {
                info!(
                    symbol,
                    recommendation = decision.recommendation.as_str(),
                    "Analysis complete"
                );
            }
            Err(e) if e.is_disconnect() => {
                info!(symbol, "Consumer disconnected, run abandoned");
            }
            Err(e) => {
                error!(symbol, error = %e, "Analysis failed");
                let _ = self.emitter.emit(Event::error(e.to_string())).await;
            }
        }
    }

    /// Run all four layers and produce the final decision
    pub async fn run(&self, symbol: &str) -> PipelineResult<FinalDecision> {
        self.emitter
            .emit(Event::status(format!("Initializing analysis for {symbol}")))
            .await?;

        let analysts = self.run_analyst_layer(symbol).await?;
        let (researchers, debate) = self.run_researcher_layer(symbol, &analysts).await?;
        let trader = self
            .run_trader_layer(symbol, &analysts, &researchers, &debate)
            .await?;
        let state = PipelineState {
            analysts,
            researchers,
            debate,
            trader,
        };
        let decision = self.run_risk_layer(symbol, &state).await?;

        self.emitter
            .emit(Event::final_result(
                serde_json::to_value(&decision)
                    .map_err(|e| PipelineError::internal(e.to_string()))?,
            ))
            .await?;

        Ok(decision)
    }

    async fn run_analyst_layer(&self, symbol: &str) -> PipelineResult<StageResult> {
        let (fundamentals, history, indicators, sentiment, news, macros, events) = tokio::join!(
            self.tools.fetch("fundamentals", symbol),
            self.tools.fetch("price_history", symbol),
            self.tools.fetch("technical_indicators", symbol),
            self.tools.fetch("social_sentiment", symbol),
            self.tools.fetch("news", symbol),
            self.tools.fetch("macro_indicators", symbol),
            self.tools.fetch("event_impact", symbol),
        );

        self.emitter
            .emit(Event::status("Market data loaded, analysis session initialized"))
            .await?;
        self.emitter
            .emit(Event::layer_start(1, "Analyst team reviewing market data"))
            .await?;

        self.stages
            .run_stage(
                1,
                StageMode::Concurrent,
                vec![
                    TaskSpec::new(
                        AgentRole::FundamentalsAnalyst,
                        format!(
                            "Stock: {symbol}\n\nFundamentals:\n{fundamentals}\n\n\
                             Price history:\n{history}"
                        ),
                    ),
                    TaskSpec::new(
                        AgentRole::SentimentAnalyst,
                        format!("Stock: {symbol}\n\nSocial sentiment:\n{sentiment}"),
                    ),
                    TaskSpec::new(
                        AgentRole::NewsAnalyst,
                        format!(
                            "Stock: {symbol}\n\nNews:\n{news}\n\n\
                             Macro indicators:\n{macros}\n\nEvent impact:\n{events}"
                        ),
                    ),
                    TaskSpec::new(
                        AgentRole::TechnicalAnalyst,
                        format!(
                            "Stock: {symbol}\n\nTechnical indicators:\n{indicators}\n\n\
                             Price history:\n{history}"
                        ),
                    ),
                ],
            )
            .await
    }

    async fn run_researcher_layer(
        &self,
        symbol: &str,
        analysts: &StageResult,
    ) -> PipelineResult<(StageResult, DebateOutcome)> {
        self.emitter
            .emit(Event::layer_start(2, "Researchers weighing the evidence"))
            .await?;

        let reports = analyst_reports(analysts);
        let researchers = self
            .stages
            .run_stage(
                2,
                StageMode::Concurrent,
                vec![
                    TaskSpec::new(
                        AgentRole::BullishResearcher,
                        format!("Stock: {symbol}\n\nAnalyst reports:\n{reports}"),
                    ),
                    TaskSpec::new(
                        AgentRole::BearishResearcher,
                        format!("Stock: {symbol}\n\nAnalyst reports:\n{reports}"),
                    ),
                ],
            )
            .await?;

        let bull = researchers
            .task(AgentRole::BullishResearcher)
            .ok_or_else(|| PipelineError::internal("bullish researcher missing from stage"))?;
        let bear = researchers
            .task(AgentRole::BearishResearcher)
            .ok_or_else(|| PipelineError::internal("bearish researcher missing from stage"))?;

        let debate = self.debate.run(symbol, bull, bear).await?;
        Ok((researchers, debate))
    }

    async fn run_trader_layer(
        &self,
        symbol: &str,
        analysts: &StageResult,
        researchers: &StageResult,
        debate: &DebateOutcome,
    ) -> PipelineResult<StageResult> {
        self.emitter
            .emit(Event::layer_start(3, "Trader drafting the plan"))
            .await?;

        let mut context = format!("Stock: {symbol}\n\nAnalyst conclusions:\n");
        for task in &analysts.tasks {
            context.push_str(&format!(
                "[{}] {}\n",
                task.role.as_str(),
                truncate_chars(&task.output, TRADER_REPORT_CHARS)
            ));
        }
        for task in &researchers.tasks {
            let conviction = task
                .rating
                .map(|r| format!(" (conviction {r}/10)"))
                .unwrap_or_default();
            context.push_str(&format!(
                "\n{} position{conviction}:\n{}\n",
                task.role.as_str(),
                task.output
            ));
        }
        if debate.triggered {
            context.push_str(&format!("\nDebate transcript:\n{}\n", debate.transcript()));
        }

        self.stages
            .run_stage(
                3,
                StageMode::Sequential,
                vec![TaskSpec::new(AgentRole::Trader, context)],
            )
            .await
    }

    async fn run_risk_layer(
        &self,
        symbol: &str,
        state: &PipelineState,
    ) -> PipelineResult<FinalDecision> {
        self.emitter
            .emit(Event::layer_start(4, "Risk team reviewing the plan"))
            .await?;

        let plan = state
            .trader
            .task(AgentRole::Trader)
            .ok_or_else(|| PipelineError::internal("trader missing from stage"))?;
        let plan_call = extract::extract_recommendation(&plan.output);
        let plan_size = extract::extract_position(&plan.output);
        let risk_context = format!(
            "Stock: {symbol}\n\nTrader call: {} ({} position)\n\nTrade plan:\n{}",
            plan_call.as_str(),
            plan_size.as_str(),
            plan.output
        );

        let risks = self
            .stages
            .run_stage(
                4,
                StageMode::Concurrent,
                vec![
                    TaskSpec::new(AgentRole::RiskManagerAggressive, risk_context.clone()),
                    TaskSpec::new(AgentRole::RiskManagerNeutral, risk_context.clone()),
                    TaskSpec::new(AgentRole::RiskManagerConservative, risk_context),
                ],
            )
            .await?;

        self.emitter
            .emit(Event::risk_assessment(json!({
                "aggressive": risks.task(AgentRole::RiskManagerAggressive).map(|t| &t.output),
                "neutral": risks.task(AgentRole::RiskManagerNeutral).map(|t| &t.output),
                "conservative": risks.task(AgentRole::RiskManagerConservative).map(|t| &t.output),
            })))
            .await?;

        let fundamentals = state
            .analysts
            .rating_of(AgentRole::FundamentalsAnalyst)
            .unwrap_or(NEUTRAL_RATING);
        let technical = state
            .analysts
            .rating_of(AgentRole::TechnicalAnalyst)
            .unwrap_or(NEUTRAL_RATING);
        let bullish = state
            .researchers
            .rating_of(AgentRole::BullishResearcher)
            .unwrap_or(NEUTRAL_RATING);
        let bearish = state
            .researchers
            .rating_of(AgentRole::BearishResearcher)
            .unwrap_or(NEUTRAL_RATING);

        // The synthesis task sees every layer: scores from 1 and 2, the
        // debate outcome, the plan from 3, and the risk reviews from 4.
        let debate_line = if state.debate.triggered {
            format!(
                "debate ran {} round(s), conviction gap {:.1}",
                state.debate.rounds.len(),
                state.debate.score_delta
            )
        } else {
            format!(
                "no debate, conviction gap {:.1} below threshold",
                state.debate.score_delta
            )
        };
        let mut pm_context = format!(
            "Stock: {symbol}\n\n\
             Analyst scores:\nfundamentals: {fundamentals}/10\ntechnical: {technical}/10\n\n\
             Researcher conviction:\nbullish: {bullish}/10\nbearish: {bearish}/10\n{debate_line}\n\n\
             Trade plan:\n{}\n\nRisk assessments:\n",
            plan.output
        );
        for task in &risks.tasks {
            pm_context.push_str(&format!("[{}] {}\n", task.role.as_str(), task.output));
        }

        let synthesis = self
            .stages
            .run_stage(
                4,
                StageMode::Sequential,
                vec![TaskSpec::new(AgentRole::PortfolioManager, pm_context)],
            )
            .await?;
        let verdict = synthesis
            .task(AgentRole::PortfolioManager)
            .ok_or_else(|| PipelineError::internal("portfolio manager missing from stage"))?;

        Ok(FinalDecision {
            symbol: symbol.to_string(),
            recommendation: extract::extract_recommendation(&verdict.output),
            confidence: extract::extract_confidence(&verdict.output),
            position: extract::extract_position(&verdict.output),
            position_suggestions: extract::extract_position_suggestions(&verdict.output),
            scores: SupportingScores {
                fundamentals,
                technical,
                bullish,
                bearish,
                score_diff: (bullish - bearish).abs(),
            },
            debate: DebateSummary {
                triggered: state.debate.triggered,
                rounds: state.debate.rounds.len() as u32,
            },
            summary: verdict.output.clone(),
        })
    }
}

fn analyst_reports(analysts: &StageResult) -> String {
    analysts
        .tasks
        .iter()
        .map(|t| format!("[{}]\n{}", t.role.as_str(), t.output))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Character-boundary-safe truncation with an ellipsis marker
fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let mut truncated: String = text.chars().take(limit).collect();
        truncated.push_str("...");
        truncated
    }
}
