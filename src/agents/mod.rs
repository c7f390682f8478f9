//! Agent roles and task output types
//!
//! Eleven pipeline roles across four layers plus the debate moderator. Roles
//! are data, not behavior: each maps to a system prompt and a flag saying
//! whether its output carries a rating.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod prompts;

/// Every role the pipeline can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    // Layer 1: analyst team
    FundamentalsAnalyst,
    SentimentAnalyst,
    NewsAnalyst,
    TechnicalAnalyst,
    // Layer 2: researcher team
    BullishResearcher,
    BearishResearcher,
    // Layer 3: decision
    Trader,
    // Layer 4: risk and synthesis
    RiskManagerAggressive,
    RiskManagerNeutral,
    RiskManagerConservative,
    PortfolioManager,
    // Debate sub-protocol
    DebateModerator,
}

impl AgentRole {
    /// Wire identifier, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::FundamentalsAnalyst => "fundamentals_analyst",
            AgentRole::SentimentAnalyst => "sentiment_analyst",
            AgentRole::NewsAnalyst => "news_analyst",
            AgentRole::TechnicalAnalyst => "technical_analyst",
            AgentRole::BullishResearcher => "bullish_researcher",
            AgentRole::BearishResearcher => "bearish_researcher",
            AgentRole::Trader => "trader",
            AgentRole::RiskManagerAggressive => "risk_manager_aggressive",
            AgentRole::RiskManagerNeutral => "risk_manager_neutral",
            AgentRole::RiskManagerConservative => "risk_manager_conservative",
            AgentRole::PortfolioManager => "portfolio_manager",
            AgentRole::DebateModerator => "debate_moderator",
        }
    }

    /// Whether this role's output carries a normalized rating.
    ///
    /// Fundamentals and technical analysts score their dimension; the two
    /// researchers score conviction, which feeds the debate trigger.
    pub fn requires_rating(&self) -> bool {
        matches!(
            self,
            AgentRole::FundamentalsAnalyst
                | AgentRole::TechnicalAnalyst
                | AgentRole::BullishResearcher
                | AgentRole::BearishResearcher
        )
    }

    /// System prompt sent to the reasoning backend for this role
    pub fn system_prompt(&self) -> &'static str {
        prompts::system_prompt(*self)
    }

    /// Short progress notice shown on the event stream while this role runs
    pub fn working_notice(&self) -> &'static str {
        match self {
            AgentRole::FundamentalsAnalyst => "Fundamentals analyst assessing financial health",
            AgentRole::SentimentAnalyst => "Sentiment analyst tracking market mood",
            AgentRole::NewsAnalyst => "News analyst reviewing headlines and macro data",
            AgentRole::TechnicalAnalyst => "Technical analyst reading indicators",
            AgentRole::BullishResearcher => "Bullish researcher building the long case",
            AgentRole::BearishResearcher => "Bearish researcher building the short case",
            AgentRole::Trader => "Trader drafting the trade plan",
            AgentRole::RiskManagerAggressive => "Aggressive risk manager evaluating the plan",
            AgentRole::RiskManagerNeutral => "Neutral risk manager evaluating the plan",
            AgentRole::RiskManagerConservative => "Conservative risk manager evaluating the plan",
            AgentRole::PortfolioManager => "Portfolio manager making the final call",
            AgentRole::DebateModerator => "Moderator framing the core disagreement",
        }
    }
}

/// Output of one reasoning task
///
/// Immutable once produced; owned by the stage result that contains it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    pub role: AgentRole,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl AgentTask {
    pub fn new(role: AgentRole, output: String, rating: Option<f64>) -> Self {
        Self {
            role,
            output,
            rating,
            timestamp: Utc::now(),
        }
    }
}
