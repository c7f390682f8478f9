//! End-to-end pipeline behavior over scripted backends

use std::sync::Arc;
use std::time::Duration;
use tradecouncil::events::{Event, EventEmitter, EventType};
use tradecouncil::pipeline::{FinalDecision, PipelineOrchestrator, TaskRunner};
use tradecouncil::testing::{MockLlmProvider, StaticMarketDataSource};
use tradecouncil::tools::ToolRegistry;

fn scripted_provider(bull_rating: &str, bear_rating: &str) -> MockLlmProvider {
    MockLlmProvider::new()
        .with_response("fundamentals_analyst", "Solid balance sheet. Rating: 7/10")
        .with_response("sentiment_analyst", "Retail mood is constructive.")
        .with_response("news_analyst", "Coverage is balanced, macro steady.")
        .with_response("technical_analyst", "Uptrend intact. Rating: 6/10")
        .with_response("bullish_researcher", bull_rating)
        .with_response("bearish_researcher", bear_rating)
        .with_response("debate_moderator", "Core disagreement: valuation vs momentum.")
        .with_response("trader", "Buy on strength with high confidence. Half position.")
        .with_response("risk_manager_aggressive", "Plan is acceptable, size up.")
        .with_response("risk_manager_neutral", "Plan is acceptable as stated.")
        .with_response("risk_manager_conservative", "Trim the size, keep stops tight.")
        .with_response(
            "portfolio_manager",
            "Final call: buy with high confidence. Half position.\n\
             Aggressive investors: 60-80%.\nBalanced: 30-50%.\nConservative: 10-20%.",
        )
}

async fn run_pipeline(
    provider: MockLlmProvider,
    threshold: f64,
    max_rounds: u32,
) -> (Vec<Event>, FinalDecision) {
    let runner = Arc::new(TaskRunner::new(
        Arc::new(provider),
        "test-model",
        0.7,
        None,
        Duration::from_secs(5),
    ));
    let tools = Arc::new(ToolRegistry::with_builtin(Arc::new(StaticMarketDataSource)));
    let (emitter, mut rx) = EventEmitter::channel(256);

    let orchestrator = PipelineOrchestrator::new(runner, tools, emitter, threshold, max_rounds);
    let collector = tokio::spawn(async move {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    });

    let decision = orchestrator.run("600519").await.expect("pipeline run");
    drop(orchestrator);
    let events = collector.await.expect("collector");
    (events, decision)
}

fn types_of(events: &[Event]) -> Vec<EventType> {
    events.iter().map(|e| e.event_type).collect()
}

#[tokio::test]
async fn wide_conviction_gap_triggers_full_debate() {
    let provider = scripted_provider(
        "Momentum and earnings both strong. Rating: 8/10",
        "Valuation is stretched. Rating: 3/10",
    );
    let (events, decision) = run_pipeline(provider, 3.0, 2).await;

    assert!(decision.debate.triggered);
    assert_eq!(decision.debate.rounds, 2);
    assert_eq!(decision.scores.bullish, 8.0);
    assert_eq!(decision.scores.bearish, 3.0);
    assert_eq!(decision.scores.score_diff, 5.0);

    let types = types_of(&events);
    assert_eq!(
        types
            .iter()
            .filter(|t| **t == EventType::DebateTriggered)
            .count(),
        1
    );
    // Two rounds of moderator, bull rebuttal, bear rebuttal on layer 2.
    let debate_outputs = events
        .iter()
        .filter(|e| {
            e.event_type == EventType::AgentOutput
                && e.role.as_deref() == Some("debate_moderator")
        })
        .count();
    assert_eq!(debate_outputs, 2);
}

#[tokio::test]
async fn narrow_conviction_gap_skips_debate() {
    let provider = scripted_provider(
        "Cautiously positive. Rating: 6/10",
        "Cautiously negative. Rating: 5/10",
    );
    let (events, decision) = run_pipeline(provider, 3.0, 2).await;

    assert!(!decision.debate.triggered);
    assert_eq!(decision.debate.rounds, 0);
    assert!(types_of(&events)
        .iter()
        .all(|t| *t != EventType::DebateTriggered));
}

#[tokio::test]
async fn gap_exactly_at_threshold_triggers() {
    let provider = scripted_provider("Rating: 8/10", "Rating: 5/10");
    let (_events, decision) = run_pipeline(provider, 3.0, 2).await;

    assert!(decision.debate.triggered);
    assert_eq!(decision.scores.score_diff, 3.0);
}

#[tokio::test]
async fn analyst_outputs_stream_in_declared_order_despite_delays() {
    let provider = scripted_provider("Rating: 6/10", "Rating: 6/10")
        .with_delay("fundamentals_analyst", Duration::from_millis(150));
    let (events, _decision) = run_pipeline(provider, 3.0, 2).await;

    let layer1_roles: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == EventType::AgentOutput && e.layer == Some(1))
        .map(|e| e.role.clone().unwrap())
        .collect();
    assert_eq!(
        layer1_roles,
        vec![
            "fundamentals_analyst",
            "sentiment_analyst",
            "news_analyst",
            "technical_analyst",
        ]
    );
}

#[tokio::test]
async fn sequence_numbers_are_strictly_increasing() {
    let provider = scripted_provider("Rating: 8/10", "Rating: 3/10");
    let (events, _decision) = run_pipeline(provider, 3.0, 2).await;

    for pair in events.windows(2) {
        assert!(pair[1].seq > pair[0].seq);
    }
    assert_eq!(events[0].seq, 1);
}

#[tokio::test]
async fn degraded_analyst_still_reaches_final_result() {
    let provider = scripted_provider("Rating: 6/10", "Rating: 6/10")
        .with_failure("fundamentals_analyst");
    let (events, decision) = run_pipeline(provider, 3.0, 2).await;

    // Degraded rated task falls back to the neutral midpoint.
    assert_eq!(decision.scores.fundamentals, 5.0);
    assert_eq!(events.last().unwrap().event_type, EventType::FinalResult);

    let degraded = events
        .iter()
        .find(|e| e.role.as_deref() == Some("fundamentals_analyst"))
        .unwrap();
    let output = degraded.data.as_ref().unwrap()["output"].as_str().unwrap();
    assert!(output.contains("analysis unavailable"));
}

#[tokio::test]
async fn run_ends_with_exactly_one_final_result() {
    let provider = scripted_provider("Rating: 8/10", "Rating: 3/10");
    let (events, _decision) = run_pipeline(provider, 3.0, 2).await;

    let finals: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == EventType::FinalResult)
        .collect();
    assert_eq!(finals.len(), 1);
    assert_eq!(events.last().unwrap().event_type, EventType::FinalResult);

    let data = finals[0].data.as_ref().unwrap();
    assert_eq!(data["symbol"], "600519");
    assert_eq!(data["recommendation"], "buy");
    assert_eq!(data["confidence"], "high");
    assert_eq!(data["position"], "half");
    assert_eq!(data["position_suggestions"]["aggressive"], "60-80%");
    assert_eq!(data["position_suggestions"]["conservative"], "10-20%");
    assert_eq!(data["scores"]["fundamentals"], 7.0);
    assert_eq!(data["scores"]["technical"], 6.0);
}

#[tokio::test]
async fn event_type_sequence_is_deterministic() {
    let (first, second) = futures::future::join(
        run_pipeline(scripted_provider("Rating: 8/10", "Rating: 3/10"), 3.0, 2),
        run_pipeline(scripted_provider("Rating: 8/10", "Rating: 3/10"), 3.0, 2),
    )
    .await;

    assert_eq!(types_of(&first.0), types_of(&second.0));
    assert_eq!(
        first.1.recommendation.as_str(),
        second.1.recommendation.as_str()
    );
    assert_eq!(first.1.scores.score_diff, second.1.scores.score_diff);
}

#[tokio::test]
async fn portfolio_manager_context_carries_every_earlier_layer() {
    let provider = scripted_provider(
        "Momentum and earnings both strong. Rating: 8/10",
        "Valuation is stretched. Rating: 3/10",
    );
    let requests = provider.request_log_handle();
    let (_events, _decision) = run_pipeline(provider, 3.0, 2).await;

    let recorded = requests.lock().unwrap();
    let synthesis = recorded
        .iter()
        .find(|r| r.metadata.get("role").map(String::as_str) == Some("portfolio_manager"))
        .expect("portfolio manager request");
    let context = &synthesis.messages[1].content;

    // Layer 1 and 2 scores, the debate outcome, the plan, and the risk
    // reviews all reach the synthesis prompt.
    assert!(context.contains("fundamentals: 7/10"));
    assert!(context.contains("technical: 6/10"));
    assert!(context.contains("bullish: 8/10"));
    assert!(context.contains("bearish: 3/10"));
    assert!(context.contains("debate ran 2 round(s)"));
    assert!(context.contains("Trade plan:"));
    assert!(context.contains("risk_manager_conservative"));
}

#[tokio::test]
async fn risk_assessment_event_carries_all_three_reviews() {
    let provider = scripted_provider("Rating: 6/10", "Rating: 6/10");
    let (events, _decision) = run_pipeline(provider, 3.0, 2).await;

    let risk = events
        .iter()
        .find(|e| e.event_type == EventType::RiskAssessment)
        .unwrap();
    let data = risk.data.as_ref().unwrap();
    assert!(data["aggressive"].is_string());
    assert!(data["neutral"].is_string());
    assert!(data["conservative"].is_string());
    assert_eq!(risk.layer, Some(4));
}

mod http {
    use super::*;
    use serde_json::json;
    use tradecouncil::config::AppConfig;
    use tradecouncil::server::{routes, ServerContext};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn analyze_endpoint_streams_ndjson_to_final_result() {
        let backend = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "test-model",
                "choices": [{"message": {"role": "assistant",
                    "content": "Hold for now. Rating: 5/10"}}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 10, "total_tokens": 20}
            })))
            .mount(&backend)
            .await;

        let mut config = AppConfig::default();
        config.llm.task_timeout_secs = 5;
        let context = ServerContext {
            config,
            tools: Arc::new(ToolRegistry::with_builtin(Arc::new(StaticMarketDataSource))),
        };

        let response = warp::test::request()
            .method("POST")
            .path("/api/analyze")
            .json(&json!({
                "symbol": "600519",
                "api_key": "test-key",
                "base_url": backend.uri(),
            }))
            .reply(&routes(context))
            .await;

        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers()["content-type"],
            "application/x-ndjson"
        );

        let body = String::from_utf8(response.body().to_vec()).unwrap();
        let events: Vec<serde_json::Value> = body
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert!(events.len() > 10);
        assert_eq!(events.first().unwrap()["type"], "status");
        let last = events.last().unwrap();
        assert_eq!(last["type"], "final_result");
        // Identical 5/10 ratings on both researchers: no debate.
        assert_eq!(last["data"]["debate"]["triggered"], false);
        assert_eq!(last["data"]["scores"]["score_diff"], 0.0);
    }
}
