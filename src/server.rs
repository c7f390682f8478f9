//! HTTP surface
//!
//! One streaming analysis endpoint and a health probe. A run's events are
//! written as NDJSON, one event per line, flushed as the pipeline produces
//! them. The pipeline runs in its own task; dropping the response body
//! closes the event channel, which the orchestrator observes as a
//! disconnect and stops scheduling work.

use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::events::{Event, EventEmitter};
use crate::llm::{LlmProvider, OpenAiCompatibleProvider, OpenAiConfig};
use crate::pipeline::{PipelineOrchestrator, TaskRunner};
use crate::tools::ToolRegistry;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};
use warp::http::Response;
use warp::hyper::Body;
use warp::Filter;

/// Analysis request body with optional per-request overrides
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub symbol: String,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub debate_threshold: Option<f64>,
    pub max_rounds: Option<u32>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// Shared per-server state handed to every request
#[derive(Clone)]
pub struct ServerContext {
    pub config: AppConfig,
    pub tools: Arc<ToolRegistry>,
}

/// Build the full route tree
pub fn routes(
    context: ServerContext,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let analyze_context = context.clone();
    let analyze = warp::path!("api" / "analyze")
        .and(warp::post())
        .and(warp::body::json())
        .and(warp::any().map(move || analyze_context.clone()))
        .and_then(handle_analyze);

    let health = warp::path!("api" / "health")
        .and(warp::get())
        .map(|| {
            warp::reply::json(&HealthResponse {
                status: "ok",
                service: env!("CARGO_PKG_NAME"),
                version: env!("CARGO_PKG_VERSION"),
            })
        });

    analyze.or(health)
}

async fn handle_analyze(
    request: AnalyzeRequest,
    context: ServerContext,
) -> Result<Response<Body>, Infallible> {
    let symbol = request.symbol.trim().to_string();
    if symbol.is_empty() {
        let body = serde_json::json!({"error": "symbol must not be empty"}).to_string();
        return Ok(Response::builder()
            .status(warp::http::StatusCode::BAD_REQUEST)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .expect("static response"));
    }

    let request_id = uuid::Uuid::new_v4();
    info!(symbol = %symbol, %request_id, "Analysis requested");
    let (emitter, receiver) = EventEmitter::channel(64);

    match build_orchestrator(&request, &context, emitter.clone()) {
        Ok(orchestrator) => {
            tokio::spawn(async move {
                orchestrator.execute(&symbol).await;
                info!(%request_id, "Request stream closed");
            });
        }
        Err(e) => {
            // The stream still opens; it carries exactly one error event.
            warn!(symbol = %symbol, %request_id, error = %e, "Analysis rejected before start");
            tokio::spawn(async move {
                let _ = emitter.emit(Event::error(e.to_string())).await;
            });
        }
    }

    let mut failed = false;
    let lines = ReceiverStream::new(receiver)
        .map(move |event| encode_event(&event, &mut failed))
        .take_while(|line| line.is_some())
        .map(|line| Ok::<_, Infallible>(line.unwrap_or_default()));

    Ok(Response::builder()
        .status(warp::http::StatusCode::OK)
        .header("content-type", "application/x-ndjson")
        .body(Body::wrap_stream(lines))
        .expect("static response"))
}

/// Encode one event as an NDJSON line.
///
/// A serialization fault produces one terminal `error` line and latches
/// `failed`; every later event encodes to `None`, which ends the stream,
/// so nothing follows an `error` line on the wire.
fn encode_event(event: &Event, failed: &mut bool) -> Option<String> {
    if *failed {
        return None;
    }
    match serde_json::to_string(event) {
        Ok(mut line) => {
            line.push('\n');
            Some(line)
        }
        Err(e) => {
            warn!(error = %e, "Event serialization failed, ending stream");
            *failed = true;
            let fallback = serde_json::json!({
                "type": "error",
                "message": format!("serialization failed: {e}"),
            });
            Some(format!("{fallback}\n"))
        }
    }
}

/// Assemble the per-request pipeline from config plus request overrides
fn build_orchestrator(
    request: &AnalyzeRequest,
    context: &ServerContext,
    emitter: EventEmitter,
) -> Result<PipelineOrchestrator, PipelineError> {
    let config = &context.config;

    let api_key = match &request.api_key {
        Some(key) => key.clone(),
        None => config.resolve_api_key()?,
    };
    let base_url = request
        .base_url
        .clone()
        .unwrap_or_else(|| config.llm.base_url.clone());
    let model = request
        .model
        .clone()
        .unwrap_or_else(|| config.llm.model.clone());
    let threshold = request
        .debate_threshold
        .unwrap_or(config.pipeline.debate_threshold);
    let max_rounds = request
        .max_rounds
        .unwrap_or(config.pipeline.max_debate_rounds);

    let timeout = Duration::from_secs(config.llm.task_timeout_secs);
    let provider: Arc<dyn LlmProvider> = Arc::new(
        OpenAiCompatibleProvider::new(OpenAiConfig {
            api_key,
            base_url,
            timeout,
        })
        .map_err(|e| PipelineError::BackendNotConfigured(e.to_string()))?,
    );

    let runner = Arc::new(TaskRunner::new(
        provider,
        model,
        config.llm.temperature,
        config.llm.max_tokens,
        timeout,
    ));

    Ok(PipelineOrchestrator::new(
        runner,
        context.tools.clone(),
        emitter,
        threshold,
        max_rounds,
    ))
}

/// Serve the API until the shutdown signal resolves
pub async fn serve(
    context: ServerContext,
    addr: std::net::SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) {
    let (bound, server) = warp::serve(routes(context)).bind_with_graceful_shutdown(addr, shutdown);
    info!(addr = %bound, "Server listening");
    server.await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticMarketDataSource;

    fn test_context() -> ServerContext {
        let mut config = AppConfig::default();
        config.llm.api_key_env = "TRADECOUNCIL_TEST_KEY_THAT_IS_UNSET".to_string();
        ServerContext {
            config,
            tools: Arc::new(ToolRegistry::with_builtin(Arc::new(StaticMarketDataSource))),
        }
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let routes = routes(test_context());
        let response = warp::test::request()
            .method("GET")
            .path("/api/health")
            .reply(&routes)
            .await;

        assert_eq!(response.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_empty_symbol_is_bad_request() {
        let routes = routes(test_context());
        let response = warp::test::request()
            .method("POST")
            .path("/api/analyze")
            .json(&serde_json::json!({"symbol": "  "}))
            .reply(&routes)
            .await;

        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_missing_api_key_yields_single_error_event() {
        let routes = routes(test_context());
        let response = warp::test::request()
            .method("POST")
            .path("/api/analyze")
            .json(&serde_json::json!({"symbol": "600519"}))
            .reply(&routes)
            .await;

        assert_eq!(response.status(), 200);
        let body = String::from_utf8(response.body().to_vec()).unwrap();
        let lines: Vec<_> = body.lines().collect();
        assert_eq!(lines.len(), 1);

        let event: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(event["type"], "error");
        assert!(event["message"]
            .as_str()
            .unwrap()
            .contains("TRADECOUNCIL_TEST_KEY_THAT_IS_UNSET"));
    }

    #[test]
    fn test_encoding_stops_once_a_fault_is_latched() {
        let mut failed = false;
        let line = encode_event(&Event::status("working"), &mut failed).unwrap();
        assert!(line.ends_with('\n'));
        assert!(serde_json::from_str::<serde_json::Value>(line.trim()).is_ok());
        assert!(!failed);

        // After a fault nothing more may reach the wire.
        failed = true;
        assert!(encode_event(&Event::status("late"), &mut failed).is_none());
        assert!(encode_event(&Event::error("later"), &mut failed).is_none());
    }

    #[tokio::test]
    async fn test_request_overrides_reach_the_runner() {
        let context = test_context();
        let (emitter, _rx) = EventEmitter::channel(8);
        let request = AnalyzeRequest {
            symbol: "600519".to_string(),
            model: Some("override-model".to_string()),
            api_key: Some("override-key".to_string()),
            base_url: Some("http://127.0.0.1:1".to_string()),
            debate_threshold: Some(1.5),
            max_rounds: Some(4),
        };

        // A provided api_key must make orchestration possible even when the
        // configured env var is unset.
        assert!(build_orchestrator(&request, &context, emitter).is_ok());
    }
}
