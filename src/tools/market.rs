//! Built-in market-data tools
//!
//! Seven query capabilities over one [`MarketDataSource`]. The HTTP source
//! owns the retry policy: history is the primary query and gets up to three
//! attempts with doubling backoff, news gets a single retry, everything else
//! one attempt.

use super::{DataTool, ToolError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Upstream source of raw market data
///
/// Every method returns formatted text ready for prompt interpolation.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn price_history(&self, symbol: &str) -> Result<String, ToolError>;
    async fn news(&self, symbol: &str) -> Result<String, ToolError>;
    async fn technical_indicators(&self, symbol: &str) -> Result<String, ToolError>;
    async fn social_sentiment(&self, symbol: &str) -> Result<String, ToolError>;
    async fn macro_indicators(&self) -> Result<String, ToolError>;
    async fn fundamentals(&self, symbol: &str) -> Result<String, ToolError>;
    async fn event_impact(&self, symbol: &str) -> Result<String, ToolError>;
}

/// HTTP-backed market data source
pub struct HttpMarketDataSource {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TextPayload {
    text: String,
}

impl HttpMarketDataSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ToolError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ToolError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetch one endpoint with a bounded retry budget.
    ///
    /// `attempts` counts total tries; the delay before each retry doubles,
    /// starting from `initial_backoff`.
    async fn get_text(
        &self,
        endpoint: &str,
        attempts: u32,
        initial_backoff: Duration,
    ) -> Result<String, ToolError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let mut backoff = initial_backoff;
        let mut last_error = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                debug!(url = %url, attempt, "Retrying data fetch after backoff");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.try_get(&url).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(url = %url, attempt, error = %e, "Data fetch attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ToolError::RequestFailed("no attempts were made".to_string())))
    }

    async fn try_get(&self, url: &str) -> Result<String, ToolError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ToolError::Unavailable(format!(
                "upstream returned {}",
                response.status()
            )));
        }

        let payload: TextPayload = response
            .json()
            .await
            .map_err(|e| ToolError::Unavailable(format!("malformed payload: {e}")))?;

        if payload.text.trim().is_empty() {
            return Err(ToolError::Unavailable("empty payload".to_string()));
        }
        Ok(payload.text)
    }
}

const HISTORY_ATTEMPTS: u32 = 3;
const NEWS_ATTEMPTS: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

#[async_trait]
impl MarketDataSource for HttpMarketDataSource {
    async fn price_history(&self, symbol: &str) -> Result<String, ToolError> {
        self.get_text(&format!("history/{symbol}"), HISTORY_ATTEMPTS, RETRY_BACKOFF)
            .await
    }

    async fn news(&self, symbol: &str) -> Result<String, ToolError> {
        self.get_text(&format!("news/{symbol}"), NEWS_ATTEMPTS, RETRY_BACKOFF)
            .await
    }

    async fn technical_indicators(&self, symbol: &str) -> Result<String, ToolError> {
        self.get_text(&format!("indicators/{symbol}"), 1, RETRY_BACKOFF)
            .await
    }

    async fn social_sentiment(&self, symbol: &str) -> Result<String, ToolError> {
        self.get_text(&format!("sentiment/{symbol}"), 1, RETRY_BACKOFF)
            .await
    }

    async fn macro_indicators(&self) -> Result<String, ToolError> {
        self.get_text("macro", 1, RETRY_BACKOFF).await
    }

    async fn fundamentals(&self, symbol: &str) -> Result<String, ToolError> {
        self.get_text(&format!("fundamentals/{symbol}"), 1, RETRY_BACKOFF)
            .await
    }

    async fn event_impact(&self, symbol: &str) -> Result<String, ToolError> {
        self.get_text(&format!("events/{symbol}"), 1, RETRY_BACKOFF)
            .await
    }
}

macro_rules! source_tool {
    ($tool:ident, $name:literal, |$source:ident, $symbol:ident| $body:expr) => {
        pub struct $tool {
            source: Arc<dyn MarketDataSource>,
        }

        impl $tool {
            pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
                Self { source }
            }
        }

        #[async_trait]
        impl DataTool for $tool {
            fn name(&self) -> &'static str {
                $name
            }

            async fn execute(&self, $symbol: &str) -> Result<String, ToolError> {
                let $source = &self.source;
                $body
            }
        }
    };
}

source_tool!(PriceHistoryTool, "price_history", |source, symbol| source
    .price_history(symbol)
    .await);
source_tool!(NewsTool, "news", |source, symbol| source.news(symbol).await);
source_tool!(
    TechnicalIndicatorsTool,
    "technical_indicators",
    |source, symbol| source.technical_indicators(symbol).await
);
source_tool!(SocialSentimentTool, "social_sentiment", |source, symbol| {
    source.social_sentiment(symbol).await
});
source_tool!(MacroIndicatorsTool, "macro_indicators", |source, _symbol| {
    source.macro_indicators().await
});
source_tool!(FundamentalsTool, "fundamentals", |source, symbol| source
    .fundamentals(symbol)
    .await);
source_tool!(EventImpactTool, "event_impact", |source, symbol| source
    .event_impact(symbol)
    .await);

/// The full built-in tool set over one shared source
pub fn builtin_tools(source: Arc<dyn MarketDataSource>) -> Vec<Arc<dyn DataTool>> {
    vec![
        Arc::new(PriceHistoryTool::new(source.clone())),
        Arc::new(NewsTool::new(source.clone())),
        Arc::new(TechnicalIndicatorsTool::new(source.clone())),
        Arc::new(SocialSentimentTool::new(source.clone())),
        Arc::new(MacroIndicatorsTool::new(source.clone())),
        Arc::new(FundamentalsTool::new(source.clone())),
        Arc::new(EventImpactTool::new(source)),
    ]
}
