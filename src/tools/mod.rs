//! Data-provider tool system
//!
//! Each market-data query is a named capability behind the [`DataTool`]
//! trait, registered by name in a [`ToolRegistry`]. Tool failures never
//! cross the registry boundary as errors: [`ToolRegistry::fetch`] converts
//! them into an explicit "unavailable" text that flows into task context.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

pub mod market;

pub use market::{HttpMarketDataSource, MarketDataSource};

/// A named data-retrieval capability
#[async_trait]
pub trait DataTool: Send + Sync {
    /// Registry name for this tool
    fn name(&self) -> &'static str;

    /// Fetch and format data for a symbol
    async fn execute(&self, symbol: &str) -> Result<String, ToolError>;
}

/// Tool system errors
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Data unavailable: {0}")]
    Unavailable(String),
    #[error("Request failed: {0}")]
    RequestFailed(String),
}

/// Registry mapping tool names to implementations
pub struct ToolRegistry {
    tools: HashMap<&'static str, Arc<dyn DataTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Build a registry with the full built-in tool set over one source
    pub fn with_builtin(source: Arc<dyn MarketDataSource>) -> Self {
        let mut registry = Self::new();
        for tool in market::builtin_tools(source) {
            registry.register(tool);
        }
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn DataTool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn list_tools(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.tools.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Execute a tool, converting every failure into usable text.
    ///
    /// Callers can always interpolate the result into a prompt; a data fault
    /// becomes an explanatory line rather than a pipeline error.
    pub async fn fetch(&self, name: &str, symbol: &str) -> String {
        let tool = match self.tools.get(name) {
            Some(tool) => tool,
            None => {
                warn!(tool = name, "Requested tool is not registered");
                return format!("{name} data unavailable: no such data source");
            }
        };

        match tool.execute(symbol).await {
            Ok(text) => text,
            Err(e) => {
                warn!(tool = name, symbol, error = %e, "Tool execution failed");
                format!("{name} data unavailable: {e}")
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
