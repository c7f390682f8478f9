//! TradeCouncil server entry point

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tradecouncil::config::AppConfig;
use tradecouncil::logging::init_default_logging;
use tradecouncil::server::{serve, ServerContext};
use tradecouncil::tools::{HttpMarketDataSource, MarketDataSource, ToolRegistry};

/// Multi-agent stock analysis server
#[derive(Parser)]
#[command(name = "tradecouncil")]
#[command(about = "Streaming multi-agent stock analysis over an OpenAI-compatible backend")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Bind address, overriding the config file
    #[arg(short, long, env = "TRADECOUNCIL_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_default_logging();

    info!("Starting tradecouncil v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            process::exit(1);
        }
    };

    let bind = cli.bind.unwrap_or_else(|| config.server.bind.clone());
    let addr: SocketAddr = match bind.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid bind address {bind:?}: {e}");
            process::exit(1);
        }
    };

    let source = match HttpMarketDataSource::new(
        config.data.base_url.clone(),
        Duration::from_secs(config.data.timeout_secs),
    ) {
        Ok(source) => Arc::new(source) as Arc<dyn MarketDataSource>,
        Err(e) => {
            error!("Failed to build market data client: {e}");
            process::exit(1);
        }
    };
    let tools = Arc::new(ToolRegistry::with_builtin(source));
    info!(tools = ?tools.list_tools(), "Data tools registered");

    let context = ServerContext { config, tools };
    serve(context, addr, shutdown_signal()).await;

    info!("Shutdown complete");
}

fn load_configuration(path: &Option<PathBuf>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            Ok(AppConfig::load_from_file(path)?)
        }
        None => {
            let default_path = PathBuf::from("tradecouncil.toml");
            if default_path.exists() {
                info!("Loading configuration from ./tradecouncil.toml");
                Ok(AppConfig::load_from_file(&default_path)?)
            } else {
                info!("No configuration file, using defaults");
                Ok(AppConfig::default())
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutdown signal received");
}
