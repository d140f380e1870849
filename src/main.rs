use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamrelay::{
    cache::StreamCache, config::Config, plugins::PluginRegistry, web::WebServer,
};

#[derive(Parser)]
#[command(name = "streamrelay")]
#[command(version)]
#[command(about = "A local HTTP relay that resolves media URLs into playable streams")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with specified level
    let log_filter = if cli.log_level == "trace" {
        format!("streamrelay={},tower_http=trace", cli.log_level)
    } else {
        format!("streamrelay={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting streamrelay v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;

    // Override config with CLI arguments
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }

    let registry = Arc::new(PluginRegistry::with_builtins());
    info!("Plugin registry loaded with {} plugins", registry.len());

    let cache = Arc::new(StreamCache::open(&config.cache.path));
    info!("Session cache at {}", config.cache.path.display());

    let web_server = WebServer::new(config, registry, cache)?;
    info!(
        "Starting relay server on {}:{}",
        web_server.host(),
        web_server.port()
    );
    web_server.serve().await?;

    Ok(())
}
