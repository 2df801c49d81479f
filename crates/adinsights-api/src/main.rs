use adinsights_api::{AppState, Server};
use adinsights_core::{ConfigManager, LoggingConfig};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "adinsights")]
#[command(about = "Advertising insights reports as JSON and CSV", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./.adinsights.toml, then ~/.adinsights/config.toml)
    #[arg(short, long, env = "ADINSIGHTS_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overrides the config file
    #[arg(short, long)]
    port: Option<u16>,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format.as_str() {
        "compact" => registry.with(tracing_subscriber::fmt::layer().compact()).init(),
        _ => registry.with(tracing_subscriber::fmt::layer().pretty()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut manager =
        ConfigManager::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = cli.host {
        manager.config_mut().server.host = host;
    }
    if let Some(port) = cli.port {
        manager.config_mut().server.port = port;
    }

    let config = manager.config();
    init_tracing(&config.logging);
    for warning in manager.warnings() {
        warn!("{}", warning);
    }

    match manager.config_path() {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("No config file found, using defaults"),
    }
    info!("Upstream API: {}", config.upstream.base_url);

    let state = AppState::new(config).context("Failed to build application state")?;
    Server::new(state, config.server.host.clone(), config.server.port)
        .run()
        .await
        .context("Server error")
}
