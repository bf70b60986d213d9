//! Test Engineer Portal
//!
//! Reads configuration from a TOML file (default
//! `~/.config/test-portal/config.toml`) and serves the REST API.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use test_portal::{default_config_path, init_tracing, AppConfig, ServerHandle, ServerOptions};

#[derive(Debug, Parser)]
#[command(name = "test-portal", version, about = "Test Engineer Portal API server")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, env = "PORTAL_CONFIG")]
    config: Option<PathBuf>,

    /// Override `logging.level`
    #[arg(long)]
    log_level: Option<String>,

    /// Override `server.api_port`
    #[arg(long)]
    api_port: Option<u16>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let mut config = AppConfig::load(&config_path)?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(port) = cli.api_port {
        config.server.api_port = port;
    }
    config.validate()?;

    if cli.check {
        println!("{}: OK", config_path.display());
        return Ok(());
    }

    init_tracing(&config.logging);
    info!("Configuration loaded from {}", config_path.display());

    let handle = ServerHandle::start(ServerOptions {
        config,
        ..ServerOptions::default()
    })
    .await?;
    handle.install_signal_handler();
    info!("Press Ctrl+C to shut down gracefully");
    handle.wait().await;

    Ok(())
}
