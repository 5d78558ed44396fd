//! ChatRelay - Real-Time Chat Relay Server
//!
//! Accounts over HTTP, chat over WebSockets: every message a connected
//! session sends is relayed to every other connected session.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatrelay::{
    api::{AppState, ChatServer},
    auth::AuthManager,
    config::ConfigManager,
    ShutdownCoordinator,
};

/// CLI arguments for ChatRelay
#[derive(Parser, Debug)]
#[command(name = "chatrelay")]
#[command(about = "ChatRelay - Real-time chat relay server")]
#[command(version)]
#[command(long_about = "
ChatRelay - Real-time chat relay server

Accounts over HTTP, chat over WebSockets. Every message a connected
session sends is relayed to every other connected session.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  CHATRELAY_BIND_ADDR         - Bind address (e.g., 127.0.0.1:8080)
  CHATRELAY_MAX_SESSIONS      - Maximum concurrent sessions
  CHATRELAY_SEND_TIMEOUT      - Broadcast send timeout (e.g., 10s)
  CHATRELAY_OPEN_REGISTRATION - Allow account creation (true/false)
  CHATRELAY_LOG_LEVEL         - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "config.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Bind address (overrides config file)
    #[arg(short, long, help = "Bind address (e.g., 127.0.0.1:8080)")]
    pub bind: Option<String>,

    /// Port to bind to (overrides config file)
    #[arg(short, long, help = "Port to bind to")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", help = "Log level")]
    pub log_level: String,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Maximum number of concurrent sessions
    #[arg(long, help = "Maximum number of concurrent sessions")]
    pub max_sessions: Option<usize>,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    init_tracing(&args)?;

    info!("Starting ChatRelay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration with priority: CLI args > config file > environment > defaults
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        info!("Config file not found, checking environment variables");
        ConfigManager::load_from_env()?
    };

    config.merge_with_cli_args(args.bind.as_deref(), args.port, args.max_sessions);

    config
        .validate()
        .context("Final configuration validation failed")?;

    if args.validate_config {
        info!("Configuration is valid");
        info!("Configuration summary:");
        info!("  Bind address: {}", config.server.bind_addr);
        info!("  Max sessions: {}", config.server.max_sessions);
        info!("  Send timeout: {:?}", config.server.send_timeout);
        info!(
            "  Registration: {}",
            if config.auth.open_registration {
                "open"
            } else {
                "closed"
            }
        );
        info!("  Preseeded accounts: {}", config.auth.users.len());
        return Ok(());
    }

    info!("Configuration loaded successfully");
    info!("Bind address: {}", config.server.bind_addr);
    info!("Max sessions: {}", config.server.max_sessions);

    let shutdown_coordinator = ShutdownCoordinator::new(config.server.shutdown_timeout);

    let state = AppState::with_shutdown(config.clone(), shutdown_coordinator.sender());
    let registry = state.registry.clone();

    start_cleanup_task(state.auth.clone());

    let server = ChatServer::new(config.server.bind_addr, state);
    let mut server_shutdown_rx = shutdown_coordinator.subscribe();
    let server_handle = tokio::spawn(async move {
        let shutdown = async move {
            let _ = server_shutdown_rx.recv().await;
        };
        if let Err(e) = server.start_with_shutdown(shutdown).await {
            error!("Server error: {}", e);
        }
    });

    info!("ChatRelay started, press Ctrl+C or send SIGTERM/SIGINT to shut down");

    // Blocks until a signal arrives, then broadcasts the shutdown.
    if let Err(e) = shutdown_coordinator.listen_for_signals().await {
        error!("Error setting up signal handlers: {}", e);
    }

    info!("Initiating graceful shutdown...");

    shutdown_coordinator.drain_sessions(&registry).await?;

    if let Err(e) = server_handle.await {
        if !e.is_cancelled() {
            error!("Server task failed: {}", e);
        }
    }

    info!("Server shutdown complete");

    Ok(())
}

/// Start background cleanup of stale login rate-limit entries
fn start_cleanup_task(auth: Arc<AuthManager>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            debug!("Running periodic cleanup of login rate limits");
            auth.cleanup_expired();
        }
    });
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        &args.log_level
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
