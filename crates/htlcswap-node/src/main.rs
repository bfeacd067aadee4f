//! htlcswap node: entry point.
//!
//! Starts the swap coordination API with configuration from a TOML file or defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use htlcswap_core::SystemClock;
use htlcswap_node::api::start_api_server;
use htlcswap_node::config::SwapNodeConfig;
use htlcswap_node::state::AppState;
use tracing_subscriber::EnvFilter;

/// htlcswap coordination node
#[derive(Parser, Debug)]
#[command(name = "htlcswap-node", version, about = "HTLC atomic swap coordination node")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "htlcswap.toml")]
    config: PathBuf,

    /// Override the API listen address.
    #[arg(long)]
    listen_addr: Option<String>,

    /// Override the API port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Override the log format (text, json).
    #[arg(long)]
    log_format: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        let config = SwapNodeConfig::default();
        config.save(&args.config)?;
        init_tracing(&config.logging.level, &config.logging.format);
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    // Load configuration and apply CLI overrides
    let mut config = SwapNodeConfig::load(&args.config)?;
    if let Some(listen_addr) = args.listen_addr {
        config.api.listen_addr = listen_addr;
    }
    if let Some(api_port) = args.api_port {
        config.api.port = api_port;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }
    config.validate()?;

    init_tracing(&config.logging.level, &config.logging.format);
    tracing::info!("htlcswap node v{}", env!("CARGO_PKG_VERSION"));

    let state = Arc::new(AppState::from_config(&config, Arc::new(SystemClock))?);
    for ledger in &config.ledgers {
        tracing::info!(
            ledger_id = %ledger.id,
            assets = ledger.balances.len(),
            latency_ms = ledger.latency_ms,
            "memory ledger ready"
        );
    }

    let listen_addr: SocketAddr = config.api_socket().parse()?;

    // Set up graceful shutdown on SIGINT
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("received shutdown signal");
    };

    tokio::select! {
        result = start_api_server(listen_addr, state) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "API server error");
                return Err(e);
            }
        }
        _ = shutdown => {
            tracing::info!("initiating graceful shutdown");
        }
    }

    tracing::info!("htlcswap node exited cleanly");
    Ok(())
}
