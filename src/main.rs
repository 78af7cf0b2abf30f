//! auth-gateway
//!
//! Throttles traffic to an authentication API and hardens its responses.
//!
//! ```text
//!     Client ──▶ request id ──▶ trace ──▶ security headers ──▶ rate limiter ──▶ upstream auth API
//!                                                                   │
//!                                                                   └──▶ 429 (limit exceeded)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use auth_gateway::config::{load_config, validation::validate_config, ConfigError, GatewayConfig};
use auth_gateway::lifecycle::{wait_for_signal, Shutdown};
use auth_gateway::observability::{logging, metrics};
use auth_gateway::GatewayServer;

#[derive(Parser, Debug)]
#[command(name = "auth-gateway")]
#[command(about = "Rate-limiting gateway in front of an authentication API")]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(long)]
    bind: Option<String>,

    /// Override `upstream.url`.
    #[arg(long)]
    upstream: Option<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

fn resolve_config(args: &Args) -> Result<GatewayConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = &args.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(upstream) = &args.upstream {
        config.upstream.url = upstream.clone();
    }
    // Overrides bypass the loader's validation.
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    if args.check {
        println!("configuration OK");
        return Ok(());
    }

    logging::init(&config.observability);
    tracing::info!("auth-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        rate_limit_enabled = config.rate_limit.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config)?;
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
