//! `h1serve` binary: the engine with the echo dispatcher.
//!
//! # Startup
//! - Parse CLI, load and validate config (defaults when no file is given)
//! - Initialize logging, then the optional metrics endpoint
//! - Bind the listener, load TLS material if configured
//! - Serve until SIGINT/SIGTERM, then drain

use std::path::PathBuf;

use clap::Parser;

use h1serve::config::{load_config, validation::validate_config, ConfigError, ServerConfig};
use h1serve::http::{EchoDispatcher, HttpServer};
use h1serve::lifecycle::{spawn_signal_listener, Shutdown};
use h1serve::net::{tls, Listener};
use h1serve::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "h1serve")]
#[command(about = "HTTP/1.x server engine with an echo handler", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`
    #[arg(short, long)]
    bind: Option<String>,

    /// Override `observability.log_level`
    #[arg(long)]
    log_level: Option<String>,

    /// Record per host+path timings, served at /_profile
    #[arg(long)]
    profile: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    config.observability.profiling |= cli.profile;
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "h1serve starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        send_ms = config.timeouts.send_ms,
        receive_ms = config.timeouts.receive_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = Listener::bind(&config.listener).await?;
    let mut server = HttpServer::new(config.clone(), EchoDispatcher);
    if let Some(tls_config) = &config.listener.tls {
        server = server.with_tls(tls::acceptor_from_config(tls_config)?);
    }

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    spawn_signal_listener(shutdown.clone());

    server.run(listener, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
