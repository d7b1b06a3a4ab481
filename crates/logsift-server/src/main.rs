//! LogSift Server
//!
//! HTTP classification service for production log messages. Routes each
//! message through a regex / embedding / LLM cascade and serves single
//! messages and CSV batches.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};

use logsift_server::config::{CliOverrides, ServerConfig};
use logsift_server::{routes, AppState};

#[derive(Parser, Debug)]
#[command(name = "logsift-server")]
#[command(about = "LogSift classification service", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "logsift.yaml")]
    config: String,

    /// Listen address
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting LogSift Server");

    let overrides = CliOverrides {
        listen: cli.listen.clone(),
        port: cli.port,
    };
    let config = ServerConfig::load(&cli.config, &overrides)?;
    info!("Configuration loaded");
    info!("LLM model: {}", config.llm.model);
    info!("LLM-only sources: {:?}", config.llm_sources);

    let metrics_handle = init_metrics()?;

    // Model weights load here, before the listener binds.
    info!("Initializing classification cascade...");
    let state = AppState::new(&config, metrics_handle)?;
    info!("Cascade initialized");

    let addr: SocketAddr = format!("{}:{}", config.listen, config.port).parse()?;
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("logsift=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("logsift=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "logsift_requests_total",
        "Total number of HTTP requests by endpoint"
    );
    metrics::describe_counter!(
        "logsift_decisions_total",
        "Total number of cascade decisions by producer"
    );
    metrics::describe_counter!("logsift_errors_total", "Total number of errors by status");

    info!("Metrics exporter initialized");
    Ok(handle)
}
