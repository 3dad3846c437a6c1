// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Stile: access-record capture for HTTP services
//
//  Request path: axum → AccessLog interceptor → handler
//  Side path:    Dispatcher (bounded) → BrokerProducer → Kafka
//  Config:       YAML file + STILE_ env overrides
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use stile_core::StileConfig;
use stile_middleware::Options;
use stile_pipeline::{AccessPipeline, PipelineMetrics};
use stile_server::{AppState, broker_producer, build_router};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "stile", version, about = "Stile access-record pipeline demo server")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/stile/stile.yaml")]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Tracing ──
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    if cli.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Stile starting");

    // ── Config ──
    let config = if cli.config.exists() {
        info!(path = %cli.config.display(), "Loading config file");
        StileConfig::load(&cli.config)?
    } else {
        info!("No config file found, using defaults");
        StileConfig::default()
    };

    // ── Pipeline ──
    let metrics = Arc::new(PipelineMetrics::new(config.metrics.enabled)?);
    let producer = broker_producer(&config.broker, Arc::clone(&metrics));
    let pipeline = AccessPipeline::start(&config.dispatcher, producer, Arc::clone(&metrics))?;

    let options = Options::from_config(&config.server, &config.access_log)
        .with_request_logger(pipeline.request_logger());
    let app = build_router(AppState::new(options, metrics), &config.metrics);

    // ── Serve ──
    let listener = tokio::net::TcpListener::bind(&config.server.addr).await?;
    info!(
        addr = %config.server.addr,
        server_id = %config.server.id,
        broker = config.broker.enabled,
        "Stile is ready, serving traffic"
    );
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutdown signal received, draining access records");
    pipeline.stop().await;

    info!("Stile stopped");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl-C handler failed");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
