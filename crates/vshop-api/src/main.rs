//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vshop_api::{create_router, error, metrics, ApiConfig, AppState};
use vshop_worker::{build_processor, Capabilities, JobRegistry, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("vshop=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vshop-api");

    // Load configuration
    let config = ApiConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    error::redact_internal_errors(config.is_production());
    info!(
        "API config: host={}, port={}, uploads={}",
        config.host,
        config.port,
        worker_config.uploads_dir.display()
    );

    // Jobs from earlier runs
    let registry = Arc::new(JobRegistry::new(&worker_config.uploads_dir));
    let loaded = registry
        .load_existing()
        .await
        .context("Failed to scan uploads directory")?;
    let pending = registry.pending().await;
    info!(jobs = loaded, pending = pending.len(), "Job registry ready");

    let capabilities = Capabilities::from_env()
        .await
        .context("Failed to build inference clients")?;
    let processor = Arc::new(build_processor(&worker_config, capabilities, registry));

    // Unstarted uploads resume here; ones a worker already claimed are skipped
    for id in pending {
        processor.spawn(id);
    }

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("Failed to install Prometheus recorder")?)
    } else {
        None
    };

    let state = AppState::new(config.clone(), processor);
    let app = create_router(state, metrics_handle);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
