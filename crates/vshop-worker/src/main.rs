//! Video processing worker binary.
//!
//! Rebuilds the job registry from the uploads directory and processes every
//! video whose results are missing, one after the other. Videos claimed by
//! a running API server are left to it.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vshop_worker::{build_processor, Capabilities, JobRegistry, WorkerConfig};

fn init_tracing() -> anyhow::Result<()> {
    // Colored output for dev, JSON for production
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
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    info!("Starting vshop-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let registry = Arc::new(JobRegistry::new(&config.uploads_dir));
    registry
        .load_existing()
        .await
        .context("Failed to scan uploads directory")?;

    let pending = registry.pending().await;
    if pending.is_empty() {
        info!("No videos waiting for processing");
        return Ok(());
    }

    let capabilities = Capabilities::from_env()
        .await
        .context("Failed to build inference clients")?;
    let processor = build_processor(&config, capabilities, Arc::clone(&registry));

    let total = pending.len();
    let mut failed = 0;
    let mut skipped = 0;
    for id in pending {
        tokio::select! {
            result = processor.process_video(&id) => match result {
                Ok(_) => {}
                Err(e) if e.is_already_claimed() => skipped += 1,
                Err(e) => {
                    error!(video_id = %id, error = %e, "Video processing failed");
                    failed += 1;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                warn!(video_id = %id, "Received shutdown signal, stopping");
                break;
            }
        }
    }

    info!(total, failed, skipped, "Worker shutdown complete");
    Ok(())
}
