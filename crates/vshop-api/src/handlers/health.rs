//! Liveness endpoint with a job summary.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use vshop_models::JobStatus;

use crate::state::AppState;

/// Job counts by status.
#[derive(Debug, Default, Serialize)]
pub struct JobCounts {
    pub total: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub jobs: JobCounts,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut jobs = JobCounts::default();
    for job in state.registry.list().await {
        jobs.total += 1;
        match job.status {
            JobStatus::Processing => jobs.processing += 1,
            JobStatus::Completed => jobs.completed += 1,
            JobStatus::Failed => jobs.failed += 1,
        }
    }

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
        jobs,
    })
}
