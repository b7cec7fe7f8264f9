//! Pipeline and job metrics.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const FRAMES_SAMPLED_TOTAL: &str = "vshop_frames_sampled_total";
    pub const FRAMES_PROCESSED_TOTAL: &str = "vshop_frames_processed_total";
    pub const FRAMES_SKIPPED_TOTAL: &str = "vshop_frames_skipped_total";
    pub const PRODUCTS_MATCHED_TOTAL: &str = "vshop_products_matched_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "vshop_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "vshop_jobs_failed_total";
    pub const JOB_DURATION_SECONDS: &str = "vshop_job_duration_seconds";
}

/// Why a sampling point produced no analyzed frame.
#[derive(Debug, Clone, Copy)]
pub enum SkipReason {
    Unreadable,
    NoPerson,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Unreadable => "unreadable",
            SkipReason::NoPerson => "no_person",
        }
    }
}

pub fn record_frame_sampled() {
    counter!(names::FRAMES_SAMPLED_TOTAL).increment(1);
}

pub fn record_frame_skipped(reason: SkipReason) {
    counter!(names::FRAMES_SKIPPED_TOTAL, "reason" => reason.as_str()).increment(1);
}

pub fn record_frame_processed(products: usize) {
    counter!(names::FRAMES_PROCESSED_TOTAL).increment(1);
    counter!(names::PRODUCTS_MATCHED_TOTAL).increment(products as u64);
}

pub fn record_job_finished(success: bool, duration_secs: f64) {
    if success {
        counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    } else {
        counter!(names::JOBS_FAILED_TOTAL).increment(1);
    }
    histogram!(names::JOB_DURATION_SECONDS).record(duration_secs);
}
