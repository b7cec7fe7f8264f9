//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vshop_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vshop_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vshop_http_requests_in_flight";

    // Upload metrics
    pub const UPLOADS_TOTAL: &str = "vshop_uploads_total";
    pub const UPLOAD_BYTES_TOTAL: &str = "vshop_upload_bytes_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an accepted video upload.
pub fn record_upload(bytes: u64) {
    counter!(names::UPLOADS_TOTAL).increment(1);
    counter!(names::UPLOAD_BYTES_TOTAL).increment(bytes);
}

fn id_segment() -> Option<&'static regex_lite::Regex> {
    static RE: OnceLock<Option<regex_lite::Regex>> = OnceLock::new();
    RE.get_or_init(|| regex_lite::Regex::new(r"/(videos|results|bundles)/[^/]+").ok())
        .as_ref()
}

/// Sanitize path for metrics labels (replace video IDs).
fn sanitize_path(path: &str) -> String {
    match id_segment() {
        Some(re) => re.replace_all(path, "/$1/:video_id").to_string(),
        None => path.to_string(),
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/videos/550e8400-e29b-41d4-a716-446655440000"),
            "/api/videos/:video_id"
        );
        assert_eq!(
            sanitize_path("/api/results/abc123"),
            "/api/results/:video_id"
        );
        assert_eq!(
            sanitize_path("/api/bundles/abc123"),
            "/api/bundles/:video_id"
        );
        assert_eq!(sanitize_path("/api/videos"), "/api/videos");
        assert_eq!(sanitize_path("/health"), "/health");
    }
}
