//! Metric names recorded by the client.
//!
//! Recording goes through the `metrics` facade; nothing is exported unless the
//! binary installs a recorder.
//!
//! # Metrics
//!
//! - `fgaload_http_requests_total` - Requests by endpoint and status
//! - `fgaload_http_request_duration_seconds` - Request duration by endpoint
//! - `fgaload_check_duration_seconds` - Probe iteration latency
//! - `fgaload_assertions_total` - Assertion results by name and result
//! - `fgaload_throttle_pauses_total` - Pauses triggered by rate-limit headers

use std::time::Duration;

pub const HTTP_REQUESTS_TOTAL: &str = "fgaload_http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "fgaload_http_request_duration_seconds";
pub const CHECK_DURATION_SECONDS: &str = "fgaload_check_duration_seconds";
pub const ASSERTIONS_TOTAL: &str = "fgaload_assertions_total";
pub const THROTTLE_PAUSES_TOTAL: &str = "fgaload_throttle_pauses_total";

/// Describes every metric this crate records.
///
/// Call once after installing a recorder.
pub fn describe_metrics() {
    metrics::describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests sent to the service");
    metrics::describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "HTTP request duration in seconds"
    );
    metrics::describe_histogram!(
        CHECK_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Check probe latency in seconds"
    );
    metrics::describe_counter!(ASSERTIONS_TOTAL, "Assertion results by name");
    metrics::describe_counter!(
        THROTTLE_PAUSES_TOTAL,
        "Pauses taken after a rate-limit signal"
    );
}

pub(crate) fn record_request(endpoint: &'static str, status: Option<u16>, elapsed: Duration) {
    let status = status.map_or_else(|| "error".to_string(), |code| code.to_string());
    metrics::counter!(HTTP_REQUESTS_TOTAL, "endpoint" => endpoint, "status" => status).increment(1);
    metrics::histogram!(HTTP_REQUEST_DURATION_SECONDS, "endpoint" => endpoint)
        .record(elapsed.as_secs_f64());
}
