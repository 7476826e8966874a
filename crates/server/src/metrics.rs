//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the queuedesk server:
//! - HTTP request metrics (latency, counts, errors)
//! - SSE connection metrics
//! - Ticket counts by status (collected on scrape)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "queuedesk_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("queuedesk_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "queuedesk_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "queuedesk_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// SSE Metrics
// =============================================================================

/// Open SSE streams.
pub static SSE_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "queuedesk_sse_connections_active",
        "Number of open SSE streams",
    )
    .unwrap()
});

/// Total SSE streams opened (cumulative), by feed.
pub static SSE_CONNECTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "queuedesk_sse_connections_total",
            "Total SSE streams since startup",
        ),
        &["feed"],
    )
    .unwrap()
});

/// SSE messages sent by type.
pub static SSE_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("queuedesk_sse_messages_sent_total", "SSE messages sent"),
        &["type"],
    )
    .unwrap()
});

/// Subscriber fell behind and skipped messages.
pub static SSE_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "queuedesk_sse_lag_events_total",
        "SSE lag events (subscriber fell behind)",
    )
    .unwrap()
});

// =============================================================================
// Queue Metrics (collected dynamically)
// =============================================================================

/// Today's live tickets by status.
pub static TICKETS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("queuedesk_tickets_by_status", "Today's ticket count by status"),
        &["status"],
    )
    .unwrap()
});

/// Active counters.
pub static COUNTERS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("queuedesk_counters_active", "Number of active counters").unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // SSE
    registry
        .register(Box::new(SSE_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(SSE_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(SSE_MESSAGES_SENT.clone()))
        .unwrap();
    registry.register(Box::new(SSE_LAG_EVENTS.clone())).unwrap();

    // Queue
    registry
        .register(Box::new(TICKETS_BY_STATUS.clone()))
        .unwrap();
    registry
        .register(Box::new(COUNTERS_ACTIVE.clone()))
        .unwrap();

    // Core metrics (issuing, dispatch, maintenance)
    for metric in queuedesk_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect today's queue.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let queue = state.queue();

    if let Ok(status) = queue.status() {
        TICKETS_BY_STATUS
            .with_label_values(&["WAITING"])
            .set(status.waiting);
        TICKETS_BY_STATUS
            .with_label_values(&["BEING_SERVED"])
            .set(status.being_served);
        TICKETS_BY_STATUS
            .with_label_values(&["COMPLETED"])
            .set(status.completed);
        TICKETS_BY_STATUS
            .with_label_values(&["SKIPPED"])
            .set(status.skipped);
    }

    if let Ok(counters) = queue.list_counters() {
        COUNTERS_ACTIVE.set(counters.iter().filter(|c| c.is_active).count() as i64);
    }
}

static NUMERIC_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    // Run twice: adjacent numeric segments share a slash
    let result = NUMERIC_SEGMENT.replace_all(path, "/{id}$1");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}
