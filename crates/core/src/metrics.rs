//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Ticket issuing and dispatch
//! - Service times at counters
//! - Maintenance runs
//! - The audit pipeline

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Tickets
// =============================================================================

/// Tickets issued total by priority.
pub static TICKETS_ISSUED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("queuedesk_tickets_issued_total", "Total tickets issued"),
        &["priority"], // "LOW", "NORMAL", "HIGH"
    )
    .unwrap()
});

/// Tickets finished total by final status.
pub static TICKETS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "queuedesk_tickets_finished_total",
            "Total tickets completed or skipped",
        ),
        &["status"], // "COMPLETED", "SKIPPED"
    )
    .unwrap()
});

/// Seconds between call and finish.
pub static SERVICE_TIME: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "queuedesk_service_time_seconds",
            "Time a ticket spent being served",
        )
        .buckets(vec![
            30.0, 60.0, 120.0, 300.0, 600.0, 900.0, 1800.0, 3600.0,
        ]),
        &["status"],
    )
    .unwrap()
});

// =============================================================================
// Dispatch
// =============================================================================

/// Call-next attempts total by result.
pub static DISPATCH_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "queuedesk_dispatch_attempts_total",
            "Total call-next attempts",
        ),
        &["result"], // "called", "empty", "conflict", "rejected", "failed"
    )
    .unwrap()
});

/// Claims lost to another counter.
pub static CLAIM_RACES_LOST: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "queuedesk_claim_races_lost_total",
        "Ticket claims lost to a concurrent counter",
    )
    .unwrap()
});

// =============================================================================
// Maintenance
// =============================================================================

/// Maintenance runs by kind.
pub static MAINTENANCE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("queuedesk_maintenance_runs_total", "Maintenance runs"),
        &["kind"], // "cleanup", "reset_daily"
    )
    .unwrap()
});

/// Finished tickets removed by cleanup.
pub static TICKETS_PURGED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "queuedesk_tickets_purged_total",
        "Finished tickets removed by cleanup",
    )
    .unwrap()
});

// =============================================================================
// Audit
// =============================================================================

/// Audit events that never reached storage, by stage.
pub static AUDIT_EVENTS_LOST: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "queuedesk_audit_events_lost_total",
            "Audit events dropped before being persisted",
        ),
        &["stage"], // "enqueue", "insert"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(TICKETS_ISSUED.clone()),
        Box::new(TICKETS_FINISHED.clone()),
        Box::new(SERVICE_TIME.clone()),
        Box::new(DISPATCH_ATTEMPTS.clone()),
        Box::new(CLAIM_RACES_LOST.clone()),
        Box::new(MAINTENANCE_RUNS.clone()),
        Box::new(TICKETS_PURGED.clone()),
        Box::new(AUDIT_EVENTS_LOST.clone()),
    ]
}
