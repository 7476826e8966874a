use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use queuedesk_core::{AuditFilter, AuditRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

/// Maximum allowed limit for audit queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for audit queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for audit endpoint
#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    pub ticket_id: Option<i64>,
    pub counter_id: Option<i64>,
    /// e.g. `ticket_called`, `counter_toggled`
    pub event_type: Option<String>,
    pub user_id: Option<String>,
    /// Only events at or after this instant (RFC 3339)
    pub from: Option<DateTime<Utc>>,
    /// Only events at or before this instant (RFC 3339)
    pub to: Option<DateTime<Utc>>,
    /// Default 100, max 1000
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Response for audit query endpoint
#[derive(Debug, Serialize)]
pub struct AuditQueryResponse {
    pub events: Vec<AuditRecord>,
    /// Matching events ignoring limit/offset
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct AuditErrorResponse {
    pub error: String,
}

type AuditFailure = (StatusCode, Json<AuditErrorResponse>);

fn failure(context: &str, e: impl std::fmt::Display) -> AuditFailure {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(AuditErrorResponse {
            error: format!("{}: {}", context, e),
        }),
    )
}

/// Query the audit log, newest first
pub async fn query_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditQueryResponse>, AuditFailure> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = AuditFilter::new();
    if let Some(ticket_id) = params.ticket_id {
        filter = filter.with_ticket_id(ticket_id);
    }
    if let Some(counter_id) = params.counter_id {
        filter = filter.with_counter_id(counter_id);
    }
    if let Some(event_type) = params.event_type {
        filter = filter.with_event_type(event_type);
    }
    if let Some(user_id) = params.user_id {
        filter = filter.with_user_id(user_id);
    }
    if params.from.is_some() || params.to.is_some() {
        filter = filter.with_time_range(params.from, params.to);
    }

    // Count ignores pagination, so it runs on the unpaged filter
    let total = state
        .audit_store()
        .count(&filter)
        .map_err(|e| failure("Failed to count audit events", e))?;

    let events = state
        .audit_store()
        .query(&filter.with_limit(limit).with_offset(offset))
        .map_err(|e| failure("Failed to query audit events", e))?;

    Ok(Json(AuditQueryResponse {
        events,
        total,
        limit,
        offset,
    }))
}
