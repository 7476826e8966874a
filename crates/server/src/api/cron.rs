//! Maintenance triggers, normally driven by the scheduler.

use axum::extract::State;
use queuedesk_core::{CleanupReport, ResetReport};
use std::sync::Arc;

use super::middleware::AuthUser;
use super::response::{ApiResponse, ApiResult};
use crate::state::AppState;

/// Remove finished tickets past retention
pub async fn cleanup(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<CleanupReport> {
    let report = state.queue().cleanup(&user_id)?;
    let message = if report.removed == 0 {
        "Nothing to clean up".to_string()
    } else {
        format!("Removed {} finished tickets", report.removed)
    };
    Ok(ApiResponse::ok(message, report))
}

/// Clear counter pointers, expire today's tickets and restart numbering
pub async fn reset_daily(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<ResetReport> {
    let report = state.queue().reset_daily(&user_id)?;
    Ok(ApiResponse::ok(
        format!(
            "Queue reset: {} tickets expired, {} counters cleared",
            report.tickets_expired, report.counters_cleared
        ),
        report,
    ))
}
