//! Queue (ticket) API handlers.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use queuedesk_core::{GenerateTicket, QueueStatus, TicketStatus};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::middleware::AuthUser;
use super::response::{
    ApiError, ApiResponse, ApiResult, CallNextPayload, QueuePayload, QueuesPayload,
};
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for listing today's tickets
#[derive(Debug, Deserialize)]
pub struct ListQueueParams {
    /// Filter by status (WAITING, BEING_SERVED, COMPLETED, SKIPPED)
    pub status: Option<String>,
}

/// Request body for call-next
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallNextBody {
    pub counter_id: i64,
}

/// Query parameters for lookup by number
#[derive(Debug, Deserialize)]
pub struct FindParams {
    pub number: i64,
}

// ============================================================================
// Handlers
// ============================================================================

/// List today's live tickets in queue-number order
pub async fn list_queue(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListQueueParams>, QueryRejection>,
) -> ApiResult<QueuesPayload> {
    let Query(params) = params?;
    let status = params
        .status
        .as_deref()
        .map(str::parse::<TicketStatus>)
        .transpose()
        .map_err(ApiError::bad_request)?;

    let queues = state.queue().list_today(status)?;
    Ok(ApiResponse::ok(
        format!("Found {} tickets", queues.len()),
        QueuesPayload { queues },
    ))
}

/// Get a ticket by id
pub async fn get_queue(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<QueuePayload> {
    let Path(id) = id?;
    let queue = state.queue().get_ticket(id)?;
    Ok(ApiResponse::ok("Ticket retrieved", QueuePayload { queue }))
}

/// Issue the next ticket for today.
///
/// The body is optional; an empty body issues a NORMAL ticket.
pub async fn generate_ticket(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<QueuePayload> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        GenerateTicket::default()
    } else {
        serde_json::from_slice::<GenerateTicket>(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))?
    };

    let queue = state.queue().generate_ticket(request)?;
    info!(
        ticket_id = queue.id,
        queue_number = queue.queue_number,
        "Ticket issued"
    );

    Ok(ApiResponse::ok(
        format!("Ticket #{} issued", queue.queue_number),
        QueuePayload { queue },
    ))
}

/// Bind the next waiting ticket to a counter
pub async fn call_next(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<CallNextBody>, JsonRejection>,
) -> ApiResult<CallNextPayload> {
    let Json(body) = body?;
    let dispatch = state.queue().call_next(body.counter_id, &user_id)?;

    Ok(ApiResponse::ok(
        format!("Calling ticket #{}", dispatch.ticket.queue_number),
        CallNextPayload {
            queue: dispatch.ticket,
            finished: dispatch.finished,
        },
    ))
}

/// Mark a ticket being served as completed
pub async fn complete(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<QueuePayload> {
    let Path(id) = id?;
    let queue = state.queue().complete(id, &user_id)?;
    Ok(ApiResponse::ok(
        format!("Ticket #{} completed", queue.queue_number),
        QueuePayload { queue },
    ))
}

/// Mark a ticket being served as skipped
pub async fn skip(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<QueuePayload> {
    let Path(id) = id?;
    let queue = state.queue().skip(id, &user_id)?;
    Ok(ApiResponse::ok(
        format!("Ticket #{} skipped", queue.queue_number),
        QueuePayload { queue },
    ))
}

/// Aggregated status of today's queue
pub async fn get_status(State(state): State<Arc<AppState>>) -> ApiResult<QueueStatus> {
    let status = state.queue().status()?;
    Ok(ApiResponse::ok("Queue status retrieved", status))
}

/// Find a live ticket of today by its queue number
pub async fn find_by_number(
    State(state): State<Arc<AppState>>,
    params: Result<Query<FindParams>, QueryRejection>,
) -> ApiResult<QueuePayload> {
    let Query(params) = params?;
    let queue = state.queue().find_by_number(params.number)?;
    Ok(ApiResponse::ok(
        format!("Ticket #{} found", queue.queue_number),
        QueuePayload { queue },
    ))
}
