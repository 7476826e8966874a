//! Counter administration handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use queuedesk_core::{CreateCounterRequest, UpdateCounterRequest};
use std::sync::Arc;

use super::middleware::AuthUser;
use super::response::{ApiResponse, ApiResult, CounterPayload, CountersPayload};
use crate::state::AppState;

/// List live counters
pub async fn list_counters(State(state): State<Arc<AppState>>) -> ApiResult<CountersPayload> {
    let counters = state.queue().list_counters()?;
    Ok(ApiResponse::ok(
        format!("Found {} counters", counters.len()),
        CountersPayload { counters },
    ))
}

/// Get a counter by id
pub async fn get_counter(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<CounterPayload> {
    let Path(id) = id?;
    let counter = state.queue().get_counter(id)?;
    Ok(ApiResponse::ok("Counter retrieved", CounterPayload { counter }))
}

pub async fn create_counter(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<CreateCounterRequest>, JsonRejection>,
) -> ApiResult<CounterPayload> {
    let Json(request) = body?;
    let counter = state.queue().create_counter(request, &user_id)?;
    Ok(ApiResponse::ok(
        format!("Counter '{}' created", counter.name),
        CounterPayload { counter },
    ))
}

pub async fn update_counter(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateCounterRequest>, JsonRejection>,
) -> ApiResult<CounterPayload> {
    let Path(id) = id?;
    let Json(request) = body?;
    let counter = state.queue().update_counter(id, request, &user_id)?;
    Ok(ApiResponse::ok(
        format!("Counter '{}' updated", counter.name),
        CounterPayload { counter },
    ))
}

/// Soft-delete a counter
pub async fn delete_counter(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<CounterPayload> {
    let Path(id) = id?;
    let counter = state.queue().delete_counter(id, &user_id)?;
    Ok(ApiResponse::ok(
        format!("Counter '{}' deleted", counter.name),
        CounterPayload { counter },
    ))
}

/// Flip a counter between active and inactive
pub async fn toggle_status(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<CounterPayload> {
    let Path(id) = id?;
    let counter = state.queue().toggle_counter(id, &user_id)?;
    let verb = if counter.is_active {
        "activated"
    } else {
        "deactivated"
    };
    Ok(ApiResponse::ok(
        format!("Counter '{}' {}", counter.name, verb),
        CounterPayload { counter },
    ))
}
