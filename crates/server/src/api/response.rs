//! Response envelope shared by the queue, counter and cron endpoints.
//!
//! Every response is `{status, message, data}`. Failures carry `status: false`,
//! a message and `data: null`, with the HTTP status derived from [`QueueError`].

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use queuedesk_core::{Counter, QueueError, Ticket};
use serde::Serialize;
use tracing::error;

/// Envelope around every typed payload.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            status: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

/// Result type for enveloped handlers.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// A failed request, rendered as an envelope with `status: false`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        let status = match &e {
            QueueError::NotFound(_) => StatusCode::NOT_FOUND,
            QueueError::InvalidState(_) => StatusCode::CONFLICT,
            QueueError::Conflict(_) => StatusCode::CONFLICT,
            QueueError::Unavailable(_) => StatusCode::NOT_FOUND,
            QueueError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            QueueError::Storage(_) => {
                error!("Queue storage failure: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            status: false,
            message: self.message,
            data: None,
        };
        (self.status, Json(body)).into_response()
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Serialize)]
pub struct QueuePayload {
    pub queue: Ticket,
}

#[derive(Debug, Serialize)]
pub struct QueuesPayload {
    pub queues: Vec<Ticket>,
}

/// Call-next result: the called ticket, plus the one the counter was
/// still serving if the call-next policy finished it.
#[derive(Debug, Serialize)]
pub struct CallNextPayload {
    pub queue: Ticket,
    pub finished: Option<Ticket>,
}

#[derive(Debug, Serialize)]
pub struct CounterPayload {
    pub counter: Counter,
}

#[derive(Debug, Serialize)]
pub struct CountersPayload {
    pub counters: Vec<Counter>,
}
