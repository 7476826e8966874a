//! Types for service counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default ticket capacity of a counter.
pub const DEFAULT_MAX_QUEUE: i64 = 100;

/// A service point where an operator calls and serves tickets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counter {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    /// Queue number of the ticket being served, if any.
    pub current_queue_number: Option<i64>,
    /// Id of the ticket being served, if any.
    pub current_queue_id: Option<i64>,
    /// Average minutes per customer.
    pub estimated_service_time: i64,
    pub max_queue: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Counter {
    pub fn is_serving(&self) -> bool {
        self.current_queue_id.is_some()
    }
}

/// Admin request to create a counter. Missing fields take configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCounterRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub estimated_service_time: Option<i64>,
    #[serde(default)]
    pub max_queue: Option<i64>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Partial update of a counter. Only present fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCounterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub estimated_service_time: Option<i64>,
    #[serde(default)]
    pub max_queue: Option<i64>,
}

impl UpdateCounterRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.is_active.is_none()
            && self.estimated_service_time.is_none()
            && self.max_queue.is_none()
    }
}

/// Fully resolved counter row to insert.
#[derive(Debug, Clone)]
pub struct NewCounter {
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub estimated_service_time: i64,
    pub max_queue: i64,
}

/// Errors from counter storage.
#[derive(Debug, Error)]
pub enum CounterError {
    #[error("Counter not found: {0}")]
    NotFound(i64),

    #[error("Database error: {0}")]
    Database(String),
}
