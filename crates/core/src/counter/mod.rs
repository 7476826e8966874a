//! Service counters and their storage.

mod sqlite;
mod types;

pub use sqlite::SqliteCounterStore;
pub use types::*;

/// Trait for counter storage backends.
///
/// Soft-deleted counters are invisible to every method.
pub trait CounterStore: Send + Sync {
    fn create(&self, counter: NewCounter) -> Result<Counter, CounterError>;

    fn get(&self, id: i64) -> Result<Option<Counter>, CounterError>;

    /// All live counters ordered by id.
    fn list(&self) -> Result<Vec<Counter>, CounterError>;

    /// Apply the present fields of `update`.
    fn update(&self, id: i64, update: &UpdateCounterRequest) -> Result<Counter, CounterError>;

    /// Mark a counter deleted and drop its current pointer.
    fn soft_delete(&self, id: i64) -> Result<Counter, CounterError>;

    fn set_active(&self, id: i64, active: bool) -> Result<Counter, CounterError>;

    /// Point an idle, active counter at a ticket.
    /// Returns false when the counter is inactive, deleted or already serving.
    fn assign(&self, id: i64, ticket_id: i64, queue_number: i64) -> Result<bool, CounterError>;

    /// Clear the pointer if it still refers to `ticket_id`.
    fn release(&self, id: i64, ticket_id: i64) -> Result<bool, CounterError>;

    /// Clear every counter's pointer. Returns how many were set.
    fn clear_all(&self) -> Result<usize, CounterError>;
}
