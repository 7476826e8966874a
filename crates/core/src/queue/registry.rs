//! Counter administration.

use std::sync::Arc;

use tracing::info;

use crate::config::{BusyCounterPolicy, QueueConfig};
use crate::counter::{
    Counter, CounterStore, CreateCounterRequest, NewCounter, UpdateCounterRequest,
    DEFAULT_MAX_QUEUE,
};
use crate::ticket::{Ticket, TicketStatus};

use super::{QueueDispatcher, QueueError};

const MAX_NAME_LEN: usize = 100;

/// A counter after an admin change, plus any ticket the change force-finished.
#[derive(Debug, Clone)]
pub struct RegistryOutcome {
    pub counter: Counter,
    pub released: Option<Ticket>,
}

/// Creates, edits, toggles and deletes counters.
pub struct CounterRegistry {
    counters: Arc<dyn CounterStore>,
    dispatcher: Arc<QueueDispatcher>,
    busy_policy: BusyCounterPolicy,
    default_service_time: i64,
}

impl CounterRegistry {
    pub fn new(
        config: &QueueConfig,
        counters: Arc<dyn CounterStore>,
        dispatcher: Arc<QueueDispatcher>,
    ) -> Self {
        Self {
            counters,
            dispatcher,
            busy_policy: config.busy_counter_policy,
            default_service_time: config.default_service_time_minutes,
        }
    }

    pub fn create(&self, request: CreateCounterRequest) -> Result<Counter, QueueError> {
        let name = validate_name(&request.name)?;
        validate_positive("estimatedServiceTime", request.estimated_service_time)?;
        validate_positive("maxQueue", request.max_queue)?;

        let counter = self.counters.create(NewCounter {
            name,
            description: request.description,
            is_active: request.is_active.unwrap_or(true),
            estimated_service_time: request
                .estimated_service_time
                .unwrap_or(self.default_service_time),
            max_queue: request.max_queue.unwrap_or(DEFAULT_MAX_QUEUE),
        })?;

        info!(counter_id = counter.id, name = %counter.name, "Created counter");
        Ok(counter)
    }

    pub fn update(
        &self,
        id: i64,
        mut request: UpdateCounterRequest,
    ) -> Result<RegistryOutcome, QueueError> {
        if let Some(ref name) = request.name {
            request.name = Some(validate_name(name)?);
        }
        validate_positive("estimatedServiceTime", request.estimated_service_time)?;
        validate_positive("maxQueue", request.max_queue)?;

        self.dispatcher.with_counter_lock(id, || {
            let current = self.get(id)?;
            let released = if request.is_active == Some(false) {
                self.vacate(&current)?
            } else {
                None
            };

            let counter = self.counters.update(id, &request)?;
            info!(counter_id = id, "Updated counter");
            Ok(RegistryOutcome { counter, released })
        })
    }

    /// Soft-delete a counter.
    pub fn delete(&self, id: i64) -> Result<RegistryOutcome, QueueError> {
        self.dispatcher.with_counter_lock(id, || {
            let current = self.get(id)?;
            let released = self.vacate(&current)?;
            let counter = self.counters.soft_delete(id)?;
            info!(counter_id = id, "Deleted counter");
            Ok(RegistryOutcome { counter, released })
        })
    }

    /// Flip a counter between active and inactive.
    pub fn toggle(&self, id: i64) -> Result<RegistryOutcome, QueueError> {
        self.dispatcher.with_counter_lock(id, || {
            let current = self.get(id)?;
            let released = if current.is_active {
                self.vacate(&current)?
            } else {
                None
            };

            let counter = self.counters.set_active(id, !current.is_active)?;
            info!(counter_id = id, is_active = counter.is_active, "Toggled counter");
            Ok(RegistryOutcome { counter, released })
        })
    }

    pub fn get(&self, id: i64) -> Result<Counter, QueueError> {
        self.counters
            .get(id)?
            .ok_or_else(|| QueueError::counter_not_found(id))
    }

    pub fn list(&self) -> Result<Vec<Counter>, QueueError> {
        Ok(self.counters.list()?)
    }

    /// Apply the busy-counter policy before a counter stops serving.
    fn vacate(&self, counter: &Counter) -> Result<Option<Ticket>, QueueError> {
        if !counter.is_serving() {
            return Ok(None);
        }

        let outcome = match self.busy_policy {
            BusyCounterPolicy::Block => {
                return Err(QueueError::InvalidState(format!(
                    "Counter {} is serving ticket #{}; complete or skip it first",
                    counter.id,
                    counter.current_queue_number.unwrap_or_default()
                )));
            }
            BusyCounterPolicy::Complete => TicketStatus::Completed,
            BusyCounterPolicy::Skip => TicketStatus::Skipped,
        };

        self.dispatcher.release_counter(counter, outcome)
    }
}

fn validate_name(name: &str) -> Result<String, QueueError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(QueueError::InvalidInput(
            "Counter name is required".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(QueueError::InvalidInput(format!(
            "Counter name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_positive(field: &str, value: Option<i64>) -> Result<(), QueueError> {
    match value {
        Some(v) if v < 1 => Err(QueueError::InvalidInput(format!(
            "{} must be at least 1",
            field
        ))),
        _ => Ok(()),
    }
}
