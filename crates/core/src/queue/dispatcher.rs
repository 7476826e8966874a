//! Binding waiting tickets to counters and finishing them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::config::CallNextPolicy;
use crate::counter::{Counter, CounterStore};
use crate::metrics::{CLAIM_RACES_LOST, DISPATCH_ATTEMPTS, SERVICE_TIME, TICKETS_FINISHED};
use crate::ticket::{Ticket, TicketError, TicketFilter, TicketStatus, TicketStore};

use super::{QueueClock, QueueError, QueueGate};

/// How many times call-next re-selects after losing a claim race.
const MAX_CLAIM_ATTEMPTS: usize = 5;

/// Result of a successful call-next.
#[derive(Debug, Clone)]
pub struct Dispatch {
    /// Ticket now being served at the counter.
    pub ticket: Ticket,
    /// Ticket the counter was still serving, finished by the call-next policy.
    pub finished: Option<Ticket>,
}

/// Moves tickets through WAITING -> BEING_SERVED -> COMPLETED/SKIPPED.
pub struct QueueDispatcher {
    tickets: Arc<dyn TicketStore>,
    counters: Arc<dyn CounterStore>,
    clock: QueueClock,
    policy: CallNextPolicy,
    counter_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
    gate: QueueGate,
}

impl QueueDispatcher {
    pub fn new(
        policy: CallNextPolicy,
        clock: QueueClock,
        tickets: Arc<dyn TicketStore>,
        counters: Arc<dyn CounterStore>,
    ) -> Self {
        Self {
            tickets,
            counters,
            clock,
            policy,
            counter_locks: Mutex::new(HashMap::new()),
            gate: QueueGate::new(),
        }
    }

    pub fn with_gate(mut self, gate: QueueGate) -> Self {
        self.gate = gate;
        self
    }

    /// Run `f` while holding the counter's dispatch lock.
    ///
    /// Everything that reads and then changes a counter's current ticket goes
    /// through here, so one counter never binds two tickets. Not reentrant.
    pub fn with_counter_lock<T>(
        &self,
        counter_id: i64,
        f: impl FnOnce() -> Result<T, QueueError>,
    ) -> Result<T, QueueError> {
        let _gate = self.gate.shared()?;
        let lock = {
            let mut locks = self
                .counter_locks
                .lock()
                .map_err(|_| QueueError::Storage("counter lock table poisoned".to_string()))?;
            Arc::clone(locks.entry(counter_id).or_default())
        };

        let _guard = lock
            .lock()
            .map_err(|_| QueueError::Storage(format!("counter {} lock poisoned", counter_id)))?;
        f()
    }

    /// Bind the best waiting ticket to `counter_id`.
    pub fn call_next(&self, counter_id: i64) -> Result<Dispatch, QueueError> {
        let result = self.with_counter_lock(counter_id, || self.call_next_locked(counter_id));

        let label = match &result {
            Ok(_) => "called",
            Err(QueueError::Unavailable(_)) => "empty",
            Err(QueueError::Conflict(_)) => "conflict",
            Err(QueueError::InvalidState(_)) | Err(QueueError::NotFound(_)) => "rejected",
            Err(_) => "failed",
        };
        DISPATCH_ATTEMPTS.with_label_values(&[label]).inc();

        result
    }

    fn call_next_locked(&self, counter_id: i64) -> Result<Dispatch, QueueError> {
        let counter = self
            .counters
            .get(counter_id)?
            .ok_or_else(|| QueueError::counter_not_found(counter_id))?;

        if !counter.is_active {
            return Err(QueueError::InvalidState(format!(
                "Counter {} is inactive",
                counter_id
            )));
        }

        let outcome = match (counter.current_queue_id, self.policy) {
            (None, _) => None,
            (Some(_), CallNextPolicy::Reject) => {
                return Err(QueueError::InvalidState(format!(
                    "Counter {} is still serving ticket #{}",
                    counter_id,
                    counter.current_queue_number.unwrap_or_default()
                )));
            }
            (Some(_), CallNextPolicy::Complete) => Some(TicketStatus::Completed),
            (Some(_), CallNextPolicy::Skip) => Some(TicketStatus::Skipped),
        };

        // The current ticket is only finished once the next one is ours;
        // an empty queue or a lost race leaves the counter as it was.
        let ticket = self.claim_next(counter_id)?;

        let finished = match outcome {
            Some(outcome) => match self.release_counter(&counter, outcome) {
                Ok(finished) => finished,
                Err(e) => {
                    self.tickets.release(ticket.id)?;
                    return Err(e);
                }
            },
            None => None,
        };

        if !self
            .counters
            .assign(counter_id, ticket.id, ticket.queue_number)?
        {
            // Deactivated or deleted by another process
            self.tickets.release(ticket.id)?;
            return Err(QueueError::InvalidState(format!(
                "Counter {} can no longer take tickets",
                counter_id
            )));
        }

        info!(
            counter_id,
            ticket_id = ticket.id,
            queue_number = ticket.queue_number,
            priority = ticket.priority.as_str(),
            finished = ?finished.as_ref().map(|t| t.id),
            "Called ticket"
        );

        Ok(Dispatch { ticket, finished })
    }

    /// Claim the best waiting ticket of today for `counter_id`, re-selecting
    /// after lost races.
    fn claim_next(&self, counter_id: i64) -> Result<Ticket, QueueError> {
        let day = self.clock.today();

        for attempt in 1..=MAX_CLAIM_ATTEMPTS {
            let Some(candidate) = self.tickets.next_waiting(day)? else {
                return Err(QueueError::Unavailable("No ticket available".to_string()));
            };

            match self
                .tickets
                .claim(candidate.id, counter_id, self.clock.now())?
            {
                Some(ticket) => return Ok(ticket),
                None => {
                    CLAIM_RACES_LOST.inc();
                    warn!(
                        counter_id,
                        ticket_id = candidate.id,
                        attempt,
                        "Lost claim race, selecting another ticket"
                    );
                }
            }
        }

        Err(QueueError::Conflict(format!(
            "Could not claim a ticket for counter {} after {} attempts",
            counter_id, MAX_CLAIM_ATTEMPTS
        )))
    }

    pub fn complete(&self, ticket_id: i64) -> Result<Ticket, QueueError> {
        self.finish(ticket_id, TicketStatus::Completed)
    }

    pub fn skip(&self, ticket_id: i64) -> Result<Ticket, QueueError> {
        self.finish(ticket_id, TicketStatus::Skipped)
    }

    /// Finish a BEING_SERVED ticket and free its counter.
    pub fn finish(&self, ticket_id: i64, outcome: TicketStatus) -> Result<Ticket, QueueError> {
        let ticket = self
            .tickets
            .get(ticket_id)?
            .ok_or_else(|| QueueError::ticket_not_found(ticket_id))?;

        match ticket.counter_id {
            Some(counter_id) => self.with_counter_lock(counter_id, || {
                self.finish_unlocked(ticket_id, outcome)
            }),
            // Never called; the store rejects it with InvalidState
            None => self.finish_unlocked(ticket_id, outcome),
        }
    }

    fn finish_unlocked(&self, ticket_id: i64, outcome: TicketStatus) -> Result<Ticket, QueueError> {
        let ticket = self.tickets.finish(ticket_id, outcome, self.clock.now())?;
        self.after_finish(&ticket)?;
        Ok(ticket)
    }

    fn after_finish(&self, ticket: &Ticket) -> Result<(), QueueError> {
        if let Some(counter_id) = ticket.counter_id {
            if !self.counters.release(counter_id, ticket.id)? {
                debug!(counter_id, ticket_id = ticket.id, "Counter no longer pointed at ticket");
            }
        }

        let status = ticket.status.as_str();
        TICKETS_FINISHED.with_label_values(&[status]).inc();
        if let Some(secs) = ticket.actual_service_time {
            SERVICE_TIME.with_label_values(&[status]).observe(secs as f64);
        }

        info!(
            ticket_id = ticket.id,
            queue_number = ticket.queue_number,
            counter_id = ?ticket.counter_id,
            status,
            "Finished ticket"
        );

        Ok(())
    }

    /// Finish whatever ticket the counter is serving with `outcome`.
    ///
    /// Callers must hold the counter lock. A pointer to a ticket that already
    /// left BEING_SERVED is cleared and reported as nothing released.
    pub(crate) fn release_counter(
        &self,
        counter: &Counter,
        outcome: TicketStatus,
    ) -> Result<Option<Ticket>, QueueError> {
        let Some(ticket_id) = counter.current_queue_id else {
            return Ok(None);
        };

        match self.tickets.finish(ticket_id, outcome, self.clock.now()) {
            Ok(ticket) => {
                self.after_finish(&ticket)?;
                Ok(Some(ticket))
            }
            Err(TicketError::NotFound(_)) | Err(TicketError::InvalidState { .. }) => {
                warn!(
                    counter_id = counter.id,
                    ticket_id, "Clearing stale counter pointer"
                );
                self.counters.release(counter.id, ticket_id)?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, ticket_id: i64) -> Result<Ticket, QueueError> {
        self.tickets
            .get(ticket_id)?
            .ok_or_else(|| QueueError::ticket_not_found(ticket_id))
    }

    /// Live ticket of today with this queue number.
    pub fn find_by_number(&self, number: i64) -> Result<Ticket, QueueError> {
        self.tickets
            .find_by_number(self.clock.today(), number)?
            .ok_or_else(|| QueueError::NotFound(format!("Ticket #{} not found today", number)))
    }

    /// Live tickets of today ordered by queue number.
    pub fn list_today(&self, status: Option<TicketStatus>) -> Result<Vec<Ticket>, QueueError> {
        let mut filter = TicketFilter::live_on(self.clock.today());
        if let Some(status) = status {
            filter = filter.with_status(status);
        }
        Ok(self.tickets.list(&filter)?)
    }
}
