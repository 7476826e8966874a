//! Ordering between the daily reset and everything else.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::QueueError;

/// Issuing and dispatch share the gate; the daily reset takes it exclusively,
/// so no ticket is issued or bound to a counter halfway through a reset.
///
/// Clones share the same lock.
#[derive(Debug, Clone, Default)]
pub struct QueueGate {
    lock: Arc<RwLock<()>>,
}

impl QueueGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> Result<RwLockReadGuard<'_, ()>, QueueError> {
        self.lock
            .read()
            .map_err(|_| QueueError::Storage("queue gate poisoned".to_string()))
    }

    pub fn exclusive(&self) -> Result<RwLockWriteGuard<'_, ()>, QueueError> {
        self.lock
            .write()
            .map_err(|_| QueueError::Storage("queue gate poisoned".to_string()))
    }
}
