use queuedesk_core::{
    AuditStore, Authenticator, Config, QueueService, SanitizedConfig, StatusBroadcaster,
};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    audit_store: Arc<dyn AuditStore>,
    queue: Arc<QueueService>,
    broadcaster: StatusBroadcaster,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        audit_store: Arc<dyn AuditStore>,
        queue: Arc<QueueService>,
        broadcaster: StatusBroadcaster,
    ) -> Self {
        Self {
            config,
            authenticator,
            audit_store,
            queue,
            broadcaster,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }

    pub fn queue(&self) -> &QueueService {
        self.queue.as_ref()
    }

    pub fn broadcaster(&self) -> &StatusBroadcaster {
        &self.broadcaster
    }
}
