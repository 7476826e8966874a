//! Background maintenance loop.
//!
//! Wakes up every `check_interval_secs` and runs whatever is due:
//! - the daily reset, once the local queue day has changed
//! - cleanup, every `cleanup_interval_secs`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::audit::SYSTEM_ACTOR;
use crate::queue::{CleanupReport, QueueService, ResetReport};

use super::config::MaintenanceConfig;

struct SchedulerState {
    last_day: NaiveDate,
    last_cleanup: Option<Instant>,
}

/// What a single scheduler pass did.
#[derive(Debug, Default)]
pub struct SchedulerPass {
    pub reset: Option<ResetReport>,
    pub cleanup: Option<CleanupReport>,
}

/// Runs cleanup and the daily reset in the background.
#[derive(Clone)]
pub struct MaintenanceScheduler {
    config: MaintenanceConfig,
    queue: Arc<QueueService>,
    state: Arc<Mutex<SchedulerState>>,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl MaintenanceScheduler {
    pub fn new(config: MaintenanceConfig, queue: Arc<QueueService>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let state = SchedulerState {
            last_day: queue.today(),
            last_cleanup: None,
        };

        Self {
            config,
            queue,
            state: Arc::new(Mutex::new(state)),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Start the scheduler (spawns a background task).
    pub fn start(&self) {
        if !self.config.enabled {
            info!("Maintenance scheduler disabled");
            return;
        }

        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Maintenance scheduler already running");
            return;
        }

        let this = self.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let interval = Duration::from_secs(self.config.check_interval_secs);

        tokio::spawn(async move {
            info!("Maintenance scheduler started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Maintenance scheduler received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !this.running.load(Ordering::Relaxed) {
                            break;
                        }
                        this.run_due(this.queue.today(), Instant::now());
                    }
                }
            }
            info!("Maintenance scheduler stopped");
        });
    }

    /// Stop the scheduler.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        info!("Stopping maintenance scheduler");
        let _ = self.shutdown_tx.send(());
    }

    /// Run whatever is due at `today` / `now`.
    pub fn run_due(&self, today: NaiveDate, now: Instant) -> SchedulerPass {
        let mut pass = SchedulerPass::default();

        let (reset_due, cleanup_due) = match self.state.lock() {
            Ok(mut state) => {
                let reset_due = self.config.auto_reset_daily && today != state.last_day;
                state.last_day = today;

                let interval = Duration::from_secs(self.config.cleanup_interval_secs);
                let cleanup_due = state
                    .last_cleanup
                    .is_none_or(|last| now.duration_since(last) >= interval);
                if cleanup_due {
                    state.last_cleanup = Some(now);
                }

                (reset_due, cleanup_due)
            }
            Err(_) => {
                error!("Maintenance scheduler state poisoned");
                return pass;
            }
        };

        if reset_due {
            info!(day = %today, "Queue day rolled over, resetting");
            match self.queue.reset_daily(SYSTEM_ACTOR) {
                Ok(report) => pass.reset = Some(report),
                Err(e) => error!("Daily reset failed: {}", e),
            }
        }

        if cleanup_due {
            match self.queue.cleanup(SYSTEM_ACTOR) {
                Ok(report) => pass.cleanup = Some(report),
                Err(e) => error!("Cleanup failed: {}", e),
            }
        }

        pass
    }
}
