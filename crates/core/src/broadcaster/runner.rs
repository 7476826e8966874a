//! Status broadcaster implementation.
//!
//! Publishes queue snapshots to every subscriber:
//! - periodically (snapshot interval)
//! - immediately after a mutation (via `refresh`)
//! - a heartbeat on its own interval
//!
//! Delivery is best-effort over a bounded broadcast channel. Each subscriber
//! has its own cursor; a slow subscriber lags and skips ahead, nothing is replayed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch, Notify};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::queue::{QueueChange, QueueError, StatusAggregator};

use super::config::BroadcasterConfig;
use super::types::{CounterDisplay, QueueSnapshot, StreamMessage};

/// Pushes queue snapshots and heartbeats to subscribers.
#[derive(Clone)]
pub struct StatusBroadcaster {
    config: BroadcasterConfig,
    status: Arc<StatusAggregator>,
    sender: broadcast::Sender<StreamMessage>,
    refresh: Arc<Notify>,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    feeds_closed: Arc<watch::Sender<bool>>,
}

impl StatusBroadcaster {
    pub fn new(config: BroadcasterConfig, status: Arc<StatusAggregator>) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        let (shutdown_tx, _) = broadcast::channel(1);
        let (feeds_closed, _) = watch::channel(false);

        Self {
            config,
            status,
            sender,
            refresh: Arc::new(Notify::new()),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            feeds_closed: Arc::new(feeds_closed),
        }
    }

    /// Subscribe to future messages.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Tell every open feed to finish. Irreversible.
    pub fn close_feeds(&self) {
        info!(subscribers = self.subscriber_count(), "Closing subscriber feeds");
        self.feeds_closed.send_replace(true);
    }

    /// Resolves once `close_feeds` has been called, immediately if it already was.
    pub fn feeds_closed(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.feeds_closed.subscribe();
        async move {
            // The sender lives as long as any broadcaster clone
            let _ = rx.wait_for(|closed| *closed).await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Fresh snapshot for the queue-updates feed.
    pub fn queue_snapshot(&self) -> Result<StreamMessage, QueueError> {
        Ok(StreamMessage::QueueUpdate(QueueSnapshot {
            status: self.status.get_status()?,
            counters: self.status.counter_snapshots()?,
            generated_at: Utc::now(),
        }))
    }

    /// Fresh snapshot for the counter-display feed.
    pub fn display_snapshot(&self) -> Result<StreamMessage, QueueError> {
        let status = self.status.get_status()?;
        Ok(StreamMessage::CounterDisplay(CounterDisplay {
            counters: self.status.counter_snapshots()?,
            currently_serving: status.currently_serving,
            next_waiting: status.next_waiting,
            generated_at: Utc::now(),
        }))
    }

    /// Compute and send both snapshots. Returns how many subscribers were reached.
    pub fn publish_snapshot(&self) -> Result<usize, QueueError> {
        let queue = self.queue_snapshot()?;
        let display = self.display_snapshot()?;

        // A send error only means nobody is listening
        let reached = self.sender.send(queue).unwrap_or(0);
        let _ = self.sender.send(display);
        Ok(reached)
    }

    pub fn publish_heartbeat(&self) {
        let _ = self.sender.send(StreamMessage::Heartbeat {
            timestamp: Utc::now().timestamp(),
        });
    }

    /// Request an immediate publish after a mutation.
    ///
    /// Requests made while a publish is pending are coalesced.
    pub fn refresh(&self, change: &QueueChange) {
        debug!(change = change.kind(), "Queue changed, scheduling publish");
        self.refresh.notify_one();
    }

    /// Start the publish loop (spawns a background task).
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Status broadcaster already running");
            return;
        }

        let this = self.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Status broadcaster started");

            let mut snapshot_tick =
                tokio::time::interval(Duration::from_millis(this.config.snapshot_interval_ms));
            snapshot_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let heartbeat_period = Duration::from_millis(this.config.heartbeat_interval_ms);
            let mut heartbeat_tick = tokio::time::interval_at(
                tokio::time::Instant::now() + heartbeat_period,
                heartbeat_period,
            );
            heartbeat_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Status broadcaster received shutdown signal");
                        break;
                    }
                    _ = snapshot_tick.tick() => {
                        this.publish_logged();
                    }
                    _ = this.refresh.notified() => {
                        this.publish_logged();
                    }
                    _ = heartbeat_tick.tick() => {
                        this.publish_heartbeat();
                    }
                }

                if !this.running.load(Ordering::Relaxed) {
                    break;
                }
            }

            info!("Status broadcaster stopped");
        });
    }

    /// Stop the publish loop.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Status broadcaster not running");
            return;
        }

        info!("Stopping status broadcaster");
        let _ = self.shutdown_tx.send(());
    }

    fn publish_logged(&self) {
        // Skip the database work when nobody is connected
        if self.sender.receiver_count() == 0 {
            return;
        }
        if let Err(e) = self.publish_snapshot() {
            warn!("Failed to publish queue snapshot: {}", e);
        }
    }
}
