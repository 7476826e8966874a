//! Broadcaster configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the status broadcaster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcasterConfig {
    /// How often a full snapshot is pushed to subscribers (milliseconds).
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_ms: u64,

    /// How often a heartbeat is pushed (milliseconds).
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,

    /// Messages buffered per subscriber before it starts lagging.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_snapshot_interval() -> u64 {
    3000 // 3 seconds
}

fn default_heartbeat_interval() -> u64 {
    15000 // 15 seconds
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_ms: default_snapshot_interval(),
            heartbeat_interval_ms: default_heartbeat_interval(),
            channel_capacity: default_channel_capacity(),
        }
    }
}
