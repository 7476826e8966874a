//! Maintenance scheduler configuration.

use serde::{Deserialize, Serialize};

/// Configuration for background cleanup and the daily reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Enable/disable the background scheduler.
    /// When disabled, maintenance only runs through the cron endpoints.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// How often cleanup runs (seconds).
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,

    /// Finished tickets older than this are deleted by cleanup (hours).
    #[serde(default = "default_retention_hours")]
    pub retention_hours: i64,

    /// Reset the queue automatically when the local day rolls over.
    #[serde(default = "default_enabled")]
    pub auto_reset_daily: bool,

    /// How often the scheduler wakes up to check what is due (seconds).
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_cleanup_interval() -> u64 {
    3600 // 1 hour
}

fn default_retention_hours() -> i64 {
    24
}

fn default_check_interval() -> u64 {
    60
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            cleanup_interval_secs: default_cleanup_interval(),
            retention_hours: default_retention_hours(),
            auto_reset_daily: default_enabled(),
            check_interval_secs: default_check_interval(),
        }
    }
}
