use super::{types::Config, AuthMethod, ConfigError};

/// Largest real-world UTC offset, in minutes (UTC+14:00).
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().is_none_or(str::is_empty)
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method = \"api_key\"".to_string(),
        ));
    }

    let queue = &config.queue;
    if queue.start_number < 1 {
        return Err(ConfigError::ValidationError(
            "queue.start_number must be at least 1".to_string(),
        ));
    }
    if queue.default_service_time_minutes < 1 {
        return Err(ConfigError::ValidationError(
            "queue.default_service_time_minutes must be at least 1".to_string(),
        ));
    }
    if !(1..=50).contains(&queue.next_waiting_limit) {
        return Err(ConfigError::ValidationError(
            "queue.next_waiting_limit must be between 1 and 50".to_string(),
        ));
    }
    if queue.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        return Err(ConfigError::ValidationError(format!(
            "queue.utc_offset_minutes must be within ±{}",
            MAX_UTC_OFFSET_MINUTES
        )));
    }

    let broadcaster = &config.broadcaster;
    if broadcaster.snapshot_interval_ms == 0 || broadcaster.heartbeat_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "broadcaster intervals must be greater than 0".to_string(),
        ));
    }
    if broadcaster.channel_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "broadcaster.channel_capacity must be greater than 0".to_string(),
        ));
    }

    let maintenance = &config.maintenance;
    if maintenance.retention_hours == 0 {
        return Err(ConfigError::ValidationError(
            "maintenance.retention_hours must be greater than 0".to_string(),
        ));
    }
    if maintenance.enabled
        && (maintenance.cleanup_interval_secs == 0 || maintenance.check_interval_secs == 0)
    {
        return Err(ConfigError::ValidationError(
            "maintenance intervals must be greater than 0".to_string(),
        ));
    }

    Ok(())
}
