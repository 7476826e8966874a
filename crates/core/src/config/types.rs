use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::broadcaster::BroadcasterConfig;
use crate::scheduler::MaintenanceConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub broadcaster: BroadcasterConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Shared operator token (required when method = "api_key")
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("queuedesk.db")
}

/// What `call-next` does when the requesting counter is still serving a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallNextPolicy {
    /// Finish the current ticket as COMPLETED, then call the next one.
    #[default]
    Complete,
    /// Finish the current ticket as SKIPPED, then call the next one.
    Skip,
    /// Refuse the call until the operator completes or skips explicitly.
    Reject,
}

/// What deactivating or deleting a counter does while it serves a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyCounterPolicy {
    /// Refuse the change.
    #[default]
    Block,
    /// Force-complete the in-flight ticket first.
    Complete,
    /// Force-skip the in-flight ticket first.
    Skip,
}

/// Queue numbering and dispatch configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// First queue number handed out each day (and after a daily reset).
    #[serde(default = "default_start_number")]
    pub start_number: i64,

    /// Service time (minutes) used for new counters and for wait estimates
    /// when no counter is active.
    #[serde(default = "default_service_time")]
    pub default_service_time_minutes: i64,

    /// How many upcoming tickets the status view lists.
    #[serde(default = "default_next_waiting_limit")]
    pub next_waiting_limit: i64,

    /// Offset from UTC (minutes) that defines the local calendar day.
    #[serde(default)]
    pub utc_offset_minutes: i32,

    #[serde(default)]
    pub call_next_policy: CallNextPolicy,

    #[serde(default)]
    pub busy_counter_policy: BusyCounterPolicy,
}

fn default_start_number() -> i64 {
    1
}

fn default_service_time() -> i64 {
    5
}

fn default_next_waiting_limit() -> i64 {
    5
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            start_number: default_start_number(),
            default_service_time_minutes: default_service_time(),
            next_waiting_limit: default_next_waiting_limit(),
            utc_offset_minutes: 0,
            call_next_policy: CallNextPolicy::default(),
            busy_counter_policy: BusyCounterPolicy::default(),
        }
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub broadcaster: BroadcasterConfig,
    pub maintenance: MaintenanceConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub api_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
                api_key_configured: config
                    .auth
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            queue: config.queue.clone(),
            broadcaster: config.broadcaster.clone(),
            maintenance: config.maintenance.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none_auth_config() -> Config {
        Config {
            auth: AuthConfig {
                method: AuthMethod::None,
                api_key: None,
            },
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            queue: QueueConfig::default(),
            broadcaster: BroadcasterConfig::default(),
            maintenance: MaintenanceConfig::default(),
        }
    }

    #[test]
    fn test_deserialize_valid_config_with_none_auth() {
        let toml = r#"
[auth]
method = "none"

[server]
host = "127.0.0.1"
port = 9000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.method, AuthMethod::None);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let toml = r#"
[auth]
method = "none"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "queuedesk.db");
        assert_eq!(config.queue.start_number, 1);
        assert_eq!(config.queue.default_service_time_minutes, 5);
        assert_eq!(config.queue.next_waiting_limit, 5);
        assert_eq!(config.queue.call_next_policy, CallNextPolicy::Complete);
        assert_eq!(config.queue.busy_counter_policy, BusyCounterPolicy::Block);
        assert!(config.maintenance.enabled);
    }

    #[test]
    fn test_deserialize_missing_auth_fails() {
        let toml = r#"
[server]
port = 8080
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_api_key_auth() {
        let toml = r#"
[auth]
method = "api_key"
api_key = "s3cret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.method, AuthMethod::ApiKey);
        assert_eq!(config.auth.api_key.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let mut config = none_auth_config();
        config.auth = AuthConfig {
            method: AuthMethod::ApiKey,
            api_key: Some("s3cret".to_string()),
        };

        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.auth.method, "api_key");
        assert!(sanitized.auth.api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("s3cret"));
    }

    #[test]
    fn test_sanitized_config_none_auth() {
        let sanitized = SanitizedConfig::from(&none_auth_config());
        assert_eq!(sanitized.auth.method, "none");
        assert!(!sanitized.auth.api_key_configured);
        assert_eq!(sanitized.server.port, 8080);
    }
}
