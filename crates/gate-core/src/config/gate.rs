//! Gate admission-control configuration.

use serde::{Deserialize, Serialize};

/// Capacity, heartbeat, token, and rate-limit settings for the gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Maximum number of concurrently active sessions.
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// How long a session may go without a heartbeat before it stops
    /// counting as active. Should be a small multiple of the heartbeat
    /// interval so one or two missed beats do not expire a session.
    #[serde(default = "default_heartbeat_window")]
    pub heartbeat_window_ms: u64,
    /// Heartbeat interval advertised to clients.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
    /// Sealed credential time-to-live.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_ms: u64,
    /// Fixed rate-limit window for check-in attempts.
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_ms: u64,
    /// Maximum check-in attempts per window per client.
    #[serde(default = "default_rate_limit_max")]
    pub rate_limit_max_requests: u32,
    /// Secret used to seal credentials. Must be at least 32 bytes.
    #[serde(default = "default_seal_secret")]
    pub seal_secret: String,
    /// Salt mixed into client IP hashes.
    #[serde(default)]
    pub ip_salt: String,
    /// How long terminal (expired/exited) sessions are retained before purge.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
    /// Interval of the background promotion tick.
    #[serde(default = "default_promotion_tick")]
    pub promotion_tick_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            heartbeat_window_ms: default_heartbeat_window(),
            heartbeat_interval_ms: default_heartbeat_interval(),
            token_ttl_ms: default_token_ttl(),
            rate_limit_window_ms: default_rate_limit_window(),
            rate_limit_max_requests: default_rate_limit_max(),
            seal_secret: default_seal_secret(),
            ip_salt: String::new(),
            retention_hours: default_retention_hours(),
            promotion_tick_ms: default_promotion_tick(),
        }
    }
}

fn default_capacity() -> u32 {
    200
}

fn default_heartbeat_window() -> u64 {
    90_000
}

fn default_heartbeat_interval() -> u64 {
    20_000
}

fn default_token_ttl() -> u64 {
    2 * 60 * 60 * 1000
}

fn default_rate_limit_window() -> u64 {
    5 * 60 * 1000
}

fn default_rate_limit_max() -> u32 {
    5
}

fn default_seal_secret() -> String {
    "dev-secret-must-be-at-least-32-characters-long".to_string()
}

fn default_retention_hours() -> u64 {
    24
}

fn default_promotion_tick() -> u64 {
    15_000
}
