//! Real-time WebSocket hub configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Interval between server pings.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_ms: u64,
    /// How long an outstanding ping may go unanswered before the cycle
    /// counts as missed. Two consecutive missed cycles terminate the
    /// connection.
    #[serde(default = "default_pong_timeout")]
    pub pong_timeout_ms: u64,
    /// Per-connection outbound channel buffer size.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ping_interval_ms: default_ping_interval(),
            pong_timeout_ms: default_pong_timeout(),
            channel_buffer_size: default_channel_buffer(),
        }
    }
}

fn default_ping_interval() -> u64 {
    30_000
}

fn default_pong_timeout() -> u64 {
    10_000
}

fn default_channel_buffer() -> usize {
    256
}
