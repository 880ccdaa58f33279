//! Response DTOs.

use serde::Serialize;

use gate_entity::SessionStatus;
use gate_service::OccupancySnapshot;

/// Check-in response.
#[derive(Debug, Clone, Serialize)]
pub struct CheckinResponse {
    /// Resulting session status (ACTIVE or QUEUED).
    pub status: SessionStatus,
    /// Sealed credential, also set as the `gate_pass` cookie.
    pub pass_token: String,
    /// Hash identifying this session on the WebSocket channel.
    pub token_hash: String,
    /// 1-based queue position when queued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<i64>,
    /// Current occupancy.
    #[serde(flatten)]
    pub occupancy: OccupancySnapshot,
}

/// Heartbeat response.
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatResponse {
    /// Session status after this beat (promotion may have happened).
    pub status: SessionStatus,
    /// 1-based queue position when still queued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<i64>,
    /// Current occupancy.
    #[serde(flatten)]
    pub occupancy: OccupancySnapshot,
}

/// Exit response.
#[derive(Debug, Clone, Serialize)]
pub struct ExitResponse {
    /// Always EXITED.
    pub status: SessionStatus,
}

/// Status response. Session fields appear only for callers presenting
/// a valid credential.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// Current occupancy.
    #[serde(flatten)]
    pub occupancy: OccupancySnapshot,
    /// The caller's own session status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub your_status: Option<SessionStatus>,
    /// The caller's queue position when queued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<i64>,
    /// Whether the caller's session has admin privileges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

/// Health response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
}
