//! Session status enumeration and state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a gate session.
///
/// `Expired` and `Exited` are terminal; a visitor who wants back in
/// checks in again and receives a fresh session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "gate_session_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    /// Holds a slot inside the gate.
    Active,
    /// Waiting for a slot, FIFO by `queued_at`.
    Queued,
    /// Stopped heartbeating and was swept out.
    Expired,
    /// Left explicitly.
    Exited,
}

impl SessionStatus {
    /// Whether the session is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Exited)
    }

    /// Whether the given transition is allowed by the state machine.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        match (self, next) {
            (Self::Queued, Self::Active) => true,
            (Self::Active | Self::Queued, Self::Expired) => true,
            (Self::Active | Self::Queued, Self::Exited) => true,
            _ => false,
        }
    }

    /// Return the status as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Queued => "QUEUED",
            Self::Expired => "EXPIRED",
            Self::Exited => "EXITED",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = gate_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "QUEUED" => Ok(Self::Queued),
            "EXPIRED" => Ok(Self::Expired),
            "EXITED" => Ok(Self::Exited),
            _ => Err(gate_core::AppError::validation(format!(
                "Invalid session status: '{s}'. Expected one of: ACTIVE, QUEUED, EXPIRED, EXITED"
            ))),
        }
    }
}
