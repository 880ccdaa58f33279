//! Gate session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::SessionStatus;
use super::VisitPurpose;

/// One visitor's tracked attempt to gain or hold a slot.
///
/// Created at check-in with status `Active` or `Queued`; mutated by
/// heartbeats (`last_seen_at`), by the promotion engine
/// (`Queued` → `Active`), by staleness detection (→ `Expired`), and by
/// explicit exit (→ `Exited`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GateSession {
    /// Unique session identifier.
    pub id: Uuid,
    /// Visitor-supplied display name (non-authoritative).
    pub display_name: String,
    /// Visitor-supplied email (non-authoritative).
    pub email: Option<String>,
    /// Stated purpose of the visit.
    pub purpose: Option<VisitPurpose>,
    /// Current lifecycle state.
    pub status: SessionStatus,
    /// SHA-256 hash of the credential's secret nonce. Unique; the raw
    /// nonce is never stored.
    pub token_hash: String,
    /// SHA-256 hash of the originating client IP.
    pub ip_hash: String,
    /// Whether the session was elevated to admin via the separate
    /// verification path.
    pub is_admin: bool,
    /// When the session entered the queue (queued sessions only).
    pub queued_at: Option<DateTime<Utc>>,
    /// When the session was admitted.
    pub entered_at: Option<DateTime<Utc>>,
    /// Last heartbeat timestamp.
    pub last_seen_at: DateTime<Utc>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl GateSession {
    /// Whether this session counts toward occupancy at the given cutoff.
    pub fn counts_as_active(&self, cutoff: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Active && self.last_seen_at >= cutoff
    }

    /// Whether the heartbeat window has elapsed for this session.
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_seen_at < cutoff
    }
}

/// Visitor-submitted fields plus credential hashes for a fresh
/// check-in. The store decides between immediate admission and the
/// queue, atomically with the occupancy count.
#[derive(Debug, Clone)]
pub struct NewVisitor {
    /// Visitor-supplied display name.
    pub display_name: String,
    /// Visitor-supplied email.
    pub email: Option<String>,
    /// Stated purpose of the visit.
    pub purpose: Option<VisitPurpose>,
    /// SHA-256 hash of the credential nonce.
    pub token_hash: String,
    /// SHA-256 hash of the client IP.
    pub ip_hash: String,
}

impl NewVisitor {
    /// Expand into session data for the status the store decided on.
    pub fn into_session(self, admitted: bool, now: DateTime<Utc>) -> NewGateSession {
        if admitted {
            NewGateSession::active(
                self.display_name,
                self.email,
                self.purpose,
                self.token_hash,
                self.ip_hash,
                now,
            )
        } else {
            NewGateSession::queued(
                self.display_name,
                self.email,
                self.purpose,
                self.token_hash,
                self.ip_hash,
                now,
            )
        }
    }
}

/// Data required to create a new gate session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGateSession {
    /// Visitor-supplied display name.
    pub display_name: String,
    /// Visitor-supplied email.
    pub email: Option<String>,
    /// Stated purpose of the visit.
    pub purpose: Option<VisitPurpose>,
    /// Initial status (`Active` or `Queued`).
    pub status: SessionStatus,
    /// SHA-256 hash of the credential nonce.
    pub token_hash: String,
    /// SHA-256 hash of the client IP.
    pub ip_hash: String,
    /// Queue entry time (queued sessions only).
    pub queued_at: Option<DateTime<Utc>>,
    /// Admission time (active sessions only).
    pub entered_at: Option<DateTime<Utc>>,
    /// Initial heartbeat timestamp.
    pub last_seen_at: DateTime<Utc>,
}

impl NewGateSession {
    /// Build a record for a visitor admitted immediately.
    pub fn active(
        display_name: String,
        email: Option<String>,
        purpose: Option<VisitPurpose>,
        token_hash: String,
        ip_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            display_name,
            email,
            purpose,
            status: SessionStatus::Active,
            token_hash,
            ip_hash,
            queued_at: None,
            entered_at: Some(now),
            last_seen_at: now,
        }
    }

    /// Build a record for a visitor placed into the waiting queue.
    pub fn queued(
        display_name: String,
        email: Option<String>,
        purpose: Option<VisitPurpose>,
        token_hash: String,
        ip_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            display_name,
            email,
            purpose,
            status: SessionStatus::Queued,
            token_hash,
            ip_hash,
            queued_at: Some(now),
            entered_at: None,
            last_seen_at: now,
        }
    }
}
