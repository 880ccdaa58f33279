//! In-memory session store.
//!
//! Keeps every session in a single map guarded by one mutex, which
//! makes the promotion claim trivially atomic. Used by tests and by
//! single-node dev deployments that do not want PostgreSQL.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use gate_core::error::AppError;
use gate_core::result::AppResult;
use gate_entity::{GateSession, NewGateSession, NewVisitor, SessionStatus};

use crate::store::SessionStore;

/// Session store backed by an in-process map keyed by token hash.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, GateSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn count_active_locked(sessions: &HashMap<String, GateSession>, cutoff: DateTime<Utc>) -> i64 {
        sessions
            .values()
            .filter(|s| s.counts_as_active(cutoff))
            .count() as i64
    }

    fn insert_locked(
        sessions: &mut HashMap<String, GateSession>,
        data: NewGateSession,
    ) -> AppResult<GateSession> {
        if sessions.contains_key(&data.token_hash) {
            return Err(AppError::conflict(
                "A session with this credential already exists",
            ));
        }
        let session = GateSession {
            id: Uuid::new_v4(),
            display_name: data.display_name,
            email: data.email,
            purpose: data.purpose,
            status: data.status,
            token_hash: data.token_hash.clone(),
            ip_hash: data.ip_hash,
            is_admin: false,
            queued_at: data.queued_at,
            entered_at: data.entered_at,
            last_seen_at: data.last_seen_at,
            created_at: Utc::now(),
        };
        sessions.insert(data.token_hash, session.clone());
        Ok(session)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, data: NewGateSession) -> AppResult<GateSession> {
        let mut sessions = self.sessions.lock().await;
        Self::insert_locked(&mut sessions, data)
    }

    async fn admit_or_queue(
        &self,
        visitor: NewVisitor,
        capacity: u32,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<GateSession> {
        // Count and insert under one lock hold so simultaneous
        // check-ins cannot both take the last slot.
        let mut sessions = self.sessions.lock().await;
        let active = Self::count_active_locked(&sessions, cutoff);
        let admitted = active < i64::from(capacity);
        Self::insert_locked(&mut sessions, visitor.into_session(admitted, now))
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> AppResult<Option<GateSession>> {
        let sessions = self.sessions.lock().await;
        Ok(sessions.get(token_hash).cloned())
    }

    async fn touch(&self, token_hash: &str, now: DateTime<Utc>) -> AppResult<bool> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(token_hash) {
            Some(s) if !s.status.is_terminal() => {
                s.last_seen_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_exited(&self, token_hash: &str) -> AppResult<bool> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(token_hash) {
            Some(s) if !s.status.is_terminal() => {
                s.status = SessionStatus::Exited;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_stale(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut sessions = self.sessions.lock().await;
        let mut expired = 0;
        for s in sessions.values_mut() {
            if !s.status.is_terminal() && s.is_stale(cutoff) {
                s.status = SessionStatus::Expired;
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn count_active(&self, cutoff: DateTime<Utc>) -> AppResult<i64> {
        let sessions = self.sessions.lock().await;
        Ok(Self::count_active_locked(&sessions, cutoff))
    }

    async fn count_queued(&self) -> AppResult<i64> {
        let sessions = self.sessions.lock().await;
        Ok(sessions
            .values()
            .filter(|s| s.status == SessionStatus::Queued)
            .count() as i64)
    }

    async fn queue_position(&self, session_id: Uuid) -> AppResult<Option<i64>> {
        let sessions = self.sessions.lock().await;
        let Some(target) = sessions.values().find(|s| s.id == session_id) else {
            return Ok(None);
        };
        if target.status != SessionStatus::Queued {
            return Ok(None);
        }
        let key = (target.queued_at.unwrap_or(target.created_at), target.created_at);
        let ahead = sessions
            .values()
            .filter(|s| {
                s.status == SessionStatus::Queued
                    && (s.queued_at.unwrap_or(s.created_at), s.created_at) < key
            })
            .count() as i64;
        Ok(Some(ahead + 1))
    }

    async fn claim_queued(
        &self,
        capacity: u32,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<String>> {
        // The whole claim happens under the lock, so the count and the
        // promotion are one atomic step.
        let mut sessions = self.sessions.lock().await;
        let active = Self::count_active_locked(&sessions, cutoff);
        let free = (i64::from(capacity) - active).max(0) as usize;
        if free == 0 {
            return Ok(Vec::new());
        }

        let mut waiting: Vec<(DateTime<Utc>, DateTime<Utc>, String)> = sessions
            .values()
            .filter(|s| s.status == SessionStatus::Queued)
            .map(|s| {
                (
                    s.queued_at.unwrap_or(s.created_at),
                    s.created_at,
                    s.token_hash.clone(),
                )
            })
            .collect();
        waiting.sort();

        let mut promoted = Vec::new();
        for (_, _, token_hash) in waiting.into_iter().take(free) {
            if let Some(s) = sessions.get_mut(&token_hash) {
                s.status = SessionStatus::Active;
                s.entered_at = Some(now);
                s.last_seen_at = now;
                promoted.push(token_hash);
            }
        }
        Ok(promoted)
    }

    async fn purge_terminal(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut sessions = self.sessions.lock().await;
        let initial = sessions.len();
        sessions.retain(|_, s| !(s.status.is_terminal() && s.last_seen_at < before));
        Ok((initial - sessions.len()) as u64)
    }
}
