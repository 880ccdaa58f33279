//! Occupancy accounting.
//!
//! A session occupies a slot only while it is ACTIVE and its last
//! heartbeat is within the configured window; rows the expiry sweep
//! has not yet caught never inflate the count.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use gate_core::config::GateConfig;
use gate_core::result::AppResult;
use gate_database::SessionStore;

/// Point-in-time view of gate occupancy.
#[derive(Debug, Clone, Serialize)]
pub struct OccupancySnapshot {
    /// Configured capacity.
    pub capacity: u32,
    /// Sessions currently counted as active.
    pub active_count: i64,
    /// Sessions waiting in the queue.
    pub queue_length: i64,
    /// Whether every slot is taken.
    pub is_full: bool,
}

/// Computes occupancy over the session store.
#[derive(Clone)]
pub struct Occupancy {
    store: Arc<dyn SessionStore>,
    config: GateConfig,
}

impl Occupancy {
    pub fn new(store: Arc<dyn SessionStore>, config: GateConfig) -> Self {
        Self { store, config }
    }

    /// The heartbeat cutoff: sessions last seen before this instant no
    /// longer count.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::milliseconds(self.config.heartbeat_window_ms as i64)
    }

    pub async fn active_count(&self, now: DateTime<Utc>) -> AppResult<i64> {
        self.store.count_active(self.cutoff(now)).await
    }

    pub async fn queue_length(&self) -> AppResult<i64> {
        self.store.count_queued().await
    }

    pub async fn queue_position(&self, session_id: Uuid) -> AppResult<Option<i64>> {
        self.store.queue_position(session_id).await
    }

    /// Full occupancy snapshot for status responses and broadcasts.
    pub async fn snapshot(&self, now: DateTime<Utc>) -> AppResult<OccupancySnapshot> {
        let active_count = self.active_count(now).await?;
        let queue_length = self.queue_length().await?;
        Ok(OccupancySnapshot {
            capacity: self.config.capacity,
            active_count,
            queue_length,
            is_full: active_count >= i64::from(self.config.capacity),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gate_database::MemorySessionStore;
    use gate_entity::NewGateSession;

    fn occupancy(store: Arc<dyn SessionStore>, capacity: u32) -> Occupancy {
        let config = GateConfig {
            capacity,
            ..GateConfig::default()
        };
        Occupancy::new(store, config)
    }

    #[tokio::test]
    async fn test_snapshot_counts_only_fresh_active_sessions() {
        let store = Arc::new(MemorySessionStore::new());
        let now = Utc::now();

        store
            .create(NewGateSession::active(
                "fresh".into(),
                None,
                None,
                "h1".into(),
                "ip".into(),
                now,
            ))
            .await
            .unwrap();
        store
            .create(NewGateSession::active(
                "stale".into(),
                None,
                None,
                "h2".into(),
                "ip".into(),
                now - Duration::seconds(300),
            ))
            .await
            .unwrap();
        store
            .create(NewGateSession::queued(
                "waiting".into(),
                None,
                None,
                "h3".into(),
                "ip".into(),
                now,
            ))
            .await
            .unwrap();

        let occ = occupancy(store, 2);
        let snap = occ.snapshot(now).await.unwrap();
        assert_eq!(snap.active_count, 1);
        assert_eq!(snap.queue_length, 1);
        assert_eq!(snap.capacity, 2);
        assert!(!snap.is_full);
    }

    #[tokio::test]
    async fn test_is_full_at_capacity() {
        let store = Arc::new(MemorySessionStore::new());
        let now = Utc::now();
        for i in 0..2 {
            store
                .create(NewGateSession::active(
                    format!("v{i}"),
                    None,
                    None,
                    format!("h{i}"),
                    "ip".into(),
                    now,
                ))
                .await
                .unwrap();
        }

        let occ = occupancy(store, 2);
        let snap = occ.snapshot(now).await.unwrap();
        assert!(snap.is_full);
    }
}
