//! Queue promotion engine.
//!
//! One promotion pass expires stale sessions, then atomically claims
//! the oldest queued sessions into whatever capacity is free. The
//! claim happens inside the store, so concurrent passes from request
//! handlers and the scheduler cannot double-promote or overshoot.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use gate_core::config::GateConfig;
use gate_core::result::AppResult;
use gate_database::SessionStore;

/// Result of one promotion pass.
#[derive(Debug, Clone, Default)]
pub struct PromotionOutcome {
    /// Sessions transitioned to EXPIRED by the staleness sweep.
    pub expired: u64,
    /// Token hashes of sessions promoted QUEUED → ACTIVE, in queue
    /// order.
    pub promoted: Vec<String>,
}

impl PromotionOutcome {
    /// Whether the pass changed any session state.
    pub fn changed_anything(&self) -> bool {
        self.expired > 0 || !self.promoted.is_empty()
    }
}

/// Runs promotion passes over the session store.
#[derive(Clone)]
pub struct PromotionEngine {
    store: Arc<dyn SessionStore>,
    config: GateConfig,
}

impl PromotionEngine {
    pub fn new(store: Arc<dyn SessionStore>, config: GateConfig) -> Self {
        Self { store, config }
    }

    /// Run one pass: expire stale sessions, then fill free slots from
    /// the queue in FIFO order. Idempotent when nothing changed.
    pub async fn promote(&self, now: DateTime<Utc>) -> AppResult<PromotionOutcome> {
        let cutoff = now - Duration::milliseconds(self.config.heartbeat_window_ms as i64);

        let expired = self.store.expire_stale(cutoff).await?;
        if expired > 0 {
            debug!(expired, "Expired stale gate sessions");
        }

        let promoted = self
            .store
            .claim_queued(self.config.capacity, cutoff, now)
            .await?;
        if !promoted.is_empty() {
            info!(count = promoted.len(), "Promoted queued sessions");
        }

        Ok(PromotionOutcome { expired, promoted })
    }
}
