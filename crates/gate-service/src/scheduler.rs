//! Background promotion scheduler.
//!
//! Request handlers run promotion passes opportunistically, but a
//! gate with no traffic would otherwise never free slots held by
//! silent sessions. This task runs the same pass on a fixed interval
//! and pushes the results out through the hub. It also handles
//! retention cleanup of terminal sessions.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use gate_core::config::GateConfig;
use gate_database::SessionStore;
use gate_realtime::GateHub;

use crate::occupancy::Occupancy;
use crate::promotion::PromotionEngine;

/// Terminal-session purge runs once every this many ticks.
const PURGE_EVERY_TICKS: u64 = 20;

/// Periodic driver for promotion and retention.
pub struct PromotionScheduler {
    engine: PromotionEngine,
    occupancy: Occupancy,
    store: Arc<dyn SessionStore>,
    hub: Arc<GateHub>,
    config: GateConfig,
}

impl PromotionScheduler {
    pub fn new(
        engine: PromotionEngine,
        occupancy: Occupancy,
        store: Arc<dyn SessionStore>,
        hub: Arc<GateHub>,
        config: GateConfig,
    ) -> Self {
        Self {
            engine,
            occupancy,
            store,
            hub,
            config,
        }
    }

    /// Run until shutdown is signalled.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(
            self.config.promotion_tick_ms,
        ));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut tick: u64 = 0;

        info!(
            tick_ms = self.config.promotion_tick_ms,
            "Promotion scheduler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    tick += 1;
                    self.tick(tick).await;
                }
                _ = shutdown.changed() => {
                    info!("Promotion scheduler shutting down");
                    break;
                }
            }
        }
    }

    async fn tick(&self, tick: u64) {
        let now = Utc::now();

        match self.engine.promote(now).await {
            Ok(outcome) => {
                if !outcome.promoted.is_empty() {
                    self.hub.notify_promoted(&outcome.promoted).await;
                }
                if outcome.changed_anything() {
                    match self.occupancy.snapshot(now).await {
                        Ok(snap) => {
                            self.hub
                                .broadcast_occupancy(
                                    snap.active_count,
                                    snap.capacity,
                                    snap.queue_length,
                                )
                                .await;
                        }
                        Err(e) => warn!(error = %e, "Failed to snapshot occupancy"),
                    }
                }
            }
            Err(e) => warn!(error = %e, "Scheduled promotion pass failed"),
        }

        if tick % PURGE_EVERY_TICKS == 0 {
            let before = now - Duration::hours(self.config.retention_hours as i64);
            match self.store.purge_terminal(before).await {
                Ok(purged) if purged > 0 => {
                    debug!(purged, "Purged terminal gate sessions");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Terminal session purge failed"),
            }
        }
    }
}
