//! Application state shared across all handlers.

use std::sync::Arc;

use gate_auth::TokenSealer;
use gate_core::config::AppConfig;
use gate_database::SessionStore;
use gate_realtime::GateHub;
use gate_service::{Occupancy, PromotionEngine, RateLimiter};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. All fields are
/// cheap to clone; there are no process-wide globals, so tests can
/// build as many independent states as they need.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Session store (PostgreSQL or in-memory).
    pub store: Arc<dyn SessionStore>,
    /// Credential sealer.
    pub sealer: Arc<TokenSealer>,
    /// Realtime fan-out hub.
    pub hub: Arc<GateHub>,
    /// Occupancy calculator.
    pub occupancy: Occupancy,
    /// Queue promotion engine.
    pub promotion: PromotionEngine,
    /// Check-in rate limiter.
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wire up a state from its parts.
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn SessionStore>,
        sealer: Arc<TokenSealer>,
        hub: Arc<GateHub>,
    ) -> Self {
        let occupancy = Occupancy::new(store.clone(), config.gate.clone());
        let promotion = PromotionEngine::new(store.clone(), config.gate.clone());
        let rate_limiter = Arc::new(RateLimiter::new(
            config.gate.rate_limit_window_ms,
            config.gate.rate_limit_max_requests,
        ));
        Self {
            config,
            store,
            sealer,
            hub,
            occupancy,
            promotion,
            rate_limiter,
        }
    }
}
