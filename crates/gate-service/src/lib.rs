//! Admission logic for the Atrium Gate service.

pub mod occupancy;
pub mod promotion;
pub mod rate_limit;
pub mod scheduler;

pub use occupancy::{Occupancy, OccupancySnapshot};
pub use promotion::{PromotionEngine, PromotionOutcome};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use scheduler::PromotionScheduler;
