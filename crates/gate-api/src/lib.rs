//! HTTP and WebSocket API for the Atrium Gate service.

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::{ApiError, ApiErrorBody};
pub use router::build_router;
pub use state::AppState;
