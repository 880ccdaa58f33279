//! WebSocket wire messages.

pub mod envelope;
pub mod types;

pub use envelope::{parse_client_message, Envelope};
pub use types::{ClientMessage, ServerMessage};
