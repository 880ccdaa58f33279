//! Realtime WebSocket layer for the Atrium Gate service.
//!
//! Connections register with the [`GateHub`], identify themselves with
//! a token hash, and receive occupancy, promotion, and expiry frames.

pub mod connection;
pub mod hub;
pub mod message;

pub use connection::{ConnectionHandle, ConnectionId, ConnectionRegistry};
pub use hub::{run_ping_loop, GateHub, TOPIC_OCCUPANCY, TOPIC_PROMOTION};
pub use message::{parse_client_message, ClientMessage, Envelope, ServerMessage};
