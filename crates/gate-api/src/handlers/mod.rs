//! HTTP and WebSocket handlers.

pub mod gate;
pub mod health;
pub mod ws;
