//! Message envelope for framing WebSocket messages.

use serde::{Deserialize, Serialize};

use super::types::{ClientMessage, ServerMessage};

/// Envelope wrapping outbound messages with a server timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Unix-millisecond timestamp at send time.
    pub ts: i64,
    /// The message payload.
    pub data: ServerMessage,
}

impl Envelope {
    /// Wrap a message with the current timestamp.
    pub fn new(data: ServerMessage) -> Self {
        Self {
            ts: chrono::Utc::now().timestamp_millis(),
            data,
        }
    }
}

/// Parse an inbound frame. Clients may send either a bare tagged
/// message or an envelope with the message under `data`; anything
/// else is dropped.
pub fn parse_client_message(raw: &str) -> Option<ClientMessage> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    match value.get("data") {
        Some(data) => serde_json::from_value(data.clone()).ok(),
        None => serde_json::from_value(value).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_message() {
        let msg = parse_client_message(r#"{"type":"hello","token":"abc"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Hello { ref token } if token == "abc"));
    }

    #[test]
    fn test_parse_enveloped_message() {
        let msg =
            parse_client_message(r#"{"ts":123,"data":{"type":"pong","nonce":"n1"}}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Pong { ref nonce } if nonce == "n1"));
    }

    #[test]
    fn test_parse_garbage_returns_none() {
        assert!(parse_client_message("not json").is_none());
        assert!(parse_client_message(r#"{"type":"unknown"}"#).is_none());
        assert!(parse_client_message(r#"{"ts":1,"data":{"type":"unknown"}}"#).is_none());
    }
}
