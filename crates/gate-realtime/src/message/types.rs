//! Wire message type definitions for the gate WebSocket protocol.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Identify this connection with a session token hash. The hash is
    /// treated as an opaque routing key; the hub never unseals
    /// credentials.
    Hello {
        /// Token hash returned at check-in.
        token: String,
    },
    /// Pong response to a server ping.
    Pong {
        /// Nonce echoed from the ping.
        nonce: String,
    },
    /// Subscribe to broadcast topics.
    Subscribe {
        /// Topic names, e.g. `occupancy`.
        topics: Vec<String>,
    },
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection accepted.
    Accept {
        /// Assigned connection ID.
        conn_id: Uuid,
        /// How often the client should send HTTP heartbeats.
        heartbeat_interval_ms: u64,
    },
    /// Liveness probe; the client must echo the nonce back.
    Ping {
        /// Random nonce for this ping cycle.
        nonce: String,
    },
    /// Current occupancy snapshot.
    Occupancy {
        /// Sessions currently counted as active.
        active_count: i64,
        /// Configured capacity.
        capacity: u32,
        /// Sessions waiting in the queue.
        queue_length: i64,
    },
    /// The session bound to this connection was promoted out of the
    /// queue.
    Promoted {
        /// Token hash of the promoted session.
        token_hash: String,
    },
    /// The session bound to this connection has expired.
    Expired {
        /// Human-readable reason.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_tagged_representation() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"pong","nonce":"abc"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Pong { ref nonce } if nonce == "abc"));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe","topics":["occupancy"]}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Subscribe { ref topics } if topics == &["occupancy"]));
    }

    #[test]
    fn test_unknown_client_message_is_rejected() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"type":"shutdown"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_message_serializes_with_type_tag() {
        let json = serde_json::to_value(ServerMessage::Ping {
            nonce: "xyz".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "ping");
        assert_eq!(json["nonce"], "xyz");
    }
}
