//! The gate hub: fan-out of occupancy and promotion events to live
//! WebSocket connections.
//!
//! The hub holds no session truth. It routes frames by token hash and
//! topic, and enforces liveness through the ping/pong cycle. All
//! session-state decisions happen in the service layer.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use gate_core::config::RealtimeConfig;

use crate::connection::{ConnectionHandle, ConnectionId, ConnectionRegistry};
use crate::message::{ClientMessage, Envelope, ServerMessage};

/// Topic for occupancy broadcasts.
pub const TOPIC_OCCUPANCY: &str = "occupancy";
/// Topic for promotion broadcasts.
pub const TOPIC_PROMOTION: &str = "promotion";

const PING_NONCE_LEN: usize = 8;

/// Consecutive unanswered ping cycles before a connection is dropped.
const MAX_MISSED_PINGS: u32 = 2;

/// Central fan-out hub for gate realtime updates.
pub struct GateHub {
    registry: ConnectionRegistry,
    config: RealtimeConfig,
}

impl GateHub {
    pub fn new(config: RealtimeConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            config,
        }
    }

    /// Register a new connection. Sends the `accept` frame and returns
    /// the handle together with the receiver half the socket writer
    /// drains.
    pub fn register(&self) -> (Arc<ConnectionHandle>, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(tx));
        self.registry.insert(handle.clone());

        handle.send(Envelope::new(ServerMessage::Accept {
            conn_id: handle.id,
            heartbeat_interval_ms: self.config.ping_interval_ms,
        }));

        debug!(conn_id = %handle.id, "WebSocket connection registered");
        (handle, rx)
    }

    /// Drop a connection from the registry.
    pub fn unregister(&self, id: ConnectionId) {
        if let Some(handle) = self.registry.remove(id) {
            handle.mark_dead();
            debug!(conn_id = %id, "WebSocket connection unregistered");
        }
    }

    /// Process one inbound message from a connection.
    pub async fn handle_inbound(&self, handle: &ConnectionHandle, msg: ClientMessage) {
        match msg {
            ClientMessage::Hello { token } => {
                handle.bind_token(token).await;
                handle.subscribe(TOPIC_OCCUPANCY).await;
                handle.subscribe(TOPIC_PROMOTION).await;
            }
            ClientMessage::Pong { nonce } => {
                handle.record_pong(&nonce, Utc::now()).await;
            }
            ClientMessage::Subscribe { topics } => {
                for topic in &topics {
                    handle.subscribe(topic).await;
                }
            }
        }
    }

    /// Push a frame to one connection.
    pub fn send_to(&self, handle: &ConnectionHandle, msg: ServerMessage) {
        handle.send(Envelope::new(msg));
    }

    /// One ping cycle. A connection whose previous ping went unanswered
    /// past the pong timeout counts a missed cycle; two consecutive
    /// misses terminate it. Everything still live gets a fresh nonce.
    pub async fn ping_sweep(&self, now: DateTime<Utc>) {
        let grace = chrono::Duration::milliseconds(self.config.pong_timeout_ms as i64);

        for handle in self.registry.all() {
            if !handle.is_alive() {
                self.registry.remove(handle.id);
                continue;
            }

            if handle.ping_overdue(now, grace).await
                && handle.note_missed_ping() >= MAX_MISSED_PINGS
            {
                info!(conn_id = %handle.id, "Terminating unresponsive WebSocket connection");
                handle.mark_dead();
                self.registry.remove(handle.id);
                continue;
            }

            let nonce: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(PING_NONCE_LEN)
                .map(char::from)
                .collect();
            handle.set_ping_nonce(nonce.clone(), now).await;
            handle.send(Envelope::new(ServerMessage::Ping { nonce }));
        }
    }

    /// Broadcast the current occupancy snapshot to subscribers.
    pub async fn broadcast_occupancy(&self, active_count: i64, capacity: u32, queue_length: i64) {
        let msg = ServerMessage::Occupancy {
            active_count,
            capacity,
            queue_length,
        };
        for handle in self.registry.all() {
            if handle.is_subscribed(TOPIC_OCCUPANCY).await {
                handle.send(Envelope::new(msg.clone()));
            }
        }
    }

    /// Notify connections bound to the given token hashes that their
    /// session left the queue.
    pub async fn notify_promoted(&self, token_hashes: &[String]) {
        if token_hashes.is_empty() {
            return;
        }
        for handle in self.registry.all() {
            let bound = handle.token_hash.read().await.clone();
            if let Some(hash) = bound {
                if token_hashes.contains(&hash) {
                    handle.send(Envelope::new(ServerMessage::Promoted { token_hash: hash }));
                }
            }
        }
    }

    /// Notify the connection bound to a token hash that its session
    /// expired.
    pub async fn notify_expired(&self, token_hash: &str, reason: &str) {
        for handle in self.registry.all() {
            if handle.is_bound_to(token_hash).await {
                handle.send(Envelope::new(ServerMessage::Expired {
                    reason: reason.to_string(),
                }));
            }
        }
    }

    /// Number of live registered connections.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }
}

/// Drive [`GateHub::ping_sweep`] on the configured interval until
/// shutdown is signalled.
pub async fn run_ping_loop(hub: Arc<GateHub>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(Duration::from_millis(hub.config.ping_interval_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                hub.ping_sweep(Utc::now()).await;
            }
            _ = shutdown.changed() => {
                info!("Ping loop shutting down");
                break;
            }
        }
    }
}
