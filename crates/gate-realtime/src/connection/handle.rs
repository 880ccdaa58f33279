//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::message::Envelope;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// A handle to a single WebSocket connection.
///
/// Holds the sender channel for pushing frames to the client plus the
/// liveness state driven by the ping/pong cycle. The socket I/O tasks
/// live in the API layer; the hub only ever sees handles.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Sender for outbound frames.
    pub sender: mpsc::Sender<Envelope>,
    /// Token hash this connection identified with, once `hello` arrives.
    pub token_hash: RwLock<Option<String>>,
    /// Topics this connection is subscribed to.
    pub subscriptions: RwLock<Vec<String>>,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Last valid pong received.
    pub last_pong: RwLock<DateTime<Utc>>,
    /// Nonce of the outstanding ping, if any. Cleared by a matching pong.
    pub ping_nonce: RwLock<Option<String>>,
    /// When the outstanding ping was sent.
    pub ping_sent_at: RwLock<DateTime<Utc>>,
    /// Consecutive ping cycles that went unanswered.
    pub missed_pings: AtomicU32,
    /// Whether the connection is still alive.
    pub alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new connection handle.
    pub fn new(sender: mpsc::Sender<Envelope>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            sender,
            token_hash: RwLock::new(None),
            subscriptions: RwLock::new(Vec::new()),
            connected_at: now,
            last_pong: RwLock::new(now),
            ping_nonce: RwLock::new(None),
            ping_sent_at: RwLock::new(now),
            missed_pings: AtomicU32::new(0),
            alive: AtomicBool::new(true),
        }
    }

    /// Push a frame to this connection. A full buffer drops the frame;
    /// a closed channel marks the connection dead.
    pub fn send(&self, frame: Envelope) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(frame) {
            Ok(_) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Connection {} send buffer full, dropping frame", self.id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check whether the connection is alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark the connection as dead.
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Bind the connection to a session token hash.
    pub async fn bind_token(&self, token_hash: String) {
        let mut th = self.token_hash.write().await;
        *th = Some(token_hash);
    }

    /// Whether this connection is bound to the given token hash.
    pub async fn is_bound_to(&self, token_hash: &str) -> bool {
        self.token_hash
            .read()
            .await
            .as_deref()
            .is_some_and(|t| t == token_hash)
    }

    /// Record a pong. Only a pong echoing the outstanding nonce counts;
    /// a valid pong clears the outstanding ping and the missed counter.
    pub async fn record_pong(&self, nonce: &str, now: DateTime<Utc>) -> bool {
        let mut expected = self.ping_nonce.write().await;
        if expected.as_deref() != Some(nonce) {
            return false;
        }
        *expected = None;
        drop(expected);

        let mut lp = self.last_pong.write().await;
        *lp = now;
        self.missed_pings.store(0, Ordering::SeqCst);
        true
    }

    /// Stamp a fresh ping nonce for the next cycle.
    pub async fn set_ping_nonce(&self, nonce: String, now: DateTime<Utc>) {
        let mut pn = self.ping_nonce.write().await;
        *pn = Some(nonce);
        let mut sent = self.ping_sent_at.write().await;
        *sent = now;
    }

    /// Whether a ping is outstanding and has gone unanswered past the
    /// grace period.
    pub async fn ping_overdue(&self, now: DateTime<Utc>, grace: chrono::Duration) -> bool {
        if self.ping_nonce.read().await.is_none() {
            return false;
        }
        now - *self.ping_sent_at.read().await >= grace
    }

    /// Count a sweep that found the previous ping unanswered. Returns
    /// the consecutive missed total.
    pub fn note_missed_ping(&self) -> u32 {
        self.missed_pings.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Add a subscription. Returns false if already subscribed.
    pub async fn subscribe(&self, topic: &str) -> bool {
        let mut subs = self.subscriptions.write().await;
        if subs.iter().any(|s| s == topic) {
            return false;
        }
        subs.push(topic.to_string());
        true
    }

    /// Check whether this connection is subscribed to a topic.
    pub async fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.read().await.iter().any(|s| s == topic)
    }
}
