use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use gate_core::AppResult;
use gate_entity::{GateSession, NewGateSession, NewVisitor};

/// Persistence operations for gate sessions.
///
/// Backed by PostgreSQL in production and by an in-memory map in tests
/// and single-node dev setups. All timestamps are passed in by the
/// caller so services stay deterministic under test.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a session with an explicit status and timestamps. Fails
    /// with a conflict if the token hash is already present.
    async fn create(&self, data: NewGateSession) -> AppResult<GateSession>;

    /// Check a visitor in: admit as ACTIVE if the windowed active count
    /// is below `capacity`, otherwise append to the queue. The count
    /// and the insert are one atomic step, so two simultaneous
    /// check-ins cannot both take the last slot.
    async fn admit_or_queue(
        &self,
        visitor: NewVisitor,
        capacity: u32,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<GateSession>;

    /// Look up a session by the SHA-256 hash of its credential.
    async fn find_by_token_hash(&self, token_hash: &str) -> AppResult<Option<GateSession>>;

    /// Refresh `last_seen_at` for a live session. Returns false when no
    /// ACTIVE or QUEUED session matches the hash.
    async fn touch(&self, token_hash: &str, now: DateTime<Utc>) -> AppResult<bool>;

    /// Transition a session to EXITED. Terminal states are left alone.
    async fn mark_exited(&self, token_hash: &str) -> AppResult<bool>;

    /// Expire every ACTIVE or QUEUED session whose `last_seen_at` fell
    /// behind the cutoff. Returns the number of sessions expired.
    async fn expire_stale(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;

    /// Count ACTIVE sessions with a heartbeat at or after the cutoff.
    async fn count_active(&self, cutoff: DateTime<Utc>) -> AppResult<i64>;

    /// Count sessions currently waiting in the queue.
    async fn count_queued(&self) -> AppResult<i64>;

    /// 1-based FIFO position of a queued session, ordered by
    /// `queued_at` then `created_at`. None when the session is not
    /// queued.
    async fn queue_position(&self, session_id: Uuid) -> AppResult<Option<i64>>;

    /// Atomically promote the oldest queued sessions into the free
    /// capacity below `capacity`, stamping `entered_at` and
    /// `last_seen_at` with `now`. Returns the token hashes of the
    /// sessions promoted, in queue order. Concurrent callers never
    /// promote the same session twice or overshoot capacity.
    async fn claim_queued(
        &self,
        capacity: u32,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<String>>;

    /// Delete EXPIRED and EXITED sessions older than `before`.
    async fn purge_terminal(&self, before: DateTime<Utc>) -> AppResult<u64>;
}
