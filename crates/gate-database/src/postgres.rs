//! PostgreSQL-backed session store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gate_core::error::{AppError, ErrorKind};
use gate_core::result::AppResult;
use gate_entity::{GateSession, NewGateSession, NewVisitor, SessionStatus};

use crate::store::SessionStore;

/// Advisory lock key serializing capacity decisions (admission and
/// promotion). Under READ COMMITTED, concurrent statements would each
/// count occupancy from a snapshot that excludes the other's
/// uncommitted writes and together push ACTIVE past capacity; taking
/// this transaction-scoped lock first makes the count-and-write pairs
/// run one at a time.
const CAPACITY_LOCK_KEY: i64 = 0x6761_7465;

/// Session store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn create(&self, data: NewGateSession) -> AppResult<GateSession> {
        sqlx::query_as::<_, GateSession>(
            "INSERT INTO gate_sessions \
             (display_name, email, purpose, status, token_hash, ip_hash, queued_at, entered_at, last_seen_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING *",
        )
        .bind(&data.display_name)
        .bind(&data.email)
        .bind(data.purpose)
        .bind(data.status)
        .bind(&data.token_hash)
        .bind(&data.ip_hash)
        .bind(data.queued_at)
        .bind(data.entered_at)
        .bind(data.last_seen_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::conflict("A session with this credential already exists")
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create session", e),
        })
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> AppResult<Option<GateSession>> {
        sqlx::query_as::<_, GateSession>("SELECT * FROM gate_sessions WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find session by token", e)
            })
    }

    async fn touch(&self, token_hash: &str, now: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE gate_sessions SET last_seen_at = $2 \
             WHERE token_hash = $1 AND status IN ('ACTIVE', 'QUEUED')",
        )
        .bind(token_hash)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to touch session", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_exited(&self, token_hash: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE gate_sessions SET status = 'EXITED' \
             WHERE token_hash = $1 AND status IN ('ACTIVE', 'QUEUED')",
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark session exited", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn expire_stale(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE gate_sessions SET status = 'EXPIRED' \
             WHERE status IN ('ACTIVE', 'QUEUED') AND last_seen_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to expire sessions", e))?;
        Ok(result.rows_affected())
    }

    async fn count_active(&self, cutoff: DateTime<Utc>) -> AppResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM gate_sessions WHERE status = 'ACTIVE' AND last_seen_at >= $1",
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count active sessions", e))
    }

    async fn count_queued(&self) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM gate_sessions WHERE status = 'QUEUED'")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count queued sessions", e)
            })
    }

    async fn queue_position(&self, session_id: Uuid) -> AppResult<Option<i64>> {
        let row: Option<(SessionStatus, Option<DateTime<Utc>>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT status, queued_at, created_at FROM gate_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to look up session", e))?;

        let Some((status, queued_at, created_at)) = row else {
            return Ok(None);
        };
        if status != SessionStatus::Queued {
            return Ok(None);
        }
        let queued_at = queued_at.unwrap_or(created_at);

        let ahead: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM gate_sessions \
             WHERE status = 'QUEUED' AND (queued_at, created_at) < ($1, $2)",
        )
        .bind(queued_at)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to compute queue position", e)
        })?;

        Ok(Some(ahead + 1))
    }

    async fn admit_or_queue(
        &self,
        visitor: NewVisitor,
        capacity: u32,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<GateSession> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(CAPACITY_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to take capacity lock", e)
            })?;

        let session = sqlx::query_as::<_, GateSession>(
            "INSERT INTO gate_sessions \
             (display_name, email, purpose, status, token_hash, ip_hash, queued_at, entered_at, last_seen_at) \
             SELECT $1, $2, $3, \
                    CASE WHEN occ.active < $4 THEN 'ACTIVE'::gate_session_status \
                         ELSE 'QUEUED'::gate_session_status END, \
                    $5, $6, \
                    CASE WHEN occ.active < $4 THEN NULL ELSE $7 END, \
                    CASE WHEN occ.active < $4 THEN $7 ELSE NULL END, \
                    $7 \
             FROM ( \
                 SELECT COUNT(*) AS active FROM gate_sessions \
                 WHERE status = 'ACTIVE' AND last_seen_at >= $8 \
             ) occ \
             RETURNING *",
        )
        .bind(&visitor.display_name)
        .bind(&visitor.email)
        .bind(visitor.purpose)
        .bind(i64::from(capacity))
        .bind(&visitor.token_hash)
        .bind(&visitor.ip_hash)
        .bind(now)
        .bind(cutoff)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::conflict("A session with this credential already exists")
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create session", e),
        })?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit admission", e)
        })?;
        Ok(session)
    }

    async fn claim_queued(
        &self,
        capacity: u32,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<String>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(CAPACITY_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to take capacity lock", e)
            })?;

        let promoted: Vec<(String,)> = sqlx::query_as(
            "WITH free AS ( \
                 SELECT GREATEST($1 - COUNT(*), 0) AS slots \
                 FROM gate_sessions \
                 WHERE status = 'ACTIVE' AND last_seen_at >= $2 \
             ), \
             candidates AS ( \
                 SELECT id FROM gate_sessions \
                 WHERE status = 'QUEUED' \
                 ORDER BY queued_at ASC, created_at ASC \
                 LIMIT (SELECT slots FROM free) \
                 FOR UPDATE \
             ) \
             UPDATE gate_sessions s \
             SET status = 'ACTIVE', entered_at = $3, last_seen_at = $3 \
             FROM candidates c \
             WHERE s.id = c.id \
             RETURNING s.token_hash",
        )
        .bind(i64::from(capacity))
        .bind(cutoff)
        .bind(now)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to promote queued sessions", e)
        })?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit promotion", e)
        })?;

        Ok(promoted.into_iter().map(|(hash,)| hash).collect())
    }

    async fn purge_terminal(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM gate_sessions \
             WHERE status IN ('EXPIRED', 'EXITED') AND last_seen_at < $1",
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to purge terminal sessions", e)
        })?;
        Ok(result.rows_affected())
    }
}
