//! Sealed-credential payload value types.

use serde::{Deserialize, Serialize};

/// The plaintext payload carried inside a sealed credential.
///
/// This exists only in memory on either end of the seal; the server
/// stores a hash of `nonce` and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Random secret; its SHA-256 hash keys the session record.
    pub nonce: String,
    /// Issue time, unix milliseconds.
    pub iat: i64,
    /// Expiry time, unix milliseconds. Enforced inside the seal.
    pub exp: i64,
    /// SHA-256 hash of the client IP the credential is bound to.
    pub ip_hash: String,
}

impl TokenPayload {
    /// Whether the payload has expired at the given unix-millisecond time.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.exp < now_ms
    }
}
