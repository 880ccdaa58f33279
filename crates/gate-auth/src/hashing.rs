//! SHA-256 hashing helpers.
//!
//! Raw credentials and client IPs are never persisted; only their
//! hashes reach the store.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of arbitrary bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        // Writing to a String cannot fail.
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Hash the credential's secret nonce for storage and lookup.
pub fn hash_nonce(nonce: &str) -> String {
    sha256_hex(nonce.as_bytes())
}

/// Hash a client IP with the deployment salt.
pub fn hash_ip(ip: &str, salt: &str) -> String {
    sha256_hex(format!("{ip}:{salt}").as_bytes())
}
