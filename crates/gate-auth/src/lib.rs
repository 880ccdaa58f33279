//! Credential sealing and hashing for the Atrium Gate service.

pub mod hashing;
pub mod sealer;

pub use hashing::{hash_ip, hash_nonce, sha256_hex};
pub use sealer::{MintedCredential, TokenSealer};
