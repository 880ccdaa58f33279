//! Sealed gate credentials.
//!
//! A credential is a JSON payload encrypted with XChaCha20-Poly1305
//! under a key derived from the configured secret, with a random
//! 24-byte nonce prepended to the ciphertext and the whole thing
//! base64-encoded. The payload's secret nonce never leaves the server
//! unhashed; the store only ever sees its SHA-256.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chacha20poly1305::aead::generic_array::GenericArray;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::XChaCha20Poly1305;
use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

use gate_core::error::AppError;
use gate_core::result::AppResult;
use gate_entity::TokenPayload;

use crate::hashing::hash_nonce;

/// Minimum length of the configured sealing secret.
const MIN_SECRET_LEN: usize = 32;

/// AEAD nonce length for XChaCha20-Poly1305.
const NONCE_LEN: usize = 24;

/// A freshly minted credential and the hash used to index its session.
#[derive(Debug, Clone)]
pub struct MintedCredential {
    /// Opaque sealed credential handed to the client.
    pub credential: String,
    /// SHA-256 of the payload nonce, stored with the session.
    pub token_hash: String,
}

/// Mints and verifies sealed gate credentials.
#[derive(Clone)]
pub struct TokenSealer {
    key: [u8; 32],
    ttl_ms: i64,
}

impl TokenSealer {
    /// Build a sealer from the configured secret and credential TTL.
    pub fn new(secret: &str, ttl_ms: i64) -> AppResult<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(AppError::configuration(format!(
                "Seal secret must be at least {MIN_SECRET_LEN} characters"
            )));
        }
        let key: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        Ok(Self { key, ttl_ms })
    }

    /// Mint a credential bound to the given client IP hash.
    pub fn mint(&self, ip_hash: &str, now: DateTime<Utc>) -> AppResult<MintedCredential> {
        let mut nonce_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = URL_SAFE_NO_PAD.encode(nonce_bytes);

        let iat = now.timestamp_millis();
        let payload = TokenPayload {
            nonce: nonce.clone(),
            iat,
            exp: iat + self.ttl_ms,
            ip_hash: ip_hash.to_string(),
        };

        let plaintext = serde_json::to_vec(&payload)?;
        let sealed = self.encrypt(&plaintext)?;

        Ok(MintedCredential {
            credential: URL_SAFE_NO_PAD.encode(sealed),
            token_hash: hash_nonce(&nonce),
        })
    }

    /// Decrypt and parse a credential. Any malformed, tampered, or
    /// wrongly keyed input yields `None`.
    pub fn unseal(&self, credential: &str) -> Option<TokenPayload> {
        let data = URL_SAFE_NO_PAD.decode(credential).ok()?;
        if data.len() < NONCE_LEN {
            return None;
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .ok()?;
        serde_json::from_slice(&plaintext).ok()
    }

    /// Unseal a credential and enforce expiry and IP binding.
    pub fn verify(
        &self,
        credential: &str,
        ip_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<TokenPayload> {
        let payload = self
            .unseal(credential)
            .ok_or_else(|| AppError::authentication("Invalid gate credential"))?;

        if payload.is_expired(now.timestamp_millis()) {
            return Err(AppError::authentication("Gate credential has expired"));
        }
        if payload.ip_hash != ip_hash {
            return Err(AppError::authentication(
                "Gate credential was issued to a different client",
            ));
        }
        Ok(payload)
    }

    fn encrypt(&self, plaintext: &[u8]) -> AppResult<Vec<u8>> {
        let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(&self.key));

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(GenericArray::from_slice(&nonce), plaintext)
            .map_err(|e| AppError::internal(format!("Credential sealing failed: {e}")))?;

        let mut result = nonce.to_vec();
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &str = "unit-test-secret-with-enough-length!";

    fn sealer(ttl_ms: i64) -> TokenSealer {
        TokenSealer::new(SECRET, ttl_ms).unwrap()
    }

    #[test]
    fn test_new_rejects_short_secret() {
        assert!(TokenSealer::new("too-short", 1_000).is_err());
    }

    #[test]
    fn test_mint_verify_roundtrip() {
        let sealer = sealer(7_200_000);
        let now = Utc::now();
        let minted = sealer.mint("ip-hash", now).unwrap();

        let payload = sealer.verify(&minted.credential, "ip-hash", now).unwrap();
        assert_eq!(payload.ip_hash, "ip-hash");
        assert_eq!(hash_nonce(&payload.nonce), minted.token_hash);
        assert_eq!(payload.exp - payload.iat, 7_200_000);
    }

    #[test]
    fn test_verify_rejects_expired_credential() {
        let sealer = sealer(1_000);
        let now = Utc::now();
        let minted = sealer.mint("ip-hash", now).unwrap();

        let later = now + Duration::seconds(2);
        let err = sealer.verify(&minted.credential, "ip-hash", later).unwrap_err();
        assert_eq!(err.kind, gate_core::ErrorKind::Authentication);
    }

    #[test]
    fn test_verify_rejects_ip_mismatch() {
        let sealer = sealer(7_200_000);
        let now = Utc::now();
        let minted = sealer.mint("ip-hash", now).unwrap();

        let err = sealer.verify(&minted.credential, "other-ip", now).unwrap_err();
        assert_eq!(err.kind, gate_core::ErrorKind::Authentication);
    }

    #[test]
    fn test_unseal_rejects_tampered_credential() {
        let sealer = sealer(7_200_000);
        let minted = sealer.mint("ip-hash", Utc::now()).unwrap();

        let mut tampered = minted.credential.into_bytes();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();

        assert!(sealer.unseal(&tampered).is_none());
        assert!(sealer.unseal("not-base64!!").is_none());
        assert!(sealer.unseal("").is_none());
    }

    #[test]
    fn test_unseal_requires_matching_secret() {
        let a = sealer(7_200_000);
        let b = TokenSealer::new("a-completely-different-secret-value!", 7_200_000).unwrap();
        let minted = a.mint("ip-hash", Utc::now()).unwrap();
        assert!(b.unseal(&minted.credential).is_none());
    }
}
