//! Swap secrets and their SHA-256 hashlock commitments.
//!
//! SHA-256 is the hash Bitcoin and Elements HTLC scripts check with
//! `OP_SHA256`, so the same hashlock can be used on both legs.

use std::fmt;

use htlcswap_core::config::{MAX_SECRET_LEN, MIN_SECRET_LEN};
use htlcswap_core::Hashlock;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Default secret length, in bytes.
pub const DEFAULT_SECRET_LEN: usize = 32;

/// The preimage of a hashlock. Wiped from memory when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret(Vec<u8>);

impl Secret {
    /// Wrap existing bytes (e.g. a secret read back from a claim transaction).
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        hex::decode(s.trim())
            .map(Self)
            .map_err(|e| CryptoError::InvalidHex(e.to_string()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Hex encoding. Only call this when the secret is meant to be revealed.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<{} bytes redacted>)", self.0.len())
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Secret::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// Generate a fresh 32-byte secret from the OS CSPRNG.
pub fn generate_secret() -> Secret {
    let mut bytes = vec![0u8; DEFAULT_SECRET_LEN];
    OsRng.fill_bytes(&mut bytes);
    Secret(bytes)
}

/// Generate a secret of `len` bytes.
pub fn generate_secret_with_len(len: usize) -> Result<Secret, CryptoError> {
    if !(MIN_SECRET_LEN..=MAX_SECRET_LEN).contains(&len) {
        return Err(CryptoError::InvalidSecretLength {
            len,
            min: MIN_SECRET_LEN,
            max: MAX_SECRET_LEN,
        });
    }
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    Ok(Secret(bytes))
}

/// Commit to a secret: `SHA256(secret)`.
pub fn commit(secret: &Secret) -> Hashlock {
    Hashlock(Sha256::digest(secret.as_bytes()).into())
}

/// Check that `secret` opens `hashlock`. Runs in time independent of where
/// the digests first differ.
pub fn verify(secret: &Secret, hashlock: &Hashlock) -> bool {
    let candidate = commit(secret);
    let diff = candidate
        .as_bytes()
        .iter()
        .zip(hashlock.as_bytes().iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    std::hint::black_box(diff) == 0
}
