//! Payload checksums for integrity tagging and verification.
//!
//! Digests are BLAKE3 over the exact payload bytes an artifact carries.
//! Verification recomputes and compares; a mismatch is reported as `false`,
//! never as an error.

use serde::{Deserialize, Serialize};

/// A 256-bit BLAKE3 digest, carried as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Hex representation of the digest.
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the digest of a payload. Pure function, identical bytes always
/// yield an identical digest.
pub fn compute_digest(payload: &[u8]) -> Digest {
    Digest(hex::encode(blake3::hash(payload).as_bytes()))
}

/// Recompute the payload digest and compare against the expected value.
pub fn verify_digest(payload: &[u8], expected: &Digest) -> bool {
    compute_digest(payload) == *expected
}
