// crates/warden-core/src/core/hashing.rs
// ============================================================================
// Module: Warden Canonical Hashing
// Description: RFC 8785 JSON canonicalization and SHA-256 hex digests.
// Purpose: Provide the deterministic bytes and digests behind manifest identities.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Manifest identities are SHA-256 digests over canonical JSON. Warden uses
//! exactly one scheme: RFC 8785 (JCS) canonical bytes hashed with SHA-256
//! and rendered as lowercase hex. Canonicalization makes the digest
//! independent of object key order, which is what keeps re-signing the same
//! structured content idempotent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when canonicalizing values for hashing.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Canonicalization
// ============================================================================

/// Returns canonical JSON bytes for a serializable value using RFC 8785.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

// ============================================================================
// SECTION: Digests
// ============================================================================

/// Hashes raw bytes with SHA-256 and returns the lowercase hex digest.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
