// crates/warden-core/src/core/key.rs
// ============================================================================
// Module: Warden Signing Key
// Description: In-memory wrapper for the shared manifest signing secret.
// Purpose: Keep the key out of logs, debug output, and serialized records.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Manifest signing uses a symmetric keyed hash, so the key is the whole
//! integrity guarantee. This wrapper keeps the secret in memory only: it has
//! no serde implementations, its `Debug` output is redacted, and the only
//! value that may leave the process is the short non-secret hint prefix used
//! for human-debugging correlation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of leading key characters exposed as the non-secret hint.
pub const KEY_HINT_LENGTH: usize = 8;

// ============================================================================
// SECTION: Signing Key
// ============================================================================

/// Shared secret used to sign and verify action manifests.
///
/// # Invariants
/// - The key material is never serialized or logged.
/// - [`SigningKey::hint`] is a prefix and must never be treated as sufficient
///   for verification or key recovery.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(String);

impl SigningKey {
    /// Creates a signing key from secret material.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the key material as bytes for digest computation.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Returns the short non-secret hint prefix of the key.
    #[must_use]
    pub fn hint(&self) -> String {
        self.0.chars().take(KEY_HINT_LENGTH).collect()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(redacted)")
    }
}
