// crates/warden-core/src/runtime/verifier.rs
// ============================================================================
// Module: Manifest Verifier
// Description: Independent re-derivation of manifest integrity.
// Purpose: Confirm stored signatures without trusting the stored value.
// Dependencies: subtle, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Verification reads a manifest back from the store, recomputes the digest
//! from the stored action and timestamp with the verifier's configured key,
//! and compares against the recorded signature in constant time. This is a
//! symmetric shared-secret scheme: it proves "signed by a holder of this
//! key", not author-specific non-repudiation, and the verifier must share
//! the signer's key for the result to be meaningful.

// ============================================================================
// SECTION: Imports
// ============================================================================

use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::core::hashing::HashError;
use crate::core::identifiers::ManifestId;
use crate::core::key::SigningKey;
use crate::core::manifest::VerifiedManifest;
use crate::interfaces::SharedManifestStore;
use crate::interfaces::StoreError;
use crate::runtime::signer::compute_signature;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while verifying a manifest.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Stored action failed to canonicalize during re-derivation.
    #[error("verify canonicalization failed: {0}")]
    Canonicalize(#[from] HashError),
    /// Manifest could not be read; absence propagates, never swallowed.
    #[error("verify storage failed: {0}")]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Manifest Verifier
// ============================================================================

/// Re-derives manifest signatures from stored content.
///
/// # Invariants
/// - A signature mismatch is reported as `verified == false`, never as an
///   error; only store and canonicalization failures are errors.
pub struct ManifestVerifier {
    /// Shared secret used for digest re-derivation.
    key: SigningKey,
    /// Store serving manifest reads.
    store: SharedManifestStore,
}

impl ManifestVerifier {
    /// Creates a verifier over the given key and store.
    #[must_use]
    pub fn new(key: SigningKey, store: SharedManifestStore) -> Self {
        Self {
            key,
            store,
        }
    }

    /// Verifies the manifest stored under `manifest_id`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Store`] when the manifest is absent or the read
    /// fails, and [`VerifyError::Canonicalize`] when re-derivation fails.
    pub fn verify(&self, manifest_id: &ManifestId) -> Result<VerifiedManifest, VerifyError> {
        let manifest = self.store.read(manifest_id)?;
        let expected = compute_signature(&manifest.action, manifest.timestamp, &self.key)?;
        let verified = constant_time_eq(expected.as_str(), manifest.signature.as_str());
        Ok(VerifiedManifest {
            manifest,
            verified,
        })
    }
}

// ============================================================================
// SECTION: Constant-Time Comparison
// ============================================================================

/// Compares two digest strings in constant time.
fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
