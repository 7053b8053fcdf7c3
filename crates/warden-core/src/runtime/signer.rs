// crates/warden-core/src/runtime/signer.rs
// ============================================================================
// Module: Manifest Signer
// Description: Deterministic manifest construction and integrity stamping.
// Purpose: Turn action descriptors into signed, stored provenance manifests.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Signing canonicalizes the action, appends the timestamp and the shared
//! key, and takes a SHA-256 digest; the hex digest is both the signature and
//! the storage identity. Signing the same canonical action content within
//! the same millisecond yields the same identity and silently overwrites the
//! stored manifest. That idempotence is scoped to "same millisecond" and is
//! a stated product decision, not accidental behavior.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::action::ActionDescriptor;
use crate::core::hashing::HashError;
use crate::core::hashing::canonical_json_bytes;
use crate::core::hashing::sha256_hex;
use crate::core::identifiers::ManifestId;
use crate::core::key::SigningKey;
use crate::core::manifest::ActionManifest;
use crate::core::time::unix_millis_now;
use crate::interfaces::SharedManifestStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while signing an action.
#[derive(Debug, Error)]
pub enum SignError {
    /// Action payload failed to canonicalize.
    #[error("sign canonicalization failed: {0}")]
    Canonicalize(#[from] HashError),
    /// Manifest store rejected the write.
    #[error("sign storage failed: {0}")]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Signature Computation
// ============================================================================

/// Computes the keyed signature digest for an action at a signing time.
///
/// The digest covers `canonical(action) || "|" || timestamp || "|" || key`,
/// so identical structured input always yields identical identities. Both
/// the signer and the verifier call this one routine.
///
/// # Errors
///
/// Returns [`HashError`] when the action fails to canonicalize.
pub fn compute_signature(
    action: &ActionDescriptor,
    timestamp: i64,
    key: &SigningKey,
) -> Result<ManifestId, HashError> {
    let mut payload = canonical_json_bytes(action)?;
    payload.push(b'|');
    payload.extend_from_slice(timestamp.to_string().as_bytes());
    payload.push(b'|');
    payload.extend_from_slice(key.as_bytes());
    Ok(ManifestId::new(sha256_hex(&payload)))
}

// ============================================================================
// SECTION: Manifest Signer
// ============================================================================

/// Builds, signs, and persists action manifests.
///
/// # Invariants
/// - The signing key is held in memory only; output carries only the short
///   non-secret hint prefix.
/// - One store write per signing call.
pub struct ManifestSigner {
    /// Shared secret used for digest computation.
    key: SigningKey,
    /// Store receiving signed manifests.
    store: SharedManifestStore,
}

impl ManifestSigner {
    /// Creates a signer over the given key and store.
    #[must_use]
    pub fn new(key: SigningKey, store: SharedManifestStore) -> Self {
        Self {
            key,
            store,
        }
    }

    /// Signs an action at the current wall-clock time.
    ///
    /// # Errors
    ///
    /// Returns [`SignError`] when canonicalization or the store write fails.
    pub fn sign_action(&self, action: &ActionDescriptor) -> Result<ActionManifest, SignError> {
        self.sign_action_at(action, unix_millis_now())
    }

    /// Signs an action at an explicit millisecond timestamp.
    ///
    /// Re-signing identical content at the same timestamp reproduces the same
    /// signature and overwrites the stored manifest in place.
    ///
    /// # Errors
    ///
    /// Returns [`SignError`] when canonicalization or the store write fails.
    pub fn sign_action_at(
        &self,
        action: &ActionDescriptor,
        timestamp: i64,
    ) -> Result<ActionManifest, SignError> {
        let signature = compute_signature(action, timestamp, &self.key)?;
        let manifest = ActionManifest {
            action: action.clone(),
            timestamp,
            signature: signature.clone(),
            signing_key_hint: self.key.hint(),
        };
        self.store.write(&signature, &manifest)?;
        Ok(manifest)
    }
}
