// crates/warden-core/src/core/manifest.rs
// ============================================================================
// Module: Warden Action Manifest
// Description: Signed provenance record for one governed tool action.
// Purpose: Define the manifest shape stored and verified by the runtime.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A manifest binds an action descriptor to a signing time and a keyed-hash
//! signature. The signature doubles as the manifest identity, which makes the
//! store a content-addressed map. Manifests are immutable after creation:
//! there is no update path, only create and read.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::action::ActionDescriptor;
use crate::core::identifiers::ManifestId;

// ============================================================================
// SECTION: Action Manifest
// ============================================================================

/// Signed record of a tool action, used as an audit/provenance artifact.
///
/// # Invariants
/// - `signature == digest(action, timestamp, signing_key)` must hold for a
///   manifest to verify; this is re-checked, never trusted, at verify time.
/// - `signing_key_hint` is a short non-secret key prefix for correlation and
///   carries no verification weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionManifest {
    /// Action this manifest attests to.
    pub action: ActionDescriptor,
    /// Signing time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Keyed-hash signature; also the manifest's storage identity.
    pub signature: ManifestId,
    /// Non-secret prefix of the signing key.
    pub signing_key_hint: String,
}

// ============================================================================
// SECTION: Verified Manifest
// ============================================================================

/// Manifest augmented with the outcome of signature re-derivation.
///
/// # Invariants
/// - `verified == false` is a valid, reportable outcome distinct from
///   "manifest not found"; it is never surfaced as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedManifest {
    /// The stored manifest as read back from the store.
    pub manifest: ActionManifest,
    /// True when the recomputed digest matches the recorded signature.
    pub verified: bool,
}
