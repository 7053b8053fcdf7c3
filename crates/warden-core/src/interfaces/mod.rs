// crates/warden-core/src/interfaces/mod.rs
// ============================================================================
// Module: Warden Interfaces
// Description: Backend-agnostic persistence contract for action manifests.
// Purpose: Define the store surface used by the signer and verifier.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The manifest store is content-addressed: a manifest is written under its
//! own signature. Implementations must fail closed on missing or corrupt
//! data and must support concurrent writers with last-write-wins semantics;
//! a legitimate re-write of the same identity carries identical content, so
//! overwrites are indistinguishable from no-ops.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::identifiers::ManifestId;
use crate::core::manifest::ActionManifest;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Manifest store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No manifest exists under the requested identity.
    #[error("manifest not found: {0}")]
    NotFound(ManifestId),
    /// Identity is not usable as a storage key.
    #[error("invalid manifest id: {0}")]
    InvalidId(String),
    /// Store I/O failure.
    #[error("manifest store io error: {0}")]
    Io(String),
    /// Stored data failed to decode.
    #[error("manifest store corruption: {0}")]
    Corrupt(String),
}

// ============================================================================
// SECTION: Manifest Store
// ============================================================================

/// Content-addressed persistence for signed manifests.
pub trait ManifestStore {
    /// Stores a manifest under the given identity. Overwriting an existing
    /// key is allowed; last write wins.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the identity is invalid or the write fails.
    fn write(&self, id: &ManifestId, manifest: &ActionManifest) -> Result<(), StoreError>;

    /// Reads the manifest stored under the given identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no manifest exists under `id`,
    /// and other [`StoreError`] variants on I/O or decode failure.
    fn read(&self, id: &ManifestId) -> Result<ActionManifest, StoreError>;
}

/// Shared handle to a manifest store.
///
/// Verifiers may serve requests from any store instance as long as it shares
/// the same keyed-hash secret; callers must not assume read-your-write is the
/// only path.
pub type SharedManifestStore = Arc<dyn ManifestStore + Send + Sync>;
