// crates/warden-core/src/runtime/fs_store.rs
// ============================================================================
// Module: Filesystem Manifest Store
// Description: One-file-per-manifest persistence keyed by signature.
// Purpose: Provide a durable content-addressed store for signed manifests.
// Dependencies: serde_json, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Each manifest is persisted as `{signature}.json` under a configured root
//! directory, body canonical JSON. Writes accept only lowercase-hex
//! identities so the storage key is always a safe file name; reads treat any
//! other identity as absent, since no write could have produced it. The root
//! is created on construction when absent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::core::hashing::canonical_json_bytes;
use crate::core::identifiers::ManifestId;
use crate::core::manifest::ActionManifest;
use crate::interfaces::ManifestStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted manifest identity length in characters.
const MAX_MANIFEST_ID_LENGTH: usize = 128;

// ============================================================================
// SECTION: Filesystem Store
// ============================================================================

/// Filesystem-backed manifest store.
///
/// # Invariants
/// - One file per manifest, named `{signature}.json`.
/// - Writes are last-write-wins; colliding keys carry identical content
///   because the identity hashes full content plus timestamp.
#[derive(Debug, Clone)]
pub struct FsManifestStore {
    /// Root directory holding manifest files.
    root: PathBuf,
}

impl FsManifestStore {
    /// Creates a store rooted at `root`, creating the directory when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the root cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|err| StoreError::Io(format!("create store root: {err}")))?;
        Ok(Self {
            root,
        })
    }

    /// Returns the file path for a manifest identity.
    fn manifest_path(&self, id: &ManifestId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }
}

impl ManifestStore for FsManifestStore {
    fn write(&self, id: &ManifestId, manifest: &ActionManifest) -> Result<(), StoreError> {
        if !is_storable_id(id) {
            return Err(StoreError::InvalidId(
                "identity must be a lowercase hex digest".to_string(),
            ));
        }
        let bytes = canonical_json_bytes(manifest)
            .map_err(|err| StoreError::Io(format!("encode manifest: {err}")))?;
        fs::write(self.manifest_path(id), bytes)
            .map_err(|err| StoreError::Io(format!("write manifest: {err}")))
    }

    fn read(&self, id: &ManifestId) -> Result<ActionManifest, StoreError> {
        if !is_storable_id(id) {
            // Writes only ever produce lowercase-hex identities, so nothing
            // can exist under any other name; report absence without
            // touching the filesystem.
            return Err(StoreError::NotFound(id.clone()));
        }
        let bytes = fs::read(self.manifest_path(id)).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound(id.clone())
            } else {
                StoreError::Io(format!("read manifest: {err}"))
            }
        })?;
        serde_json::from_slice(&bytes)
            .map_err(|err| StoreError::Corrupt(format!("decode manifest {id}: {err}")))
    }
}

// ============================================================================
// SECTION: Identity Validation
// ============================================================================

/// Returns true when the identity is a plain lowercase-hex digest usable as
/// a file name.
fn is_storable_id(id: &ManifestId) -> bool {
    let value = id.as_str();
    !value.is_empty()
        && value.len() <= MAX_MANIFEST_ID_LENGTH
        && value.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
