// crates/warden-core/tests/provenance.rs
// ============================================================================
// Module: Provenance Tests
// Description: Round-trip, idempotence, and tamper tests for sign/verify.
// ============================================================================
//! ## Overview
//! Exercises the signer and verifier over a real filesystem store: signing
//! round-trips to `verified == true`, identical content re-signs to the same
//! identity, and any mutation of stored content flips verification to false.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;

use serde_json::json;
use warden_core::ActionDescriptor;
use warden_core::FsManifestStore;
use warden_core::ManifestId;
use warden_core::ManifestSigner;
use warden_core::ManifestVerifier;
use warden_core::SharedManifestStore;
use warden_core::SigningKey;
use warden_core::StoreError;
use warden_core::VerifyError;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Builds a signer/verifier pair over one temporary store.
fn provenance_fixture(
    dir: &tempfile::TempDir,
    key: &str,
) -> (ManifestSigner, ManifestVerifier, SharedManifestStore) {
    let store: SharedManifestStore =
        Arc::new(FsManifestStore::new(dir.path().join("manifests")).unwrap());
    let signer = ManifestSigner::new(SigningKey::new(key), Arc::clone(&store));
    let verifier = ManifestVerifier::new(SigningKey::new(key), Arc::clone(&store));
    (signer, verifier, store)
}

/// Sample action descriptor used across tests.
fn sample_action() -> ActionDescriptor {
    ActionDescriptor::new(
        "acme",
        "web-search",
        "invoke",
        json!({"query": "latest filings", "limit": 3}),
    )
}

// ============================================================================
// SECTION: Round-Trip
// ============================================================================

/// Tests verify returns true for an unmodified signed manifest.
#[test]
fn test_sign_then_verify_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (signer, verifier, _store) = provenance_fixture(&dir, "integration-test-key");

    let manifest = signer.sign_action(&sample_action()).unwrap();
    let verdict = verifier.verify(&manifest.signature).unwrap();

    assert!(verdict.verified);
    assert_eq!(verdict.manifest, manifest);
}

/// Tests the signature doubles as the storage identity.
#[test]
fn test_signature_is_storage_identity() {
    let dir = tempfile::tempdir().unwrap();
    let (signer, _verifier, store) = provenance_fixture(&dir, "integration-test-key");

    let manifest = signer.sign_action_at(&sample_action(), 1_700_000_000_000).unwrap();
    let stored = store.read(&manifest.signature).unwrap();

    assert_eq!(stored, manifest);
}

/// Tests the manifest exposes only the short key hint.
#[test]
fn test_manifest_carries_key_hint_only() {
    let dir = tempfile::tempdir().unwrap();
    let (signer, _verifier, _store) = provenance_fixture(&dir, "super-secret-signing-key");

    let manifest = signer.sign_action(&sample_action()).unwrap();

    assert_eq!(manifest.signing_key_hint, "super-se");
}

// ============================================================================
// SECTION: Idempotent Signing
// ============================================================================

/// Tests identical content at one timestamp re-signs to one identity.
#[test]
fn test_idempotent_signing_at_fixed_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let (signer, _verifier, _store) = provenance_fixture(&dir, "integration-test-key");

    let first = signer.sign_action_at(&sample_action(), 42).unwrap();
    let second = signer.sign_action_at(&sample_action(), 42).unwrap();

    assert_eq!(first.signature, second.signature);
    let stored: Vec<_> = std::fs::read_dir(dir.path().join("manifests")).unwrap().collect();
    assert_eq!(stored.len(), 1);
}

/// Tests payload key order does not change the signed identity.
#[test]
fn test_signature_ignores_payload_key_order() {
    let dir = tempfile::tempdir().unwrap();
    let (signer, _verifier, _store) = provenance_fixture(&dir, "integration-test-key");

    let ordered =
        ActionDescriptor::new("acme", "t1", "invoke", json!({"a": 1, "b": [true, null]}));
    let shuffled =
        ActionDescriptor::new("acme", "t1", "invoke", json!({"b": [true, null], "a": 1}));

    let first = signer.sign_action_at(&ordered, 42).unwrap();
    let second = signer.sign_action_at(&shuffled, 42).unwrap();

    assert_eq!(first.signature, second.signature);
}

/// Tests different timestamps produce different identities.
#[test]
fn test_signature_depends_on_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let (signer, _verifier, _store) = provenance_fixture(&dir, "integration-test-key");

    let first = signer.sign_action_at(&sample_action(), 42).unwrap();
    let second = signer.sign_action_at(&sample_action(), 43).unwrap();

    assert_ne!(first.signature, second.signature);
}

// ============================================================================
// SECTION: Tamper Detection
// ============================================================================

/// Tests mutating the stored action flips verification to false.
#[test]
fn test_tampered_action_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let (signer, verifier, store) = provenance_fixture(&dir, "integration-test-key");

    let mut manifest = signer.sign_action(&sample_action()).unwrap();
    manifest.action.payload = json!({"query": "redacted filings", "limit": 3});
    store.write(&manifest.signature.clone(), &manifest).unwrap();

    let verdict = verifier.verify(&manifest.signature).unwrap();
    assert!(!verdict.verified);
}

/// Tests mutating the stored timestamp flips verification to false.
#[test]
fn test_tampered_timestamp_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let (signer, verifier, store) = provenance_fixture(&dir, "integration-test-key");

    let mut manifest = signer.sign_action(&sample_action()).unwrap();
    manifest.timestamp += 1;
    store.write(&manifest.signature.clone(), &manifest).unwrap();

    let verdict = verifier.verify(&manifest.signature).unwrap();
    assert!(!verdict.verified);
}

/// Tests a verifier holding a different key rejects the signature.
#[test]
fn test_verify_with_wrong_key_reports_unverified() {
    let dir = tempfile::tempdir().unwrap();
    let (signer, _verifier, store) = provenance_fixture(&dir, "integration-test-key");
    let rogue = ManifestVerifier::new(SigningKey::new("some-other-key"), store);

    let manifest = signer.sign_action(&sample_action()).unwrap();
    let verdict = rogue.verify(&manifest.signature).unwrap();

    assert!(!verdict.verified);
}

// ============================================================================
// SECTION: Not Found
// ============================================================================

/// Tests verification of an unknown identity propagates not-found.
#[test]
fn test_verify_unknown_manifest_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (_signer, verifier, _store) = provenance_fixture(&dir, "integration-test-key");

    let missing = ManifestId::new("0".repeat(64));
    let err = verifier.verify(&missing).unwrap_err();

    assert!(matches!(err, VerifyError::Store(StoreError::NotFound(_))));
}

/// Tests a malformed identity verifies as not-found, never an internal error.
#[test]
fn test_verify_malformed_id_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (_signer, verifier, _store) = provenance_fixture(&dir, "integration-test-key");

    let err = verifier.verify(&ManifestId::new("nonexistent-id")).unwrap_err();

    assert!(matches!(err, VerifyError::Store(StoreError::NotFound(_))));
}
