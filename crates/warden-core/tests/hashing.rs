// crates/warden-core/tests/hashing.rs
// ============================================================================
// Module: Hashing Tests
// Description: Tests for canonical JSON bytes and SHA-256 digests.
// ============================================================================
//! ## Overview
//! Validates deterministic canonicalization using RFC 8785 and the hex
//! digest form behind manifest identities.

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

use serde_json::json;
use warden_core::hashing::canonical_json_bytes;
use warden_core::hashing::sha256_hex;

// ============================================================================
// SECTION: Canonicalization
// ============================================================================

/// Tests canonical bytes ignore object key order.
#[test]
fn test_canonical_bytes_ignore_key_order() {
    let value_a = json!({"b": 1, "a": {"y": true, "x": null}});
    let value_b = json!({"a": {"x": null, "y": true}, "b": 1});

    let bytes_a = canonical_json_bytes(&value_a).unwrap();
    let bytes_b = canonical_json_bytes(&value_b).unwrap();

    assert_eq!(bytes_a, bytes_b);
}

/// Tests canonical bytes distinguish different content.
#[test]
fn test_canonical_bytes_distinguish_content() {
    let bytes_a = canonical_json_bytes(&json!({"a": 1})).unwrap();
    let bytes_b = canonical_json_bytes(&json!({"a": 2})).unwrap();

    assert_ne!(bytes_a, bytes_b);
}

// ============================================================================
// SECTION: Digests
// ============================================================================

/// Tests the digest matches the well-known sha-256 vector.
#[test]
fn test_sha256_hex_matches_known_vector() {
    assert_eq!(
        sha256_hex(b"abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

/// Tests digest values are lowercase hex of fixed width.
#[test]
fn test_sha256_hex_is_lowercase_hex() {
    let digest = sha256_hex(b"warden");

    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

/// Tests canonically equal values digest to the same identity.
#[test]
fn test_canonical_digests_agree() {
    let bytes_a = canonical_json_bytes(&json!({"tool": "t1", "tenant": "acme"})).unwrap();
    let bytes_b = canonical_json_bytes(&json!({"tenant": "acme", "tool": "t1"})).unwrap();

    assert_eq!(sha256_hex(&bytes_a), sha256_hex(&bytes_b));
}
