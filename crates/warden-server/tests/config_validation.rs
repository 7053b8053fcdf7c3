// crates/warden-server/tests/config_validation.rs
// ============================================================================
// Module: Config Validation Tests
// Description: Tests for TOML loading, defaults, and fail-closed validation.
// ============================================================================
//! ## Overview
//! Validates that configuration parses with sensible defaults, rejects
//! malformed values, and resolves the signing key without ever echoing it.

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

use std::path::PathBuf;

use warden_server::ConfigError;
use warden_server::WardenConfig;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Writes a config file and loads it.
fn load_from(dir: &tempfile::TempDir, contents: &str) -> Result<WardenConfig, ConfigError> {
    let path = dir.path().join("warden.toml");
    std::fs::write(&path, contents).unwrap();
    WardenConfig::load(&path)
}

/// Minimal valid configuration body.
const MINIMAL: &str = r#"
[registry]
path = "warden.db"

[provenance]
store_root = ".data/provenance"
signing_key = "dev-signing-key"
"#;

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Tests a minimal config loads with documented defaults.
#[test]
fn test_minimal_config_applies_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_from(&dir, MINIMAL).unwrap();

    assert_eq!(config.server.bind, "127.0.0.1:8400");
    assert_eq!(config.policy.base_url, "http://127.0.0.1:8181");
    assert_eq!(config.policy.package, "warden/policy");
    assert_eq!(config.registry.path, PathBuf::from("warden.db"));
}

/// Tests unknown fields are rejected rather than ignored.
#[test]
fn test_unknown_fields_fail_closed() {
    let dir = tempfile::tempdir().unwrap();
    let contents = format!("{MINIMAL}\n[surprise]\nvalue = 1\n");

    let err = load_from(&dir, &contents).unwrap_err();

    assert!(matches!(err, ConfigError::Parse(_)));
}

/// Tests an invalid bind address fails validation.
#[test]
fn test_invalid_bind_address_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let contents = format!("[server]\nbind = \"not-an-address\"\n{MINIMAL}");

    let err = load_from(&dir, &contents).unwrap_err();

    assert!(matches!(err, ConfigError::Invalid(_)));
}

/// Tests an out-of-range policy timeout fails validation.
#[test]
fn test_policy_timeout_range_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let contents = format!("[policy]\ntimeout_ms = 1\n{MINIMAL}");

    let err = load_from(&dir, &contents).unwrap_err();

    assert!(matches!(err, ConfigError::Invalid(_)));
}

// ============================================================================
// SECTION: Signing Key Resolution
// ============================================================================

/// Tests the inline development key resolves and exposes only its hint.
#[test]
fn test_inline_signing_key_resolves() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_from(&dir, MINIMAL).unwrap();

    let key = config.signing_key().unwrap();

    assert_eq!(key.hint(), "dev-sign");
    assert_eq!(format!("{key:?}"), "SigningKey(redacted)");
}

/// Tests a too-short signing key is rejected.
#[test]
fn test_short_signing_key_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let contents = MINIMAL.replace("dev-signing-key", "short");
    let config = load_from(&dir, &contents).unwrap();

    let err = config.signing_key().unwrap_err();

    assert!(matches!(err, ConfigError::MissingSigningKey(_)));
}

/// Tests a missing key names the environment variable to set.
#[test]
fn test_missing_signing_key_names_env_var() {
    let dir = tempfile::tempdir().unwrap();
    let contents = r#"
[registry]
path = "warden.db"

[provenance]
store_root = ".data/provenance"
signing_key_env = "WARDEN_TEST_UNSET_KEY"
"#;
    let config = load_from(&dir, contents).unwrap();

    let err = config.signing_key().unwrap_err();

    assert!(err.to_string().contains("WARDEN_TEST_UNSET_KEY"));
}
