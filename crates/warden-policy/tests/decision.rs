// crates/warden-policy/tests/decision.rs
// ============================================================================
// Module: Decision Normalization Tests
// Description: Tests for raw-result to decision normalization.
// ============================================================================
//! ## Overview
//! Validates the normalization rules: absent allow means deny, reason shapes
//! collapse predictably, and quota passes through only as an integer.

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
use warden_policy::Decision;

// ============================================================================
// SECTION: Normalization Rules
// ============================================================================

/// Tests an empty result normalizes to deny with no reason.
#[test]
fn test_empty_result_is_denied() {
    let decision = Decision::from_result(&json!({}));

    assert!(!decision.allow);
    assert_eq!(decision.reason, None);
    assert_eq!(decision.quota_remaining, None);
}

/// Tests a string deny reason is used verbatim.
#[test]
fn test_string_deny_reason_is_used() {
    let decision =
        Decision::from_result(&json!({"allow": false, "deny_reason": "tool disabled"}));

    assert_eq!(decision.reason.as_deref(), Some("tool disabled"));
}

/// Tests an empty deny reason list yields no reason.
#[test]
fn test_empty_deny_reason_list_yields_none() {
    let decision = Decision::from_result(&json!({"allow": false, "deny_reason": []}));

    assert_eq!(decision.reason, None);
}

/// Tests reasons are dropped when the action is allowed.
#[test]
fn test_allowed_decision_carries_no_reason() {
    let decision =
        Decision::from_result(&json!({"allow": true, "deny_reason": ["stale reason"]}));

    assert!(decision.allow);
    assert_eq!(decision.reason, None);
}

/// Tests non-integer quota values do not pass through.
#[test]
fn test_non_integer_quota_is_dropped() {
    let decision = Decision::from_result(&json!({"allow": true, "quota_remaining": "many"}));

    assert_eq!(decision.quota_remaining, None);
}
