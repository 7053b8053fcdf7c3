// crates/warden-server/tests/governor.rs
// ============================================================================
// Module: Governor Tests
// Description: End-to-end tests for the governance orchestrator.
// ============================================================================
//! ## Overview
//! Composes a real registry, filesystem manifest store, and a stub policy
//! evaluator to exercise the full governance paths: policy checks, failure
//! surfacing, provenance sign/verify, and the kill-switch scenario.

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
use std::thread;

use serde_json::json;
use tiny_http::Response;
use tiny_http::Server;
use warden_core::ActionName;
use warden_core::FsManifestStore;
use warden_core::ManifestId;
use warden_core::ManifestSigner;
use warden_core::ManifestVerifier;
use warden_core::SharedManifestStore;
use warden_core::SigningKey;
use warden_core::TenantSlug;
use warden_core::ToolName;
use warden_policy::PolicyClient;
use warden_policy::PolicyClientConfig;
use warden_registry::NewTool;
use warden_registry::RegistryConfig;
use warden_registry::SqliteRegistry;
use warden_server::Governor;
use warden_server::GovernorError;
use warden_server::KillRequest;
use warden_server::NullAuditSink;
use warden_server::PolicyCheckRequest;
use warden_server::RestoreRequest;
use warden_server::SignRequest;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Spawns a one-shot evaluator stub returning the given body and status.
fn spawn_evaluator(body: &'static str, status: u16) -> (String, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let url = format!("http://{addr}");

    let handle = thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let response = Response::from_string(body).with_status_code(status);
            let _ = request.respond(response);
        }
    });

    (url, handle)
}

/// Builds a governor over temporary storage and the given evaluator URL.
fn governor_for(dir: &tempfile::TempDir, policy_url: &str) -> Governor {
    let registry = Arc::new(
        SqliteRegistry::open(&RegistryConfig::new(dir.path().join("registry.db"))).unwrap(),
    );
    let store: SharedManifestStore =
        Arc::new(FsManifestStore::new(dir.path().join("manifests")).unwrap());
    let key = SigningKey::new("governor-test-key");
    let signer = ManifestSigner::new(key.clone(), Arc::clone(&store));
    let verifier = ManifestVerifier::new(key, store);
    let policy = PolicyClient::new(PolicyClientConfig {
        base_url: policy_url.to_string(),
        timeout_ms: 2_000,
        ..PolicyClientConfig::default()
    })
    .unwrap();
    Governor::new(
        registry,
        policy,
        "warden/policy".to_string(),
        signer,
        verifier,
        Arc::new(NullAuditSink),
    )
}

/// Registers `name` under the `acme` tenant.
fn register_acme_tool(governor: &Governor, name: &str) {
    governor
        .register_tool(&NewTool {
            tenant_slug: TenantSlug::new("acme"),
            name: ToolName::new(name),
            url: format!("https://tools.acme.example/{name}"),
            owner: "acme".to_string(),
            scopes: vec![],
            metadata: json!({}),
        })
        .unwrap();
}

/// Builds a check request for `acme` and the given tool.
fn check_request(tool: &str) -> PolicyCheckRequest {
    PolicyCheckRequest {
        tenant_slug: TenantSlug::new("acme"),
        tool_name: ToolName::new(tool),
        action: ActionName::new("invoke"),
        purpose: Some("integration-test".to_string()),
        usage: 3,
        context: json!({}),
    }
}

// ============================================================================
// SECTION: Policy Checks
// ============================================================================

/// Tests an allowing evaluator response reaches the caller unchanged.
#[test]
fn test_check_policy_passes_decision_through() {
    let dir = tempfile::tempdir().unwrap();
    let (url, _handle) =
        spawn_evaluator(r#"{"result": {"allow": true, "quota_remaining": 4}}"#, 200);
    let governor = governor_for(&dir, &url);
    register_acme_tool(&governor, "t1");

    let decision = governor.check_policy(&check_request("t1")).unwrap();

    assert!(decision.allow);
    assert_eq!(decision.quota_remaining, Some(4));
}

/// Tests evaluator failure surfaces as unavailable, never as a decision.
#[test]
fn test_check_policy_surfaces_evaluator_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (url, _handle) = spawn_evaluator("internal error", 500);
    let governor = governor_for(&dir, &url);
    register_acme_tool(&governor, "t1");

    let err = governor.check_policy(&check_request("t1")).unwrap_err();

    assert!(matches!(err, GovernorError::PolicyUnavailable(_)));
}

/// Tests unknown tenant and tool fail before any evaluator call.
#[test]
fn test_check_policy_requires_known_tenant_and_tool() {
    let dir = tempfile::tempdir().unwrap();
    let governor = governor_for(&dir, "http://127.0.0.1:9");
    register_acme_tool(&governor, "t1");

    let mut unknown_tenant = check_request("t1");
    unknown_tenant.tenant_slug = TenantSlug::new("ghost");
    let tenant_err = governor.check_policy(&unknown_tenant).unwrap_err();
    let tool_err = governor.check_policy(&check_request("ghost-tool")).unwrap_err();

    assert!(matches!(tenant_err, GovernorError::NotFound(_)));
    assert!(matches!(tool_err, GovernorError::NotFound(_)));
}

// ============================================================================
// SECTION: Provenance
// ============================================================================

/// Tests signing then verifying through the orchestrator round-trips.
#[test]
fn test_sign_then_verify_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let governor = governor_for(&dir, "http://127.0.0.1:9");
    register_acme_tool(&governor, "t1");

    let manifest = governor
        .sign_provenance(&SignRequest {
            tenant_slug: TenantSlug::new("acme"),
            tool_name: ToolName::new("t1"),
            action: ActionName::new("invoke"),
            payload: json!({"args": [1, 2], "result": "ok"}),
        })
        .unwrap();
    let verdict = governor.verify_manifest(&manifest.signature).unwrap();

    assert!(verdict.verified);
    assert_eq!(verdict.manifest.signing_key_hint, "governor");
}

/// Tests signing requires a registered tenant and tool.
#[test]
fn test_sign_requires_known_tool() {
    let dir = tempfile::tempdir().unwrap();
    let governor = governor_for(&dir, "http://127.0.0.1:9");

    let err = governor
        .sign_provenance(&SignRequest {
            tenant_slug: TenantSlug::new("acme"),
            tool_name: ToolName::new("t1"),
            action: ActionName::new("invoke"),
            payload: json!({}),
        })
        .unwrap_err();

    assert!(matches!(err, GovernorError::NotFound(_)));
}

/// Tests verifying an unknown manifest reports not-found.
#[test]
fn test_verify_unknown_manifest_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let governor = governor_for(&dir, "http://127.0.0.1:9");

    let err = governor.verify_manifest(&ManifestId::new("0".repeat(64))).unwrap_err();

    assert!(matches!(err, GovernorError::NotFound(_)));
}

// ============================================================================
// SECTION: Kill-Switch
// ============================================================================

/// Tests the full kill and restore scenario over two tools.
#[test]
fn test_kill_switch_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let governor = governor_for(&dir, "http://127.0.0.1:9");
    register_acme_tool(&governor, "t1");
    register_acme_tool(&governor, "t2");

    let disabled = governor
        .kill(&KillRequest {
            tenant_slug: TenantSlug::new("acme"),
            tool_name: None,
            reason: "incident drill".to_string(),
        })
        .unwrap();
    assert_eq!(disabled.len(), 2);
    for tool in governor.list_tools(Some(&TenantSlug::new("acme"))).unwrap() {
        assert!(!tool.is_active);
    }

    let restored = governor
        .restore(&RestoreRequest {
            tenant_slug: TenantSlug::new("acme"),
            tool_name: None,
        })
        .unwrap();
    assert_eq!(restored.len(), 2);
    for tool in governor.list_tools(Some(&TenantSlug::new("acme"))).unwrap() {
        assert!(tool.is_active);
    }
}

/// Tests the kill-switch against an unknown tenant reports not-found.
#[test]
fn test_kill_switch_unknown_tenant_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let governor = governor_for(&dir, "http://127.0.0.1:9");

    let err = governor
        .kill(&KillRequest {
            tenant_slug: TenantSlug::new("ghost"),
            tool_name: None,
            reason: "incident drill".to_string(),
        })
        .unwrap_err();

    assert!(matches!(err, GovernorError::NotFound(_)));
}
