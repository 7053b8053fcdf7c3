// crates/warden-guard/src/lib.rs
// ============================================================================
// Module: Warden Guard
// Description: Governed-call adapter for embedding agents and frameworks.
// Purpose: Wrap arbitrary tool callables with policy checks and provenance.
// Dependencies: reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! The guard is an explicit higher-order composition, not implicit
//! interception: callers hand it a tool callable and the guard performs
//! {policy check, fail closed on deny, invoke, sign provenance} against a
//! running control plane. A denial is a typed permission error carrying the
//! evaluator's reason; a control-plane failure is never treated as an allow,
//! and provenance signing is mandatory rather than best-effort.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for a tool guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// Base URL of the governance control plane.
    pub control_plane_url: String,
    /// Tenant slug every wrapped call executes under.
    pub tenant_slug: String,
    /// Request timeout in milliseconds for control-plane calls.
    pub timeout_ms: u64,
}

impl GuardConfig {
    /// Creates a config with the default timeout.
    #[must_use]
    pub fn new(control_plane_url: impl Into<String>, tenant_slug: impl Into<String>) -> Self {
        Self {
            control_plane_url: control_plane_url.into(),
            tenant_slug: tenant_slug.into(),
            timeout_ms: 2_000,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by governed invocations.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Guard configuration is unusable.
    #[error("guard configuration invalid: {0}")]
    Config(String),
    /// Policy explicitly denied the invocation.
    #[error("tool invocation denied: {0}")]
    Denied(String),
    /// Control plane unreachable or answered outside its contract.
    #[error("control plane failure: {0}")]
    ControlPlane(String),
    /// Wrapped tool reported a failure.
    #[error("tool failure: {0}")]
    Tool(String),
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result of one governed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernedResult {
    /// Value returned by the wrapped tool.
    pub result: Value,
    /// Identity of the provenance manifest recorded for the call.
    pub manifest_id: String,
}

/// Decision payload returned by the control plane.
#[derive(Debug, Deserialize)]
struct DecisionPayload {
    /// Whether the invocation is permitted.
    #[serde(default)]
    allow: bool,
    /// Denial reason when denied.
    #[serde(default)]
    reason: Option<String>,
}

/// Signing payload returned by the control plane.
#[derive(Debug, Deserialize)]
struct SignPayload {
    /// Identity of the recorded manifest.
    manifest_id: String,
}

// ============================================================================
// SECTION: Tool Guard
// ============================================================================

/// Wraps tool callables with policy enforcement and provenance recording.
///
/// # Invariants
/// - The wrapped tool runs only after an explicit allow.
/// - Every successful invocation produces exactly one signed manifest.
pub struct ToolGuard {
    /// Guard configuration.
    config: GuardConfig,
    /// Normalized control-plane base URL without a trailing slash.
    base_url: String,
    /// HTTP client used for control-plane calls.
    client: Client,
}

impl ToolGuard {
    /// Creates a guard for one tenant against one control plane.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Config`] when the HTTP client cannot be built.
    pub fn new(config: GuardConfig) -> Result<Self, GuardError> {
        let base_url = config.control_plane_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(GuardError::Config("control plane url must not be empty".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(Policy::none())
            .build()
            .map_err(|_| GuardError::Config("http client build failed".to_string()))?;
        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    /// Invokes `tool` under governance: policy check, call, provenance sign.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Denied`] on an explicit policy deny,
    /// [`GuardError::Tool`] when the callable fails, and
    /// [`GuardError::ControlPlane`] when either control-plane call fails.
    pub fn invoke<F>(
        &self,
        tool_name: &str,
        args: Value,
        tool: F,
    ) -> Result<GovernedResult, GuardError>
    where
        F: FnOnce(&Value) -> Result<Value, String>,
    {
        let decision = self.check_policy(tool_name, &args)?;
        if !decision.allow {
            return Err(GuardError::Denied(
                decision.reason.unwrap_or_else(|| "tool invocation denied".to_string()),
            ));
        }
        let result = tool(&args).map_err(GuardError::Tool)?;
        let manifest_id = self.sign_provenance(tool_name, &args, &result)?;
        Ok(GovernedResult {
            result,
            manifest_id,
        })
    }

    /// Asks the control plane whether the invocation may proceed.
    fn check_policy(&self, tool_name: &str, args: &Value) -> Result<DecisionPayload, GuardError> {
        let body = json!({
            "tenant_slug": self.config.tenant_slug,
            "tool_name": tool_name,
            "action": "invoke",
            "usage": 0,
            "context": {"args": args},
        });
        let response = self
            .client
            .post(format!("{}/policy/check", self.base_url))
            .json(&body)
            .send()
            .map_err(|err| GuardError::ControlPlane(err.to_string()))?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(GuardError::ControlPlane(format!("policy check failed: status {status}")));
        }
        response
            .json::<DecisionPayload>()
            .map_err(|err| GuardError::ControlPlane(format!("policy check body invalid: {err}")))
    }

    /// Records provenance for a completed invocation.
    fn sign_provenance(
        &self,
        tool_name: &str,
        args: &Value,
        result: &Value,
    ) -> Result<String, GuardError> {
        let body = json!({
            "tenant_slug": self.config.tenant_slug,
            "tool_name": tool_name,
            "action": "invoke",
            "payload": {"args": args, "result": result},
        });
        let response = self
            .client
            .post(format!("{}/provenance/sign", self.base_url))
            .json(&body)
            .send()
            .map_err(|err| GuardError::ControlPlane(err.to_string()))?;
        let status = response.status().as_u16();
        if status != 201 {
            return Err(GuardError::ControlPlane(format!(
                "provenance sign failed: status {status}"
            )));
        }
        let payload = response
            .json::<SignPayload>()
            .map_err(|err| GuardError::ControlPlane(format!("sign body invalid: {err}")))?;
        Ok(payload.manifest_id)
    }
}
