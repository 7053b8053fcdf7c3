// crates/warden-policy/src/client.rs
// ============================================================================
// Module: Policy Decision Client
// Description: HTTP client for an external OPA-style policy evaluator.
// Purpose: Issue bounded decision queries with a strict failure taxonomy.
// Dependencies: reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! The client posts `{"input": ...}` to `{base}/v1/data/{package}` and treats
//! anything other than HTTP 200 with a `result` field as a hard failure. It
//! never retries internally and never converts a failure into an allow or a
//! deny; retry policy belongs to the caller. Requests carry a hard timeout
//! and responses are read under a byte cap to preserve fail-closed behavior.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the policy decision client.
///
/// # Invariants
/// - `timeout_ms` applies to the full request lifecycle.
/// - `max_response_bytes` is a hard upper bound on evaluator responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyClientConfig {
    /// Base URL of the policy evaluator.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for PolicyClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8181".to_string(),
            timeout_ms: 2_500,
            max_response_bytes: 1024 * 1024,
            user_agent: "tool-warden/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when the policy engine cannot produce a decision.
///
/// # Invariants
/// - None of these variants ever maps to an implicit allow or deny; the
///   boundary surfaces them as a 503-equivalent.
#[derive(Debug, Error)]
pub enum PolicyDecisionError {
    /// Client configuration is unusable.
    #[error("policy client configuration invalid: {0}")]
    Config(String),
    /// Transport failure or timeout reaching the evaluator.
    #[error("policy evaluation transport failed: {0}")]
    Transport(String),
    /// Evaluator answered with a non-success status.
    #[error("policy evaluation failed: status {0}")]
    Status(u16),
    /// Evaluator body was oversized or not valid JSON.
    #[error("policy evaluation returned invalid body: {0}")]
    InvalidBody(String),
    /// Evaluator body lacked a `result` field.
    #[error("policy evaluation returned no result")]
    MissingResult,
}

// ============================================================================
// SECTION: Policy Client
// ============================================================================

/// HTTP client for policy decisions.
///
/// # Invariants
/// - Stateless per call; only the transport handle and timeout configuration
///   persist across calls.
/// - Redirects are not followed.
pub struct PolicyClient {
    /// Client configuration, including limits.
    config: PolicyClientConfig,
    /// Normalized evaluator base URL without a trailing slash.
    base_url: String,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl PolicyClient {
    /// Creates a new policy client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyDecisionError::Config`] when the base URL is invalid
    /// or the HTTP client cannot be created.
    pub fn new(config: PolicyClientConfig) -> Result<Self, PolicyDecisionError> {
        let parsed = Url::parse(&config.base_url)
            .map_err(|_| PolicyDecisionError::Config("invalid policy base url".to_string()))?;
        match parsed.scheme() {
            "http" | "https" => {}
            _ => {
                return Err(PolicyDecisionError::Config(
                    "policy base url must be http or https".to_string(),
                ));
            }
        }
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|_| PolicyDecisionError::Config("http client build failed".to_string()))?;
        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    /// Evaluates a policy package with the given input document.
    ///
    /// Returns the raw `result` value; decision normalization is the
    /// caller's step so orchestrators can audit the unmodified answer.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyDecisionError`] when the evaluator is unreachable,
    /// answers with a non-success status, or omits a `result` field.
    pub fn evaluate(&self, package: &str, input: &Value) -> Result<Value, PolicyDecisionError> {
        validate_package(package)?;
        let url = format!("{}/v1/data/{package}", self.base_url);
        let body = json!({ "input": input });
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .map_err(|err| PolicyDecisionError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(PolicyDecisionError::Status(status));
        }
        let bytes = read_response_limited(response, self.config.max_response_bytes)?;
        let payload: Value = serde_json::from_slice(&bytes)
            .map_err(|err| PolicyDecisionError::InvalidBody(err.to_string()))?;
        payload.get("result").cloned().ok_or(PolicyDecisionError::MissingResult)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects package names that would break the request path.
fn validate_package(package: &str) -> Result<(), PolicyDecisionError> {
    let well_formed = !package.is_empty()
        && package
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '.'));
    if well_formed {
        Ok(())
    } else {
        Err(PolicyDecisionError::Config(format!("invalid policy package name: {package}")))
    }
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: reqwest::blocking::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, PolicyDecisionError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| PolicyDecisionError::InvalidBody("response size limit exceeds u64".to_string()))?;
    let mut buf = Vec::new();
    let mut handle = response.take(max_bytes_u64.saturating_add(1));
    handle
        .read_to_end(&mut buf)
        .map_err(|_| PolicyDecisionError::Transport("failed to read response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(PolicyDecisionError::InvalidBody("response exceeds size limit".to_string()));
    }
    Ok(buf)
}
