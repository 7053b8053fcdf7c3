// crates/warden-policy/src/decision.rs
// ============================================================================
// Module: Policy Decision Model
// Description: Evaluator input document and normalized decision object.
// Purpose: Turn raw evaluator results into auditable allow/deny outcomes.
// Dependencies: serde, serde_json, warden-core
// ============================================================================

//! ## Overview
//! A decision is produced once per policy check and is not persisted by this
//! subsystem. "Deny" only ever comes from an explicit evaluator answer: the
//! normalization here reads the raw `result` document and nothing else, and
//! an absent `allow` field normalizes to deny because the evaluator did not
//! grant anything.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use warden_core::ActionName;
use warden_core::TenantSlug;
use warden_core::ToolName;

// ============================================================================
// SECTION: Policy Input
// ============================================================================

/// Structured input document sent to the policy evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyInput {
    /// Tenant requesting the action.
    pub tenant: TenantSlug,
    /// Tool being invoked.
    pub tool: ToolName,
    /// Usage count reported by the caller.
    pub usage: u64,
    /// Action being performed.
    pub action: ActionName,
    /// Declared purpose, when the caller provides one.
    pub purpose: Option<String>,
    /// Free-form request context.
    pub context: Value,
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Normalized allow/deny outcome of one policy check.
///
/// # Invariants
/// - `reason` is present only when `allow == false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the action is permitted.
    pub allow: bool,
    /// Denial reason reported by the evaluator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Remaining quota reported by the evaluator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_remaining: Option<i64>,
}

impl Decision {
    /// Normalizes a raw evaluator `result` document into a decision.
    ///
    /// `allow` is the boolean `allow` field (absent means deny). When denied,
    /// the reason is the first string of a non-empty `deny_reason` array, or
    /// the `deny_reason` string itself, else absent. `quota_remaining`
    /// passes through when the evaluator reports an integer.
    #[must_use]
    pub fn from_result(result: &Value) -> Self {
        let allow = result.get("allow").and_then(Value::as_bool).unwrap_or(false);
        let reason = if allow {
            None
        } else {
            match result.get("deny_reason") {
                Some(Value::Array(reasons)) => {
                    reasons.first().and_then(Value::as_str).map(str::to_string)
                }
                Some(Value::String(reason)) => Some(reason.clone()),
                _ => None,
            }
        };
        let quota_remaining = result.get("quota_remaining").and_then(Value::as_i64);
        Self {
            allow,
            reason,
            quota_remaining,
        }
    }
}
