// crates/warden-core/src/core/action.rs
// ============================================================================
// Module: Warden Action Descriptor
// Description: Immutable description of one governed tool action.
// Purpose: Provide the shared input to policy evaluation and signing.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! An action descriptor names who acted (tenant), with what (tool), what they
//! did (action), and the structured payload attached to the invocation. The
//! payload is the JSON value union {null, bool, number, string, array,
//! object}; canonical serialization in [`crate::core::hashing`] makes its
//! digest independent of key ordering.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ActionName;
use crate::core::identifiers::TenantSlug;
use crate::core::identifiers::ToolName;

// ============================================================================
// SECTION: Action Descriptor
// ============================================================================

/// Immutable record of one tool action submitted for governance.
///
/// # Invariants
/// - Descriptors are constructed once and never mutated; both policy
///   evaluation and manifest signing consume the same value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Tenant that owns the invocation.
    pub tenant: TenantSlug,
    /// Tool that performed the action.
    pub tool: ToolName,
    /// Name of the performed action.
    pub action: ActionName,
    /// Structured payload attached to the invocation.
    pub payload: Value,
}

impl ActionDescriptor {
    /// Creates a new action descriptor.
    #[must_use]
    pub fn new(
        tenant: impl Into<TenantSlug>,
        tool: impl Into<ToolName>,
        action: impl Into<ActionName>,
        payload: Value,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            tool: tool.into(),
            action: action.into(),
            payload,
        }
    }
}
