// crates/warden-registry/src/model.rs
// ============================================================================
// Module: Registry Rows
// Description: Tenant and tool row types consumed by the orchestrator.
// Purpose: Provide serializable registry records with explicit foreign keys.
// Dependencies: serde, serde_json, warden-core
// ============================================================================

//! ## Overview
//! Registry rows mirror the two flat tables: `tenants` keyed by slug and
//! `tools` keyed by `(tenant_id, name)`. Tool scopes and metadata are stored
//! as JSON text columns and surface as structured values here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use warden_core::TenantSlug;
use warden_core::ToolId;
use warden_core::ToolName;

// ============================================================================
// SECTION: Tenant Row
// ============================================================================

/// One governed tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Registry-issued row identifier.
    pub id: String,
    /// Unique tenant slug.
    pub slug: TenantSlug,
    /// Human-readable tenant name.
    pub display_name: String,
    /// Creation time in milliseconds since epoch.
    pub created_at_ms: i64,
}

// ============================================================================
// SECTION: Tool Row
// ============================================================================

/// One registered tool owned by a tenant.
///
/// # Invariants
/// - `(tenant_id, name)` is unique registry-wide.
/// - `is_active == false` means the kill-switch has disabled the tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    /// Registry-issued row identifier.
    pub id: ToolId,
    /// Owning tenant's row identifier.
    pub tenant_id: String,
    /// Tool name, unique per tenant.
    pub name: ToolName,
    /// Endpoint URL the tool is served from.
    pub url: String,
    /// Owner contact recorded at registration.
    pub owner: String,
    /// Access scopes granted to the tool.
    pub scopes: Vec<String>,
    /// Free-form registration metadata.
    pub metadata: Value,
    /// Kill-switch flag; inactive tools must not run.
    pub is_active: bool,
    /// Creation time in milliseconds since epoch.
    pub created_at_ms: i64,
    /// Last update time in milliseconds since epoch.
    pub updated_at_ms: i64,
}

// ============================================================================
// SECTION: Registration Input
// ============================================================================

/// Input for registering a new tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTool {
    /// Slug of the owning tenant; created on first use.
    pub tenant_slug: TenantSlug,
    /// Tool name, unique per tenant.
    pub name: ToolName,
    /// Endpoint URL the tool is served from.
    pub url: String,
    /// Owner contact for the tool.
    pub owner: String,
    /// Access scopes granted to the tool.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Free-form registration metadata.
    #[serde(default = "default_metadata")]
    pub metadata: Value,
}

/// Returns the default empty metadata object.
fn default_metadata() -> Value {
    Value::Object(serde_json::Map::new())
}
