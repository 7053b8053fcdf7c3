// crates/warden-server/src/governor.rs
// ============================================================================
// Module: Governance Orchestrator
// Description: Composition of registry, policy client, signer, and verifier.
// Purpose: Answer governance requests with auditable, fail-closed outcomes.
// Dependencies: warden-core, warden-policy, warden-registry
// ============================================================================

//! ## Overview
//! The governor resolves tenant and tool from the registry, consults the
//! policy decision client, and on the provenance path delegates to the
//! manifest signer and verifier. Every component is injected at construction
//! and shared read-only afterwards. No method ever converts an internal
//! failure into a decision: "deny" comes only from an explicit evaluator
//! answer, and evaluator failures surface as [`GovernorError::PolicyUnavailable`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use warden_core::ActionDescriptor;
use warden_core::ActionManifest;
use warden_core::ActionName;
use warden_core::FsManifestStore;
use warden_core::ManifestId;
use warden_core::ManifestSigner;
use warden_core::ManifestVerifier;
use warden_core::SharedManifestStore;
use warden_core::SignError;
use warden_core::StoreError;
use warden_core::TenantSlug;
use warden_core::ToolId;
use warden_core::ToolName;
use warden_core::VerifiedManifest;
use warden_core::VerifyError;
use warden_policy::Decision;
use warden_policy::PolicyClient;
use warden_policy::PolicyClientConfig;
use warden_policy::PolicyDecisionError;
use warden_policy::PolicyInput;
use warden_registry::NewTool;
use warden_registry::RegistryConfig;
use warden_registry::RegistryError;
use warden_registry::SqliteRegistry;
use warden_registry::Tenant;
use warden_registry::ToolRecord;

use crate::audit::AuditEvent;
use crate::audit::SharedAuditSink;
use crate::audit::StderrAuditSink;
use crate::config::WardenConfig;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Inbound policy check request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PolicyCheckRequest {
    /// Tenant requesting the action.
    pub tenant_slug: TenantSlug,
    /// Tool being invoked.
    pub tool_name: ToolName,
    /// Action being performed.
    pub action: ActionName,
    /// Declared purpose, when the caller provides one.
    #[serde(default)]
    pub purpose: Option<String>,
    /// Usage count reported by the caller.
    #[serde(default)]
    pub usage: u64,
    /// Free-form request context.
    #[serde(default = "empty_object")]
    pub context: Value,
}

/// Inbound provenance signing request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignRequest {
    /// Tenant that owns the action.
    pub tenant_slug: TenantSlug,
    /// Tool that performed the action.
    pub tool_name: ToolName,
    /// Action that was performed.
    pub action: ActionName,
    /// Structured payload attached to the invocation.
    pub payload: Value,
}

/// Inbound kill-switch request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KillRequest {
    /// Tenant whose tools are being disabled.
    pub tenant_slug: TenantSlug,
    /// Optional filter to one tool; absent means all tenant tools.
    #[serde(default)]
    pub tool_name: Option<ToolName>,
    /// Operator-supplied reason recorded in the audit trail.
    pub reason: String,
}

/// Inbound kill-switch restore request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RestoreRequest {
    /// Tenant whose tools are being restored.
    pub tenant_slug: TenantSlug,
    /// Optional filter to one tool; absent means all tenant tools.
    #[serde(default)]
    pub tool_name: Option<ToolName>,
}

/// Returns the default empty context object.
fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Governance orchestration errors with an explicit boundary mapping.
#[derive(Debug, Error)]
pub enum GovernorError {
    /// Tenant, tool, or manifest is absent (404-equivalent).
    #[error("{0}")]
    NotFound(String),
    /// Registration conflicts with an existing row (409-equivalent).
    #[error("{0}")]
    Conflict(String),
    /// Policy evaluator unreachable or malformed (503-equivalent). Never an
    /// implicit allow or deny.
    #[error("policy evaluator unavailable: {0}")]
    PolicyUnavailable(String),
    /// Manifest storage failed (500-equivalent).
    #[error("provenance storage failed: {0}")]
    Storage(String),
    /// Registry database failed (500-equivalent).
    #[error("registry failure: {0}")]
    Registry(String),
    /// Request or configuration is invalid (400-equivalent).
    #[error("invalid request: {0}")]
    Invalid(String),
}

impl From<RegistryError> for GovernorError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::TenantNotFound(_)
            | RegistryError::ToolNotFound { .. }
            | RegistryError::NoMatchingTools(_) => Self::NotFound(err.to_string()),
            RegistryError::ToolExists { .. } => Self::Conflict(err.to_string()),
            RegistryError::Db(_) | RegistryError::Encode(_) => Self::Registry(err.to_string()),
        }
    }
}

impl From<PolicyDecisionError> for GovernorError {
    fn from(err: PolicyDecisionError) -> Self {
        Self::PolicyUnavailable(err.to_string())
    }
}

impl From<SignError> for GovernorError {
    fn from(err: SignError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<VerifyError> for GovernorError {
    fn from(err: VerifyError) -> Self {
        match err {
            // A client-supplied identity that is absent or could never have
            // been stored is a lookup miss, not a server failure.
            VerifyError::Store(StoreError::NotFound(_) | StoreError::InvalidId(_)) => {
                Self::NotFound(err.to_string())
            }
            VerifyError::Store(_) | VerifyError::Canonicalize(_) => Self::Storage(err.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Governor
// ============================================================================

/// Governance orchestrator over registry, policy, and provenance.
///
/// # Invariants
/// - Components are immutable after construction and safe to share across
///   request-handling contexts.
pub struct Governor {
    /// Tenant/tool registry.
    registry: Arc<SqliteRegistry>,
    /// Policy decision client.
    policy: PolicyClient,
    /// Policy package evaluated per check.
    policy_package: String,
    /// Manifest signer.
    signer: ManifestSigner,
    /// Manifest verifier.
    verifier: ManifestVerifier,
    /// Audit event sink.
    audit: SharedAuditSink,
}

impl Governor {
    /// Creates a governor from explicitly constructed components.
    #[must_use]
    pub fn new(
        registry: Arc<SqliteRegistry>,
        policy: PolicyClient,
        policy_package: String,
        signer: ManifestSigner,
        verifier: ManifestVerifier,
        audit: SharedAuditSink,
    ) -> Self {
        Self {
            registry,
            policy,
            policy_package,
            signer,
            verifier,
            audit,
        }
    }

    /// Builds a governor and all its components from validated config.
    ///
    /// # Errors
    ///
    /// Returns [`GovernorError`] when the registry, store, or policy client
    /// cannot be constructed, or no signing key is resolvable.
    pub fn from_config(config: &WardenConfig) -> Result<Self, GovernorError> {
        let key = config.signing_key().map_err(|err| GovernorError::Invalid(err.to_string()))?;
        let registry = Arc::new(
            SqliteRegistry::open(&RegistryConfig {
                path: config.registry.path.clone(),
                busy_timeout_ms: config.registry.busy_timeout_ms,
            })
            .map_err(|err| GovernorError::Registry(err.to_string()))?,
        );
        let store: SharedManifestStore = Arc::new(
            FsManifestStore::new(&config.provenance.store_root)
                .map_err(|err| GovernorError::Storage(err.to_string()))?,
        );
        let policy = PolicyClient::new(PolicyClientConfig {
            base_url: config.policy.base_url.clone(),
            timeout_ms: config.policy.timeout_ms,
            max_response_bytes: config.policy.max_response_bytes,
            ..PolicyClientConfig::default()
        })
        .map_err(|err| GovernorError::Invalid(err.to_string()))?;
        let signer = ManifestSigner::new(key.clone(), Arc::clone(&store));
        let verifier = ManifestVerifier::new(key, store);
        Ok(Self::new(
            registry,
            policy,
            config.policy.package.clone(),
            signer,
            verifier,
            Arc::new(StderrAuditSink),
        ))
    }

    /// Checks an action against the policy evaluator.
    ///
    /// # Errors
    ///
    /// Returns [`GovernorError::NotFound`] for unknown tenant/tool and
    /// [`GovernorError::PolicyUnavailable`] when the evaluator fails.
    pub fn check_policy(&self, request: &PolicyCheckRequest) -> Result<Decision, GovernorError> {
        // Tool resolution also reports an unknown tenant.
        self.registry.find_tool(&request.tenant_slug, &request.tool_name)?;
        let input = PolicyInput {
            tenant: request.tenant_slug.clone(),
            tool: request.tool_name.clone(),
            usage: request.usage,
            action: request.action.clone(),
            purpose: request.purpose.clone(),
            context: request.context.clone(),
        };
        let input_value = serde_json::to_value(&input)
            .map_err(|err| GovernorError::Invalid(err.to_string()))?;
        let raw = self.policy.evaluate(&self.policy_package, &input_value)?;
        let decision = Decision::from_result(&raw);
        self.audit.emit(&AuditEvent::PolicyDecision {
            timestamp_ms: AuditEvent::now_ms(),
            tenant: request.tenant_slug.to_string(),
            tool: request.tool_name.to_string(),
            action: request.action.to_string(),
            purpose: request.purpose.clone(),
            allow: decision.allow,
            reason: decision.reason.clone(),
            quota_remaining: decision.quota_remaining,
        });
        Ok(decision)
    }

    /// Signs a provenance manifest for a completed tool action.
    ///
    /// # Errors
    ///
    /// Returns [`GovernorError::NotFound`] for unknown tenant/tool and
    /// [`GovernorError::Storage`] when persisting the manifest fails.
    pub fn sign_provenance(&self, request: &SignRequest) -> Result<ActionManifest, GovernorError> {
        self.registry.find_tool(&request.tenant_slug, &request.tool_name)?;
        let action = ActionDescriptor::new(
            request.tenant_slug.clone(),
            request.tool_name.clone(),
            request.action.clone(),
            request.payload.clone(),
        );
        let manifest = self.signer.sign_action(&action)?;
        self.audit.emit(&AuditEvent::ProvenanceSigned {
            timestamp_ms: AuditEvent::now_ms(),
            tenant: request.tenant_slug.to_string(),
            tool: request.tool_name.to_string(),
            action: request.action.to_string(),
            manifest_id: manifest.signature.to_string(),
        });
        Ok(manifest)
    }

    /// Verifies the manifest stored under `manifest_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GovernorError::NotFound`] when the manifest is absent and
    /// [`GovernorError::Storage`] on store failure. A signature mismatch is
    /// a successful result with `verified == false`.
    pub fn verify_manifest(
        &self,
        manifest_id: &ManifestId,
    ) -> Result<VerifiedManifest, GovernorError> {
        let verdict = self.verifier.verify(manifest_id)?;
        self.audit.emit(&AuditEvent::ProvenanceVerified {
            timestamp_ms: AuditEvent::now_ms(),
            manifest_id: manifest_id.to_string(),
            verified: verdict.verified,
        });
        Ok(verdict)
    }

    /// Disables a tenant's tools through the kill-switch.
    ///
    /// # Errors
    ///
    /// Returns [`GovernorError::NotFound`] for an unknown tenant or an empty
    /// match set.
    pub fn kill(&self, request: &KillRequest) -> Result<Vec<ToolId>, GovernorError> {
        let affected =
            self.registry.set_active(&request.tenant_slug, request.tool_name.as_ref(), false)?;
        self.emit_kill_switch(
            &request.tenant_slug,
            request.tool_name.as_ref(),
            false,
            Some(request.reason.clone()),
            &affected,
        );
        Ok(affected)
    }

    /// Re-enables a tenant's tools after a kill-switch.
    ///
    /// # Errors
    ///
    /// Returns [`GovernorError::NotFound`] for an unknown tenant or an empty
    /// match set.
    pub fn restore(&self, request: &RestoreRequest) -> Result<Vec<ToolId>, GovernorError> {
        let affected =
            self.registry.set_active(&request.tenant_slug, request.tool_name.as_ref(), true)?;
        self.emit_kill_switch(
            &request.tenant_slug,
            request.tool_name.as_ref(),
            true,
            None,
            &affected,
        );
        Ok(affected)
    }

    /// Registers a new tool in the registry.
    ///
    /// # Errors
    ///
    /// Returns [`GovernorError::Conflict`] for duplicate `(tenant, name)`.
    pub fn register_tool(&self, new_tool: &NewTool) -> Result<ToolRecord, GovernorError> {
        Ok(self.registry.register_tool(new_tool)?)
    }

    /// Lists registered tools, optionally scoped to one tenant.
    ///
    /// # Errors
    ///
    /// Returns [`GovernorError::NotFound`] when the scoping slug is unknown.
    pub fn list_tools(
        &self,
        tenant_slug: Option<&TenantSlug>,
    ) -> Result<Vec<ToolRecord>, GovernorError> {
        Ok(self.registry.list_tools(tenant_slug)?)
    }

    /// Lists all tenants ordered by slug.
    ///
    /// # Errors
    ///
    /// Returns [`GovernorError::Registry`] on database failure.
    pub fn list_tenants(&self) -> Result<Vec<Tenant>, GovernorError> {
        Ok(self.registry.list_tenants()?)
    }

    /// Emits the kill-switch audit event.
    fn emit_kill_switch(
        &self,
        tenant: &TenantSlug,
        tool: Option<&ToolName>,
        active: bool,
        reason: Option<String>,
        affected: &[ToolId],
    ) {
        self.audit.emit(&AuditEvent::KillSwitch {
            timestamp_ms: AuditEvent::now_ms(),
            tenant: tenant.to_string(),
            tool: tool.map(ToString::to_string),
            active,
            reason,
            affected_tools: affected.iter().map(ToString::to_string).collect(),
        });
    }
}
