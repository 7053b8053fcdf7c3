// crates/warden-server/src/audit.rs
// ============================================================================
// Module: Governance Audit Logging
// Description: Structured audit events for control-plane operations.
// Purpose: Emit redacted audit records without hard logging dependencies.
// Dependencies: serde, serde_json, warden-core
// ============================================================================

//! ## Overview
//! This module defines audit event payloads and sinks for governance
//! operations. It is intentionally lightweight so deployments can route
//! events to their preferred logging pipeline without redesign. Events never
//! carry the signing key or raw action payloads; a manifest identity and the
//! non-secret key hint are the most sensitive values emitted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Write;
use std::sync::Arc;

use serde::Serialize;

use warden_core::time::unix_millis_now;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Audit event payloads for control-plane operations.
///
/// # Invariants
/// - `timestamp_ms` is stamped at emission time.
/// - Optional fields are `None` when the request did not carry them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// One policy check completed with an explicit decision.
    PolicyDecision {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: i64,
        /// Tenant that requested the action.
        tenant: String,
        /// Tool being invoked.
        tool: String,
        /// Action that was checked.
        action: String,
        /// Declared purpose when provided.
        purpose: Option<String>,
        /// Whether the evaluator allowed the action.
        allow: bool,
        /// Denial reason when denied.
        reason: Option<String>,
        /// Remaining quota when reported.
        quota_remaining: Option<i64>,
    },
    /// One manifest was signed and stored.
    ProvenanceSigned {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: i64,
        /// Tenant that owns the action.
        tenant: String,
        /// Tool that performed the action.
        tool: String,
        /// Action that was signed.
        action: String,
        /// Identity of the stored manifest.
        manifest_id: String,
    },
    /// One manifest was verified.
    ProvenanceVerified {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: i64,
        /// Identity of the verified manifest.
        manifest_id: String,
        /// Verification outcome.
        verified: bool,
    },
    /// One kill-switch toggle was applied.
    KillSwitch {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: i64,
        /// Tenant whose tools were toggled.
        tenant: String,
        /// Tool filter, when one was given.
        tool: Option<String>,
        /// New `is_active` value applied.
        active: bool,
        /// Operator-supplied reason, when one was given.
        reason: Option<String>,
        /// Identifiers of every affected tool.
        affected_tools: Vec<String>,
    },
}

impl AuditEvent {
    /// Returns the current emission timestamp.
    #[must_use]
    pub fn now_ms() -> i64 {
        unix_millis_now()
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for audit events.
pub trait AuditSink {
    /// Emits one audit event. Sinks must not panic on delivery failure.
    fn emit(&self, event: &AuditEvent);
}

/// Shared handle to an audit sink.
pub type SharedAuditSink = Arc<dyn AuditSink + Send + Sync>;

/// Audit sink writing one JSON object per line to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn emit(&self, event: &AuditEvent) {
        if let Ok(line) = serde_json::to_string(event) {
            let mut stderr = io::stderr().lock();
            let _ = stderr.write_all(line.as_bytes());
            let _ = stderr.write_all(b"\n");
        }
    }
}

/// Audit sink that discards events; used by tests and embedders.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn emit(&self, _event: &AuditEvent) {}
}
