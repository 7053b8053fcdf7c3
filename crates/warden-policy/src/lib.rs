// crates/warden-policy/src/lib.rs
// ============================================================================
// Module: Warden Policy Library
// Description: Public API surface for policy decisions.
// Purpose: Expose the decision client and normalized decision types.
// Dependencies: crate::{client, decision}
// ============================================================================

//! ## Overview
//! Warden policy translates a governance question into a policy-engine query
//! and a normalized decision. The evaluator is an external HTTP service; this
//! crate owns the wire contract, the failure taxonomy, and the normalization
//! from raw results into typed decisions. An evaluator failure is never a
//! decision.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod decision;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::PolicyClient;
pub use client::PolicyClientConfig;
pub use client::PolicyDecisionError;
pub use decision::Decision;
pub use decision::PolicyInput;
