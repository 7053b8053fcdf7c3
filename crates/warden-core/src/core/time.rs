// crates/warden-core/src/core/time.rs
// ============================================================================
// Module: Warden Time Model
// Description: Millisecond timestamps for manifests and audit records.
// Purpose: Confine wall-clock access to one helper with a saturating range.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Manifest timestamps are integer milliseconds since the Unix epoch. The
//! signer captures the current time once per signing; everything downstream
//! treats the value as opaque data so verification replays deterministically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

// ============================================================================
// SECTION: Wall Clock
// ============================================================================

/// Returns the current time as milliseconds since the Unix epoch.
///
/// # Invariants
/// - Values saturate at `i64::MAX` instead of wrapping; a pre-epoch clock
///   yields zero.
#[must_use]
pub fn unix_millis_now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| {
        i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
    })
}
