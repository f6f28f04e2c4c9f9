//! Campaign-centric domain model.
//!
//! # Responsibility
//! - Define the canonical records shared by registry and attribution code.
//! - Keep keyed embedded lists (TTPs, campaign attributions) structural, so
//!   membership checks never depend on call-site scanning policy.
//!
//! # Invariants
//! - Every campaign and top-level object is identified by a stable UUID.
//! - Campaign deletion is a hard delete; there are no tombstones.
//! - One top-level object embeds at most one attribution per campaign name.

pub mod attribution;
pub mod campaign;
pub mod object;
pub mod relationship;

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current wall-clock time in epoch milliseconds.
///
/// Falls back to `0` when the system clock is set before the unix epoch.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
