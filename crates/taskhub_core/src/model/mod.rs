//! Domain model for users, groups, memberships and tasks.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Host the pure decision logic attached to those structures: the
//!   overdue-derivation rule and the membership reconciliation planner.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Timestamps are explicit epoch-millisecond fields stamped by core code,
//!   never storage-layer defaults.

use chrono::{Local, NaiveDate, Utc};

pub mod group;
pub mod task;
pub mod user;

/// Returns the current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Returns the current calendar date in local time.
///
/// Due dates are calendar dates; "overdue" means the due date is strictly
/// before this value.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
