//! Group and membership domain model.
//!
//! # Responsibility
//! - Define the `Group` and `Membership` records.
//! - Provide the pure membership reconciliation planner.
//!
//! # Invariants
//! - A group has exactly one admin, and the admin is always a member.
//! - The (group, user) membership pair is unique.

use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Stable identifier for a group.
pub type GroupId = Uuid;

/// Named collection of users with a single managing admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Stable global ID.
    pub uuid: GroupId,
    /// Unique display name.
    pub name: String,
    /// The user with exclusive management rights over this group.
    pub admin: UserId,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
}

impl Group {
    /// Creates a new group with a generated stable ID.
    pub fn new(name: impl Into<String>, admin: UserId, created_at: i64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            admin,
            created_at,
        }
    }
}

/// Join record associating one user with one group.
///
/// Distinct from admin status: the admin also carries a membership row, and
/// that row can never be removed through member management.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub group: GroupId,
    pub user: UserId,
    /// Epoch ms join timestamp.
    pub date_joined: i64,
}

/// Minimal set of membership writes turning the current member set into a
/// desired one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    /// Users to gain a membership row.
    pub to_add: Vec<UserId>,
    /// Users whose membership row is removed.
    pub to_remove: Vec<UserId>,
}

impl MembershipDelta {
    /// Returns whether applying this delta would change anything.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Plans the membership writes needed to make a group's member set match
/// `desired_members`.
///
/// # Contract
/// - The admin is unconditionally part of the target set, even when the
///   caller omits it; the admin is never planned for removal.
/// - The admin's existing membership row is never planned for re-add.
/// - Output vectors are sorted and duplicate-free, so applying the same plan
///   twice is harmless.
pub fn plan_membership_update(
    admin: UserId,
    current_members: &[UserId],
    desired_members: &[UserId],
) -> MembershipDelta {
    let mut target: BTreeSet<UserId> = desired_members.iter().copied().collect();
    target.insert(admin);

    let current: BTreeSet<UserId> = current_members
        .iter()
        .copied()
        .filter(|user| *user != admin)
        .collect();

    let to_add = target
        .iter()
        .copied()
        .filter(|user| *user != admin && !current.contains(user))
        .collect();
    let to_remove = current
        .iter()
        .copied()
        .filter(|user| !target.contains(user))
        .collect();

    MembershipDelta { to_add, to_remove }
}
