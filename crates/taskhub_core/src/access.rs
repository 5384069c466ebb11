//! Authorization predicates for tasks and groups.
//!
//! # Responsibility
//! - Decide, from already-loaded records, which actions an actor may take.
//!
//! # Invariants
//! - Predicates are pure and never error; callers map `false` to an
//!   access-denied outcome without mutating state.
//! - `GroupRelation` must be resolved against the task's own group; for a
//!   personal task it is `GroupRelation::default()`.

use crate::model::group::Group;
use crate::model::task::Task;
use crate::model::user::UserId;

/// The actor's relationship to a task's surrounding group, resolved from
/// storage by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupRelation {
    /// Actor is the admin of the task's group.
    pub is_admin: bool,
    /// Actor holds a membership row in the task's group.
    pub is_member: bool,
}

/// Whether the actor may see this task at all.
///
/// Owner, assignee, group admin and group members qualify. Every list and
/// detail read is scoped by this predicate.
pub fn can_view_task(actor: UserId, task: &Task, relation: GroupRelation) -> bool {
    task.owner == actor || task.assignee == Some(actor) || relation.is_admin || relation.is_member
}

/// Whether the actor may edit or delete this task.
///
/// Narrower than [`can_view_task`]: plain assignees and ordinary group
/// members may only complete, not edit or delete.
pub fn can_modify_task(actor: UserId, task: &Task, relation: GroupRelation) -> bool {
    task.owner == actor || relation.is_admin
}

/// Whether the actor may mark this task complete.
///
/// Anyone who can see a task may complete it.
pub fn can_complete_task(actor: UserId, task: &Task, relation: GroupRelation) -> bool {
    can_view_task(actor, task, relation)
}

/// Whether the actor may rename, delete, or manage members of this group.
///
/// Strictly admin-only; there is no delegation.
pub fn can_administer_group(actor: UserId, group: &Group) -> bool {
    group.admin == actor
}

/// Whether the actor may see this group's detail (members and tasks).
pub fn can_view_group(actor: UserId, group: &Group, is_member: bool) -> bool {
    group.admin == actor || is_member
}
