//! User detachment service.
//!
//! # Responsibility
//! - Reconcile core records after an identity is removed from the external
//!   identity store.
//!
//! # Invariants
//! - Groups administered by the user are deleted with their full cascade.
//! - Owned tasks are deleted; mere assignments are cleared, not deleted.
//! - No membership row survives for a detached user.

use crate::model::now_epoch_ms;
use crate::model::user::UserId;
use crate::repo::group_repo::{GroupRepoError, GroupRepository};
use crate::repo::task_repo::{TaskRepoError, TaskRepository};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type UserServiceResult<T> = Result<T, UserServiceError>;

/// Errors from user detachment.
#[derive(Debug)]
pub enum UserServiceError {
    Group(GroupRepoError),
    Task(TaskRepoError),
}

impl Display for UserServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Group(err) => write!(f, "{err}"),
            Self::Task(err) => write!(f, "{err}"),
        }
    }
}

impl Error for UserServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Group(err) => Some(err),
            Self::Task(err) => Some(err),
        }
    }
}

impl From<GroupRepoError> for UserServiceError {
    fn from(value: GroupRepoError) -> Self {
        Self::Group(value)
    }
}

impl From<TaskRepoError> for UserServiceError {
    fn from(value: TaskRepoError) -> Self {
        Self::Task(value)
    }
}

/// Row counts affected by one detachment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetachSummary {
    pub groups_deleted: usize,
    pub tasks_deleted: usize,
    pub assignments_cleared: usize,
    pub memberships_removed: usize,
}

/// Use-case service reconciling records after external user removal.
pub struct UserService<G: GroupRepository, T: TaskRepository> {
    groups: G,
    tasks: T,
}

impl<G: GroupRepository, T: TaskRepository> UserService<G, T> {
    pub fn new(groups: G, tasks: T) -> Self {
        Self { groups, tasks }
    }

    /// Removes every record tied to a user whose identity is gone.
    ///
    /// Administered groups go first (cascading their tasks and memberships),
    /// then remaining owned tasks, then assignment references, then leftover
    /// memberships.
    pub fn detach_user(&self, user: UserId) -> UserServiceResult<DetachSummary> {
        let administered = self.groups.list_groups_administered_by(user)?;
        let groups_deleted = administered.len();
        for group in &administered {
            self.groups.delete_group(group.uuid)?;
        }

        let tasks_deleted = self.tasks.delete_tasks_owned_by(user)?;
        let assignments_cleared = self.tasks.clear_assignee(user, now_epoch_ms())?;
        let memberships_removed = self.groups.delete_memberships_of_user(user)?;

        let summary = DetachSummary {
            groups_deleted,
            tasks_deleted,
            assignments_cleared,
            memberships_removed,
        };
        info!(
            "event=user_detach module=service status=ok user={} groups={} tasks={} assignments={} memberships={}",
            user, groups_deleted, tasks_deleted, assignments_cleared, memberships_removed
        );
        Ok(summary)
    }
}
