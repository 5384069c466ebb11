//! Group use-case service.
//!
//! # Responsibility
//! - Provide group create/rename/delete and member management APIs.
//! - Enforce admin-only administration and member-or-admin visibility.
//!
//! # Invariants
//! - Group creation and the admin's self-membership are one atomic unit.
//! - Member reconciliation never removes the admin and is all-or-nothing.

use crate::access::{can_administer_group, can_view_group};
use crate::model::group::{
    plan_membership_update, Group, GroupId, Membership, MembershipDelta,
};
use crate::model::now_epoch_ms;
use crate::model::user::UserId;
use crate::repo::group_repo::{GroupRepoError, GroupRepository};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type GroupServiceResult<T> = Result<T, GroupServiceError>;

/// Errors from group use-case operations.
#[derive(Debug)]
pub enum GroupServiceError {
    /// Referenced group does not exist.
    GroupNotFound(GroupId),
    /// Actor is not allowed to perform this action on the group.
    PermissionDenied(GroupId),
    /// Another group already carries this name.
    DuplicateName(String),
    /// Name is blank after trim.
    InvalidName,
    /// Persistence-layer failure.
    Repo(GroupRepoError),
}

impl Display for GroupServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GroupNotFound(id) => write!(f, "group not found: {id}"),
            Self::PermissionDenied(id) => {
                write!(f, "not permitted to perform this action on group {id}")
            }
            Self::DuplicateName(name) => write!(f, "group name already taken: `{name}`"),
            Self::InvalidName => write!(f, "group name must not be blank"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GroupServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GroupRepoError> for GroupServiceError {
    fn from(value: GroupRepoError) -> Self {
        match value {
            GroupRepoError::NotFound(id) => Self::GroupNotFound(id),
            GroupRepoError::DuplicateName(name) => Self::DuplicateName(name),
            other => Self::Repo(other),
        }
    }
}

/// Group detail read model: the group, its members, and whether the actor
/// administers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDetail {
    pub group: Group,
    pub members: Vec<Membership>,
    pub is_admin: bool,
}

/// Use-case service for group operations.
pub struct GroupService<R: GroupRepository> {
    repo: R,
}

impl<R: GroupRepository> GroupService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a group administered by `actor`.
    ///
    /// The admin's self-membership is written in the same transaction as the
    /// group row; a group never exists without its admin as member.
    pub fn create_group(&self, actor: UserId, name: &str) -> GroupServiceResult<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GroupServiceError::InvalidName);
        }

        let group = Group::new(name, actor, now_epoch_ms());
        self.repo.create_group(&group)?;

        info!(
            "event=group_create module=service status=ok group={} admin={}",
            group.uuid, actor
        );
        Ok(group)
    }

    /// Lists groups the actor admins or is a member of, ordered by name.
    pub fn list_groups(&self, actor: UserId) -> GroupServiceResult<Vec<Group>> {
        Ok(self.repo.list_groups_for_user(actor)?)
    }

    /// Loads one group with its member list; members and admin only.
    pub fn group_detail(&self, actor: UserId, id: GroupId) -> GroupServiceResult<GroupDetail> {
        let group = self.require_group(id)?;
        let is_member = self.repo.is_member(id, actor)?;
        if !can_view_group(actor, &group, is_member) {
            return Err(GroupServiceError::PermissionDenied(id));
        }

        let members = self.repo.list_members(id)?;
        Ok(GroupDetail {
            is_admin: group.admin == actor,
            group,
            members,
        })
    }

    /// Renames a group; admin only.
    pub fn rename_group(
        &self,
        actor: UserId,
        id: GroupId,
        name: &str,
    ) -> GroupServiceResult<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GroupServiceError::InvalidName);
        }

        let mut group = self.require_group(id)?;
        if !can_administer_group(actor, &group) {
            return Err(GroupServiceError::PermissionDenied(id));
        }

        self.repo.rename_group(id, name)?;
        group.name = name.to_string();
        Ok(group)
    }

    /// Deletes a group with its tasks and memberships; admin only.
    pub fn delete_group(&self, actor: UserId, id: GroupId) -> GroupServiceResult<()> {
        let group = self.require_group(id)?;
        if !can_administer_group(actor, &group) {
            return Err(GroupServiceError::PermissionDenied(id));
        }

        self.repo.delete_group(id)?;
        info!(
            "event=group_delete module=service status=ok group={} admin={}",
            id, actor
        );
        Ok(())
    }

    /// Reconciles the member set against `desired_members`; admin only.
    ///
    /// The admin is forced into the target set even when omitted. Returns
    /// the applied delta; an empty delta means the call changed nothing.
    pub fn update_members(
        &self,
        actor: UserId,
        id: GroupId,
        desired_members: &[UserId],
    ) -> GroupServiceResult<MembershipDelta> {
        let group = self.require_group(id)?;
        if !can_administer_group(actor, &group) {
            return Err(GroupServiceError::PermissionDenied(id));
        }

        let current: Vec<UserId> = self
            .repo
            .list_members(id)?
            .into_iter()
            .map(|membership| membership.user)
            .filter(|user| *user != group.admin)
            .collect();

        let delta = plan_membership_update(group.admin, &current, desired_members);
        if !delta.is_empty() {
            self.repo
                .apply_membership_delta(id, &delta, now_epoch_ms())?;
        }

        info!(
            "event=group_members_update module=service status=ok group={} added={} removed={}",
            id,
            delta.to_add.len(),
            delta.to_remove.len()
        );
        Ok(delta)
    }

    fn require_group(&self, id: GroupId) -> GroupServiceResult<Group> {
        self.repo
            .get_group(id)?
            .ok_or(GroupServiceError::GroupNotFound(id))
    }
}
