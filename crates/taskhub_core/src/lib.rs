//! Core domain logic for TaskHub.
//! This crate is the single source of truth for business invariants.

pub mod access;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use access::{
    can_administer_group, can_complete_task, can_modify_task, can_view_group, can_view_task,
    GroupRelation,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::group::{plan_membership_update, Group, GroupId, Membership, MembershipDelta};
pub use model::task::{Task, TaskId, TaskStatus};
pub use model::user::UserId;
pub use repo::group_repo::{
    GroupRepoError, GroupRepoResult, GroupRepository, SqliteGroupRepository,
};
pub use repo::task_repo::{
    SqliteTaskRepository, StatusFilter, TaskListQuery, TaskRepoError, TaskRepoResult,
    TaskRepository,
};
pub use service::group_service::{GroupDetail, GroupService, GroupServiceError};
pub use service::task_service::{
    AssigneeResolution, CompletionOutcome, CreatedTask, NewTaskRequest, TaskService,
    TaskServiceError, TaskUpdateRequest,
};
pub use service::user_service::{DetachSummary, UserService, UserServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
