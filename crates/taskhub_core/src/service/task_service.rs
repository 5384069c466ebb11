//! Task use-case service.
//!
//! # Responsibility
//! - Enforce the access predicates on every task operation.
//! - Apply owner/assignee defaulting at creation time.
//! - Run the overdue derivation exactly once per save, after all other field
//!   mutations and before the write.
//!
//! # Invariants
//! - The owner is always the acting user at creation; it is never taken from
//!   the request.
//! - `Overdue` is rejected as direct status input.
//! - Changing the due date of an overdue task is owner-only.

use crate::access::{can_complete_task, can_modify_task, can_view_task, GroupRelation};
use crate::model::group::GroupId;
use crate::model::task::{Task, TaskId, TaskStatus};
use crate::model::user::UserId;
use crate::model::{now_epoch_ms, today};
use crate::repo::group_repo::{GroupRepoError, GroupRepository};
use crate::repo::task_repo::{StatusFilter, TaskListQuery, TaskRepoError, TaskRepository};
use chrono::NaiveDate;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

/// Errors from task use-case operations.
#[derive(Debug)]
pub enum TaskServiceError {
    /// Referenced task does not exist.
    TaskNotFound(TaskId),
    /// Referenced group does not exist.
    GroupNotFound(GroupId),
    /// An access predicate returned false; nothing was written.
    PermissionDenied(TaskId),
    /// Title is blank after trim.
    InvalidTitle,
    /// Overdue was supplied as direct status input.
    OverdueNotSettable(TaskId),
    /// Only the owner may change the due date of an overdue task.
    DueDateLocked(TaskId),
    /// Task persistence failure.
    Task(TaskRepoError),
    /// Group/membership persistence failure.
    Group(GroupRepoError),
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::GroupNotFound(id) => write!(f, "group not found: {id}"),
            Self::PermissionDenied(id) => {
                write!(f, "not permitted to perform this action on task {id}")
            }
            Self::InvalidTitle => write!(f, "task title must not be blank"),
            Self::OverdueNotSettable(id) => {
                write!(f, "overdue status is derived and cannot be set on task {id}")
            }
            Self::DueDateLocked(id) => write!(
                f,
                "only the owner can change the due date of overdue task {id}"
            ),
            Self::Task(err) => write!(f, "{err}"),
            Self::Group(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Task(err) => Some(err),
            Self::Group(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskRepoError> for TaskServiceError {
    fn from(value: TaskRepoError) -> Self {
        match value {
            TaskRepoError::NotFound(id) => Self::TaskNotFound(id),
            other => Self::Task(other),
        }
    }
}

impl From<GroupRepoError> for TaskServiceError {
    fn from(value: GroupRepoError) -> Self {
        match value {
            GroupRepoError::NotFound(id) => Self::GroupNotFound(id),
            other => Self::Group(other),
        }
    }
}

/// Request model for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaskRequest {
    pub title: String,
    pub description: String,
    /// Explicit assignee; when absent the defaulting rules apply.
    pub assignee: Option<UserId>,
    /// Group to attach the task to; `None` for a personal task.
    pub group: Option<GroupId>,
    pub due_date: Option<NaiveDate>,
}

impl NewTaskRequest {
    /// Minimal personal-task request.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            assignee: None,
            group: None,
            due_date: None,
        }
    }
}

/// Request model for a full-replacement task update.
///
/// Group attachment and ownership are immutable and carry no field here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskUpdateRequest {
    pub title: String,
    pub description: String,
    pub assignee: Option<UserId>,
    pub due_date: Option<NaiveDate>,
    /// `Ongoing` or `Completed`; also the explicit way to move an overdue
    /// task back to `Ongoing`.
    pub status: TaskStatus,
}

/// Which defaulting branch decided the assignee of a created task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssigneeResolution {
    /// The request named an assignee; taken as-is.
    Explicit,
    /// Defaulted to the creating actor.
    SelfAssigned,
    /// Group task created by a non-member with no assignee named; the caller
    /// should surface a warning.
    LeftUnassigned,
}

/// Creation outcome: the stored task plus the applied assignee branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTask {
    pub task: Task,
    pub assignee: AssigneeResolution,
}

/// Completion outcome; `AlreadyCompleted` is informational, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed,
    AlreadyCompleted,
}

/// Use-case service for task operations.
pub struct TaskService<T: TaskRepository, G: GroupRepository> {
    tasks: T,
    groups: G,
}

impl<T: TaskRepository, G: GroupRepository> TaskService<T, G> {
    pub fn new(tasks: T, groups: G) -> Self {
        Self { tasks, groups }
    }

    /// Creates a task owned by `actor`.
    ///
    /// # Contract
    /// - A supplied group id must exist; otherwise `GroupNotFound`.
    /// - Assignee defaulting: personal tasks self-assign; group tasks
    ///   self-assign only when the actor is a member, and are otherwise left
    ///   unassigned with `AssigneeResolution::LeftUnassigned`.
    /// - An explicit assignee is taken as-is, membership unchecked.
    pub fn create_task(
        &self,
        actor: UserId,
        request: &NewTaskRequest,
    ) -> TaskServiceResult<CreatedTask> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(TaskServiceError::InvalidTitle);
        }

        if let Some(group_id) = request.group {
            self.require_group(group_id)?;
        }

        let mut task = Task::new(actor, title, now_epoch_ms());
        task.description = request.description.clone();
        task.group = request.group;
        task.due_date = request.due_date;

        let resolution = match (request.group, request.assignee) {
            (_, Some(assignee)) => {
                task.assignee = Some(assignee);
                AssigneeResolution::Explicit
            }
            (None, None) => {
                task.assignee = Some(actor);
                AssigneeResolution::SelfAssigned
            }
            (Some(group_id), None) => {
                // The admin always holds a membership row, so one probe
                // covers both the member and admin cases.
                if self.groups.is_member(group_id, actor)? {
                    task.assignee = Some(actor);
                    AssigneeResolution::SelfAssigned
                } else {
                    AssigneeResolution::LeftUnassigned
                }
            }
        };

        task.refresh_status(today());
        self.tasks.create_task(&task)?;

        info!(
            "event=task_create module=service status=ok task={} owner={} grouped={} resolution={:?}",
            task.uuid,
            task.owner,
            task.group.is_some(),
            resolution
        );

        Ok(CreatedTask {
            task,
            assignee: resolution,
        })
    }

    /// Loads one task, enforcing view access.
    pub fn get_task(&self, actor: UserId, id: TaskId) -> TaskServiceResult<Task> {
        let task = self
            .tasks
            .get_task(id)?
            .ok_or(TaskServiceError::TaskNotFound(id))?;
        let relation = self.relation_for(actor, &task)?;
        if !can_view_task(actor, &task, relation) {
            return Err(TaskServiceError::PermissionDenied(id));
        }
        Ok(task)
    }

    /// Lists tasks visible to `actor` under the given filters.
    ///
    /// Visibility scoping happens in the query itself; an actor never
    /// receives a row the view predicate would reject.
    pub fn list_tasks(
        &self,
        actor: UserId,
        status: StatusFilter,
        group: Option<GroupId>,
    ) -> TaskServiceResult<Vec<Task>> {
        let query = TaskListQuery {
            viewer: actor,
            status,
            group,
            today: today(),
        };
        Ok(self.tasks.list_tasks(&query)?)
    }

    /// Applies a full-replacement update; owner or group admin only.
    pub fn update_task(
        &self,
        actor: UserId,
        id: TaskId,
        request: &TaskUpdateRequest,
    ) -> TaskServiceResult<Task> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(TaskServiceError::InvalidTitle);
        }

        let mut task = self
            .tasks
            .get_task(id)?
            .ok_or(TaskServiceError::TaskNotFound(id))?;
        let relation = self.relation_for(actor, &task)?;
        if !can_modify_task(actor, &task, relation) {
            return Err(TaskServiceError::PermissionDenied(id));
        }

        // Resubmitting a stored Overdue unchanged is not user input of
        // Overdue; any other path to it is.
        if request.status == TaskStatus::Overdue && task.status != TaskStatus::Overdue {
            return Err(TaskServiceError::OverdueNotSettable(id));
        }
        if request.due_date != task.due_date
            && task.status == TaskStatus::Overdue
            && task.owner != actor
        {
            return Err(TaskServiceError::DueDateLocked(id));
        }

        task.title = title.to_string();
        task.description = request.description.clone();
        task.assignee = request.assignee;
        task.due_date = request.due_date;
        task.status = request.status;
        task.touch(now_epoch_ms());
        task.refresh_status(today());
        self.tasks.update_task(&task)?;

        Ok(task)
    }

    /// Marks a task complete; idempotent.
    ///
    /// Anyone who can view the task may complete it. An already-completed
    /// task reports `AlreadyCompleted` without a write.
    pub fn mark_complete(&self, actor: UserId, id: TaskId) -> TaskServiceResult<CompletionOutcome> {
        let mut task = self
            .tasks
            .get_task(id)?
            .ok_or(TaskServiceError::TaskNotFound(id))?;
        let relation = self.relation_for(actor, &task)?;
        if !can_complete_task(actor, &task, relation) {
            return Err(TaskServiceError::PermissionDenied(id));
        }

        if task.is_completed() {
            return Ok(CompletionOutcome::AlreadyCompleted);
        }

        task.status = TaskStatus::Completed;
        task.touch(now_epoch_ms());
        task.refresh_status(today());
        self.tasks.update_task(&task)?;

        info!(
            "event=task_complete module=service status=ok task={} actor={}",
            id, actor
        );
        Ok(CompletionOutcome::Completed)
    }

    /// Deletes a task; owner or group admin only.
    pub fn delete_task(&self, actor: UserId, id: TaskId) -> TaskServiceResult<()> {
        let task = self
            .tasks
            .get_task(id)?
            .ok_or(TaskServiceError::TaskNotFound(id))?;
        let relation = self.relation_for(actor, &task)?;
        if !can_modify_task(actor, &task, relation) {
            return Err(TaskServiceError::PermissionDenied(id));
        }

        self.tasks.delete_task(id)?;
        info!(
            "event=task_delete module=service status=ok task={} actor={}",
            id, actor
        );
        Ok(())
    }

    fn require_group(&self, id: GroupId) -> TaskServiceResult<crate::model::group::Group> {
        self.groups
            .get_group(id)?
            .ok_or(TaskServiceError::GroupNotFound(id))
    }

    /// Resolves the actor's relation to the task's group, if any.
    fn relation_for(&self, actor: UserId, task: &Task) -> TaskServiceResult<GroupRelation> {
        match task.group {
            None => Ok(GroupRelation::default()),
            Some(group_id) => {
                let group = self.require_group(group_id)?;
                Ok(GroupRelation {
                    is_admin: group.admin == actor,
                    is_member: self.groups.is_member(group_id, actor)?,
                })
            }
        }
    }
}
