//! Task domain model and status derivation.
//!
//! # Responsibility
//! - Define the `Task` record and its lifecycle status.
//! - Implement the overdue-derivation rule applied before every save.
//!
//! # Invariants
//! - `Overdue` is derived, never accepted from direct user input.
//! - The derivation fires only off the `Ongoing` state: a `Completed` task is
//!   never auto-reverted, and an `Overdue` task stays `Overdue` until its
//!   status is reset explicitly, regardless of later due-date edits.

use crate::model::group::GroupId;
use crate::model::user::UserId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a task.
pub type TaskId = Uuid;

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Open and actionable.
    Ongoing,
    /// Finished; terminal for automatic transitions.
    Completed,
    /// Due date passed while the task was still ongoing. Derived only.
    Overdue,
}

/// Owned, optionally assigned, optionally grouped work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable global ID.
    pub uuid: TaskId,
    /// Short description of the task.
    pub title: String,
    /// Detailed description; may be empty.
    pub description: String,
    /// The user who created the task. Never changes.
    pub owner: UserId,
    /// The user currently responsible for completing the task.
    pub assignee: Option<UserId>,
    /// The group this task belongs to; `None` for personal tasks.
    pub group: Option<GroupId>,
    pub status: TaskStatus,
    /// Optional calendar due date.
    pub due_date: Option<NaiveDate>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms last-save timestamp.
    pub updated_at: i64,
}

impl Task {
    /// Creates a new ongoing task with a generated stable ID.
    ///
    /// Optional fields start absent; `created_at` and `updated_at` are both
    /// set to the provided timestamp.
    pub fn new(owner: UserId, title: impl Into<String>, created_at: i64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            owner,
            assignee: None,
            group: None,
            status: TaskStatus::Ongoing,
            due_date: None,
            created_at,
            updated_at: created_at,
        }
    }

    /// Recomputes the derived overdue state.
    ///
    /// # Contract
    /// - Fires only when `status == Ongoing` and `due_date` is strictly
    ///   before `today`.
    /// - Every save path must call this exactly once, after all other field
    ///   mutations and before the write.
    pub fn refresh_status(&mut self, today: NaiveDate) {
        if self.status != TaskStatus::Ongoing {
            return;
        }
        if let Some(due) = self.due_date {
            if due < today {
                self.status = TaskStatus::Overdue;
            }
        }
    }

    /// Stamps the last-save timestamp.
    pub fn touch(&mut self, updated_at: i64) {
        self.updated_at = updated_at;
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}
