//! Task repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `tasks` storage.
//! - Own the visibility-scoped list query and its status filters.
//!
//! # Invariants
//! - `list_tasks` only returns rows the viewer is related to (owner,
//!   assignee, group member, group admin).
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::group::GroupId;
use crate::model::task::{Task, TaskId, TaskStatus};
use crate::model::user::UserId;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type TaskRepoResult<T> = Result<T, TaskRepoError>;

/// Errors from task persistence and query operations.
#[derive(Debug)]
pub enum TaskRepoError {
    Db(DbError),
    NotFound(TaskId),
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for TaskRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "task repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "task repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for TaskRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for TaskRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for TaskRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Status restriction applied by `list_tasks`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    /// Ongoing tasks whose due date has not passed. Default list view.
    #[default]
    Current,
    /// All ongoing tasks, past-due included.
    Ongoing,
    Completed,
    /// Tasks persisted as overdue, plus ongoing tasks whose due date has
    /// passed but which have not been re-saved yet.
    Overdue,
    All,
}

/// Query options for the visibility-scoped task list.
#[derive(Debug, Clone)]
pub struct TaskListQuery {
    /// Actor whose visibility scopes the result.
    pub viewer: UserId,
    pub status: StatusFilter,
    /// Restrict to one group's tasks.
    pub group: Option<GroupId>,
    /// Reference date for due-date comparisons.
    pub today: NaiveDate,
}

impl TaskListQuery {
    /// Default-filter query for one viewer.
    pub fn for_viewer(viewer: UserId, today: NaiveDate) -> Self {
        Self {
            viewer,
            status: StatusFilter::default(),
            group: None,
            today,
        }
    }
}

/// Repository interface for task CRUD and queries.
pub trait TaskRepository {
    fn create_task(&self, task: &Task) -> TaskRepoResult<TaskId>;
    fn update_task(&self, task: &Task) -> TaskRepoResult<()>;
    fn get_task(&self, id: TaskId) -> TaskRepoResult<Option<Task>>;
    fn list_tasks(&self, query: &TaskListQuery) -> TaskRepoResult<Vec<Task>>;
    fn delete_task(&self, id: TaskId) -> TaskRepoResult<()>;
    /// Deletes every task owned by `owner`. Returns the removed row count.
    fn delete_tasks_owned_by(&self, owner: UserId) -> TaskRepoResult<usize>;
    /// Clears the assignee on every task assigned to `assignee`.
    /// Returns the affected row count.
    fn clear_assignee(&self, assignee: UserId, updated_at: i64) -> TaskRepoResult<usize>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> TaskRepoResult<Self> {
        ensure_task_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &Task) -> TaskRepoResult<TaskId> {
        self.conn.execute(
            "INSERT INTO tasks (
                uuid,
                title,
                description,
                owner_uuid,
                assignee_uuid,
                group_uuid,
                status,
                due_date,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                task.uuid.to_string(),
                task.title.as_str(),
                task.description.as_str(),
                task.owner.to_string(),
                task.assignee.map(|id| id.to_string()),
                task.group.map(|id| id.to_string()),
                status_to_db(task.status),
                task.due_date.map(|date| date.to_string()),
                task.created_at,
                task.updated_at,
            ],
        )?;

        Ok(task.uuid)
    }

    fn update_task(&self, task: &Task) -> TaskRepoResult<()> {
        // Owner and group attachment are immutable after creation and are
        // deliberately absent from the SET list.
        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                title = ?1,
                description = ?2,
                assignee_uuid = ?3,
                status = ?4,
                due_date = ?5,
                updated_at = ?6
             WHERE uuid = ?7;",
            params![
                task.title.as_str(),
                task.description.as_str(),
                task.assignee.map(|id| id.to_string()),
                status_to_db(task.status),
                task.due_date.map(|date| date.to_string()),
                task.updated_at,
                task.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(TaskRepoError::NotFound(task.uuid));
        }

        Ok(())
    }

    fn get_task(&self, id: TaskId) -> TaskRepoResult<Option<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE uuid = ?1;"
        ))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }

        Ok(None)
    }

    fn list_tasks(&self, query: &TaskListQuery) -> TaskRepoResult<Vec<Task>> {
        // The viewer binds once as ?1 and is reused across the visibility
        // union; appended filter placeholders continue from ?2.
        let mut sql = String::from(
            "SELECT DISTINCT
                t.uuid,
                t.title,
                t.description,
                t.owner_uuid,
                t.assignee_uuid,
                t.group_uuid,
                t.status,
                t.due_date,
                t.created_at,
                t.updated_at
             FROM tasks t
             LEFT JOIN groups g ON g.uuid = t.group_uuid
             LEFT JOIN memberships m
                ON m.group_uuid = t.group_uuid AND m.user_uuid = ?1
             WHERE (
                t.owner_uuid = ?1
                OR t.assignee_uuid = ?1
                OR g.admin_uuid = ?1
                OR m.user_uuid IS NOT NULL
             )",
        );
        let mut bind_values: Vec<Value> = vec![Value::Text(query.viewer.to_string())];

        if let Some(group) = query.group {
            sql.push_str(" AND t.group_uuid = ?");
            bind_values.push(Value::Text(group.to_string()));
        }

        match query.status {
            StatusFilter::Current => {
                sql.push_str(" AND t.status = 'ongoing' AND (t.due_date IS NULL OR t.due_date >= ?)");
                bind_values.push(Value::Text(query.today.to_string()));
            }
            StatusFilter::Ongoing => sql.push_str(" AND t.status = 'ongoing'"),
            StatusFilter::Completed => sql.push_str(" AND t.status = 'completed'"),
            StatusFilter::Overdue => {
                sql.push_str(
                    " AND (
                        t.status = 'overdue'
                        OR (t.status = 'ongoing' AND t.due_date IS NOT NULL AND t.due_date < ?)
                    )",
                );
                bind_values.push(Value::Text(query.today.to_string()));
            }
            StatusFilter::All => {}
        }

        sql.push_str(" ORDER BY t.due_date IS NULL, t.due_date ASC, t.created_at DESC, t.uuid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();

        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }

        Ok(tasks)
    }

    fn delete_task(&self, id: TaskId) -> TaskRepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(TaskRepoError::NotFound(id));
        }

        Ok(())
    }

    fn delete_tasks_owned_by(&self, owner: UserId) -> TaskRepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM tasks WHERE owner_uuid = ?1;",
            [owner.to_string()],
        )?;
        Ok(changed)
    }

    fn clear_assignee(&self, assignee: UserId, updated_at: i64) -> TaskRepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET assignee_uuid = NULL,
                 updated_at = ?2
             WHERE assignee_uuid = ?1;",
            params![assignee.to_string(), updated_at],
        )?;
        Ok(changed)
    }
}

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    description,
    owner_uuid,
    assignee_uuid,
    group_uuid,
    status,
    due_date,
    created_at,
    updated_at
FROM tasks";

fn parse_task_row(row: &Row<'_>) -> TaskRepoResult<Task> {
    let uuid = parse_uuid_column(row, "uuid")?;
    let owner = parse_uuid_column(row, "owner_uuid")?;

    let assignee = match row.get::<_, Option<String>>("assignee_uuid")? {
        Some(value) => Some(parse_uuid_value(&value, "tasks.assignee_uuid")?),
        None => None,
    };
    let group = match row.get::<_, Option<String>>("group_uuid")? {
        Some(value) => Some(parse_uuid_value(&value, "tasks.group_uuid")?),
        None => None,
    };

    let status_text: String = row.get("status")?;
    let status = parse_status(&status_text).ok_or_else(|| {
        TaskRepoError::InvalidData(format!("invalid status `{status_text}` in tasks.status"))
    })?;

    let due_date = match row.get::<_, Option<String>>("due_date")? {
        Some(value) => Some(NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
            TaskRepoError::InvalidData(format!("invalid date `{value}` in tasks.due_date"))
        })?),
        None => None,
    };

    Ok(Task {
        uuid,
        title: row.get("title")?,
        description: row.get("description")?,
        owner,
        assignee,
        group,
        status,
        due_date,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_uuid_column(row: &Row<'_>, column: &'static str) -> TaskRepoResult<Uuid> {
    let value: String = row.get(column)?;
    parse_uuid_value(&value, column)
}

fn parse_uuid_value(value: &str, context: &str) -> TaskRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| TaskRepoError::InvalidData(format!("invalid uuid value `{value}` in {context}")))
}

fn status_to_db(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Ongoing => "ongoing",
        TaskStatus::Completed => "completed",
        TaskStatus::Overdue => "overdue",
    }
}

fn parse_status(value: &str) -> Option<TaskStatus> {
    match value {
        "ongoing" => Some(TaskStatus::Ongoing),
        "completed" => Some(TaskStatus::Completed),
        "overdue" => Some(TaskStatus::Overdue),
        _ => None,
    }
}

fn ensure_task_connection_ready(conn: &Connection) -> TaskRepoResult<()> {
    // The list query joins groups and memberships, so all three tables must
    // be present even for a task-only caller.
    for table in ["tasks", "groups", "memberships"] {
        if !table_exists(conn, table)? {
            return Err(TaskRepoError::MissingRequiredTable(table));
        }
    }

    for column in [
        "uuid",
        "title",
        "description",
        "owner_uuid",
        "assignee_uuid",
        "group_uuid",
        "status",
        "due_date",
        "created_at",
        "updated_at",
    ] {
        if !table_has_column(conn, "tasks", column)? {
            return Err(TaskRepoError::MissingRequiredColumn {
                table: "tasks",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> TaskRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> TaskRepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
