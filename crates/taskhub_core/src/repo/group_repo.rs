//! Group and membership repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide persistence APIs for groups and membership rows.
//! - Own the transactional write batches: group creation with admin
//!   self-membership, membership delta application, and the explicit
//!   group-deletion cascade.
//!
//! # Invariants
//! - A group row never exists without its admin's membership row.
//! - Membership adds are idempotent; a duplicate add is a benign no-op.
//! - Deleting a group removes its tasks and memberships in the same
//!   transaction.

use crate::db::DbError;
use crate::model::group::{Group, GroupId, Membership, MembershipDelta};
use crate::model::user::UserId;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type GroupRepoResult<T> = Result<T, GroupRepoError>;

/// Errors from group/membership persistence operations.
#[derive(Debug)]
pub enum GroupRepoError {
    Db(DbError),
    NotFound(GroupId),
    /// Another group already carries this name.
    DuplicateName(String),
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for GroupRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "group not found: {id}"),
            Self::DuplicateName(name) => write!(f, "group name already taken: `{name}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted group data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "group repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "group repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for GroupRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for GroupRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for GroupRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for group and membership operations.
pub trait GroupRepository {
    /// Creates the group row and the admin's self-membership in one
    /// transaction.
    fn create_group(&self, group: &Group) -> GroupRepoResult<GroupId>;
    fn get_group(&self, id: GroupId) -> GroupRepoResult<Option<Group>>;
    /// Groups the user admins or is a member of, ordered by name.
    fn list_groups_for_user(&self, user: UserId) -> GroupRepoResult<Vec<Group>>;
    fn list_groups_administered_by(&self, user: UserId) -> GroupRepoResult<Vec<Group>>;
    fn rename_group(&self, id: GroupId, name: &str) -> GroupRepoResult<()>;
    /// Deletes the group, its tasks, and its memberships in one transaction.
    fn delete_group(&self, id: GroupId) -> GroupRepoResult<()>;
    fn list_members(&self, group: GroupId) -> GroupRepoResult<Vec<Membership>>;
    fn is_member(&self, group: GroupId, user: UserId) -> GroupRepoResult<bool>;
    /// Applies a planned membership delta in one transaction. Adds use
    /// `INSERT OR IGNORE`, so replaying a delta never raises a uniqueness
    /// failure.
    fn apply_membership_delta(
        &self,
        group: GroupId,
        delta: &MembershipDelta,
        date_joined: i64,
    ) -> GroupRepoResult<()>;
    /// Removes every membership row of one user. Returns the removed count.
    fn delete_memberships_of_user(&self, user: UserId) -> GroupRepoResult<usize>;
}

/// SQLite-backed group repository.
pub struct SqliteGroupRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGroupRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> GroupRepoResult<Self> {
        ensure_group_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl GroupRepository for SqliteGroupRepository<'_> {
    fn create_group(&self, group: &Group) -> GroupRepoResult<GroupId> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO groups (uuid, name, admin_uuid, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                group.uuid.to_string(),
                group.name.as_str(),
                group.admin.to_string(),
                group.created_at,
            ],
        )
        .map_err(|err| map_constraint(err, &group.name))?;

        tx.execute(
            "INSERT INTO memberships (group_uuid, user_uuid, date_joined)
             VALUES (?1, ?2, ?3);",
            params![
                group.uuid.to_string(),
                group.admin.to_string(),
                group.created_at,
            ],
        )?;

        tx.commit()?;
        Ok(group.uuid)
    }

    fn get_group(&self, id: GroupId) -> GroupRepoResult<Option<Group>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GROUP_SELECT_SQL}
             WHERE uuid = ?1;"
        ))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_group_row(row)?));
        }

        Ok(None)
    }

    fn list_groups_for_user(&self, user: UserId) -> GroupRepoResult<Vec<Group>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT
                g.uuid,
                g.name,
                g.admin_uuid,
                g.created_at
             FROM groups g
             LEFT JOIN memberships m
                ON m.group_uuid = g.uuid AND m.user_uuid = ?1
             WHERE g.admin_uuid = ?1 OR m.user_uuid IS NOT NULL
             ORDER BY g.name ASC;",
        )?;

        let mut rows = stmt.query([user.to_string()])?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next()? {
            groups.push(parse_group_row(row)?);
        }
        Ok(groups)
    }

    fn list_groups_administered_by(&self, user: UserId) -> GroupRepoResult<Vec<Group>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GROUP_SELECT_SQL}
             WHERE admin_uuid = ?1
             ORDER BY name ASC;"
        ))?;

        let mut rows = stmt.query([user.to_string()])?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next()? {
            groups.push(parse_group_row(row)?);
        }
        Ok(groups)
    }

    fn rename_group(&self, id: GroupId, name: &str) -> GroupRepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE groups SET name = ?2 WHERE uuid = ?1;",
                params![id.to_string(), name],
            )
            .map_err(|err| map_constraint(err, name))?;

        if changed == 0 {
            return Err(GroupRepoError::NotFound(id));
        }

        Ok(())
    }

    fn delete_group(&self, id: GroupId) -> GroupRepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !group_exists_in_tx(&tx, id)? {
            return Err(GroupRepoError::NotFound(id));
        }

        // The cascade is deliberate and visible: tasks cannot outlive their
        // group, and memberships go with it.
        tx.execute(
            "DELETE FROM tasks WHERE group_uuid = ?1;",
            [id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM memberships WHERE group_uuid = ?1;",
            [id.to_string()],
        )?;
        tx.execute("DELETE FROM groups WHERE uuid = ?1;", [id.to_string()])?;

        tx.commit()?;
        Ok(())
    }

    fn list_members(&self, group: GroupId) -> GroupRepoResult<Vec<Membership>> {
        let mut stmt = self.conn.prepare(
            "SELECT group_uuid, user_uuid, date_joined
             FROM memberships
             WHERE group_uuid = ?1
             ORDER BY date_joined ASC, user_uuid ASC;",
        )?;

        let mut rows = stmt.query([group.to_string()])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            let group_text: String = row.get("group_uuid")?;
            let user_text: String = row.get("user_uuid")?;
            members.push(Membership {
                group: parse_uuid(&group_text, "memberships.group_uuid")?,
                user: parse_uuid(&user_text, "memberships.user_uuid")?,
                date_joined: row.get("date_joined")?,
            });
        }
        Ok(members)
    }

    fn is_member(&self, group: GroupId, user: UserId) -> GroupRepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM memberships
                WHERE group_uuid = ?1 AND user_uuid = ?2
            );",
            params![group.to_string(), user.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn apply_membership_delta(
        &self,
        group: GroupId,
        delta: &MembershipDelta,
        date_joined: i64,
    ) -> GroupRepoResult<()> {
        let group_text = group.to_string();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !group_exists_in_tx(&tx, group)? {
            return Err(GroupRepoError::NotFound(group));
        }

        for user in &delta.to_add {
            tx.execute(
                "INSERT OR IGNORE INTO memberships (group_uuid, user_uuid, date_joined)
                 VALUES (?1, ?2, ?3);",
                params![group_text.as_str(), user.to_string(), date_joined],
            )?;
        }

        for user in &delta.to_remove {
            tx.execute(
                "DELETE FROM memberships WHERE group_uuid = ?1 AND user_uuid = ?2;",
                params![group_text.as_str(), user.to_string()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_memberships_of_user(&self, user: UserId) -> GroupRepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM memberships WHERE user_uuid = ?1;",
            [user.to_string()],
        )?;
        Ok(changed)
    }
}

const GROUP_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    admin_uuid,
    created_at
FROM groups";

fn parse_group_row(row: &Row<'_>) -> GroupRepoResult<Group> {
    let uuid_text: String = row.get("uuid")?;
    let admin_text: String = row.get("admin_uuid")?;

    Ok(Group {
        uuid: parse_uuid(&uuid_text, "groups.uuid")?,
        name: row.get("name")?,
        admin: parse_uuid(&admin_text, "groups.admin_uuid")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_uuid(value: &str, context: &str) -> GroupRepoResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| {
        GroupRepoError::InvalidData(format!("invalid uuid value `{value}` in {context}"))
    })
}

fn group_exists_in_tx(tx: &Transaction<'_>, id: GroupId) -> GroupRepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM groups WHERE uuid = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Maps a unique-constraint failure on `groups.name` to `DuplicateName`.
fn map_constraint(err: rusqlite::Error, name: &str) -> GroupRepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            GroupRepoError::DuplicateName(name.to_string())
        }
        _ => GroupRepoError::Db(DbError::Sqlite(err)),
    }
}

fn ensure_group_connection_ready(conn: &Connection) -> GroupRepoResult<()> {
    for table in ["groups", "memberships", "tasks"] {
        if !table_exists(conn, table)? {
            return Err(GroupRepoError::MissingRequiredTable(table));
        }
    }

    for column in ["uuid", "name", "admin_uuid", "created_at"] {
        if !table_has_column(conn, "groups", column)? {
            return Err(GroupRepoError::MissingRequiredColumn {
                table: "groups",
                column,
            });
        }
    }

    for column in ["group_uuid", "user_uuid", "date_joined"] {
        if !table_has_column(conn, "memberships", column)? {
            return Err(GroupRepoError::MissingRequiredColumn {
                table: "memberships",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> GroupRepoResult<bool> {
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

fn table_has_column(conn: &Connection, table: &str, column: &str) -> GroupRepoResult<bool> {
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
