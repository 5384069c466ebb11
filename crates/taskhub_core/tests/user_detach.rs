use rusqlite::Connection;
use taskhub_core::db::open_db_in_memory;
use taskhub_core::{
    GroupService, NewTaskRequest, SqliteGroupRepository, SqliteTaskRepository, TaskService,
    UserService,
};
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn services(
    conn: &Connection,
) -> (
    GroupService<SqliteGroupRepository<'_>>,
    TaskService<SqliteTaskRepository<'_>, SqliteGroupRepository<'_>>,
    UserService<SqliteGroupRepository<'_>, SqliteTaskRepository<'_>>,
) {
    (
        GroupService::new(SqliteGroupRepository::try_new(conn).unwrap()),
        TaskService::new(
            SqliteTaskRepository::try_new(conn).unwrap(),
            SqliteGroupRepository::try_new(conn).unwrap(),
        ),
        UserService::new(
            SqliteGroupRepository::try_new(conn).unwrap(),
            SqliteTaskRepository::try_new(conn).unwrap(),
        ),
    )
}

fn count(conn: &Connection, sql: &str, bind: &str) -> i64 {
    conn.query_row(sql, [bind], |row| row.get(0)).unwrap()
}

#[test]
fn detach_user_cleans_every_reference() {
    let conn = setup();
    let (groups, tasks, users) = services(&conn);

    let departing = Uuid::new_v4();
    let colleague = Uuid::new_v4();
    let other_admin = Uuid::new_v4();

    // The departing user admins a group with a member and a task in it.
    let own_group = groups.create_group(departing, "Departing Team").unwrap();
    groups
        .update_members(departing, own_group.uuid, &[colleague])
        .unwrap();
    tasks
        .create_task(colleague, &{
            let mut r = NewTaskRequest::titled("team task");
            r.group = Some(own_group.uuid);
            r
        })
        .unwrap();

    // A personal task they own, and a foreign task assigned to them.
    tasks
        .create_task(departing, &NewTaskRequest::titled("personal errand"))
        .unwrap();
    let other_group = groups.create_group(other_admin, "Other Team").unwrap();
    groups
        .update_members(other_admin, other_group.uuid, &[departing])
        .unwrap();
    let assigned = tasks
        .create_task(other_admin, &{
            let mut r = NewTaskRequest::titled("handed over");
            r.group = Some(other_group.uuid);
            r.assignee = Some(departing);
            r
        })
        .unwrap()
        .task;

    let summary = users.detach_user(departing).unwrap();
    assert_eq!(summary.groups_deleted, 1);
    assert_eq!(summary.tasks_deleted, 1);
    assert_eq!(summary.assignments_cleared, 1);
    assert_eq!(summary.memberships_removed, 1);

    let key = departing.to_string();
    assert_eq!(
        count(
            &conn,
            "SELECT COUNT(*) FROM groups WHERE admin_uuid = ?1;",
            &key
        ),
        0
    );
    assert_eq!(
        count(
            &conn,
            "SELECT COUNT(*) FROM tasks WHERE owner_uuid = ?1;",
            &key
        ),
        0
    );
    assert_eq!(
        count(
            &conn,
            "SELECT COUNT(*) FROM tasks WHERE assignee_uuid = ?1;",
            &key
        ),
        0
    );
    assert_eq!(
        count(
            &conn,
            "SELECT COUNT(*) FROM memberships WHERE user_uuid = ?1;",
            &key
        ),
        0
    );

    // The foreign task survives, merely unassigned.
    let survivor = tasks.get_task(other_admin, assigned.uuid).unwrap();
    assert_eq!(survivor.assignee, None);
    assert_eq!(survivor.group, Some(other_group.uuid));
}

#[test]
fn detach_user_with_no_records_reports_zeroes() {
    let conn = setup();
    let (_, _, users) = services(&conn);

    let summary = users.detach_user(Uuid::new_v4()).unwrap();
    assert_eq!(summary.groups_deleted, 0);
    assert_eq!(summary.tasks_deleted, 0);
    assert_eq!(summary.assignments_cleared, 0);
    assert_eq!(summary.memberships_removed, 0);
}
