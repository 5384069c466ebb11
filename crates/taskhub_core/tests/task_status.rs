use chrono::{Local, NaiveDate};
use rusqlite::Connection;
use taskhub_core::db::open_db_in_memory;
use taskhub_core::{
    NewTaskRequest, SqliteGroupRepository, SqliteTaskRepository, TaskService, TaskServiceError,
    TaskStatus, TaskUpdateRequest, UserId,
};
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn task_service(
    conn: &Connection,
) -> TaskService<SqliteTaskRepository<'_>, SqliteGroupRepository<'_>> {
    TaskService::new(
        SqliteTaskRepository::try_new(conn).unwrap(),
        SqliteGroupRepository::try_new(conn).unwrap(),
    )
}

fn yesterday() -> NaiveDate {
    Local::now().date_naive().pred_opt().unwrap()
}

fn tomorrow() -> NaiveDate {
    Local::now().date_naive().succ_opt().unwrap()
}

fn create_with_due(
    service: &TaskService<SqliteTaskRepository<'_>, SqliteGroupRepository<'_>>,
    owner: UserId,
    due: NaiveDate,
) -> taskhub_core::Task {
    let mut request = NewTaskRequest::titled("write report");
    request.due_date = Some(due);
    service.create_task(owner, &request).unwrap().task
}

#[test]
fn creating_task_past_due_stores_overdue() {
    let conn = setup();
    let service = task_service(&conn);
    let owner = Uuid::new_v4();

    let task = create_with_due(&service, owner, yesterday());
    assert_eq!(task.status, TaskStatus::Overdue);

    let loaded = service.get_task(owner, task.uuid).unwrap();
    assert_eq!(loaded.status, TaskStatus::Overdue);
}

#[test]
fn creating_task_with_future_due_stays_ongoing() {
    let conn = setup();
    let service = task_service(&conn);
    let owner = Uuid::new_v4();

    let task = create_with_due(&service, owner, tomorrow());
    assert_eq!(task.status, TaskStatus::Ongoing);
}

#[test]
fn update_save_derives_overdue_from_past_due_date() {
    let conn = setup();
    let service = task_service(&conn);
    let owner = Uuid::new_v4();

    let task = create_with_due(&service, owner, tomorrow());
    let updated = service
        .update_task(
            owner,
            task.uuid,
            &TaskUpdateRequest {
                title: task.title.clone(),
                description: task.description.clone(),
                assignee: task.assignee,
                due_date: Some(yesterday()),
                status: TaskStatus::Ongoing,
            },
        )
        .unwrap();

    assert_eq!(updated.status, TaskStatus::Overdue);
}

#[test]
fn completed_task_is_never_auto_reverted() {
    let conn = setup();
    let service = task_service(&conn);
    let owner = Uuid::new_v4();

    let task = create_with_due(&service, owner, tomorrow());
    service.mark_complete(owner, task.uuid).unwrap();

    // Saving with a past due date must not move a completed task.
    let updated = service
        .update_task(
            owner,
            task.uuid,
            &TaskUpdateRequest {
                title: task.title.clone(),
                description: task.description.clone(),
                assignee: task.assignee,
                due_date: Some(yesterday()),
                status: TaskStatus::Completed,
            },
        )
        .unwrap();
    assert_eq!(updated.status, TaskStatus::Completed);
}

#[test]
fn overdue_task_is_not_reverted_by_future_due_date_alone() {
    let conn = setup();
    let service = task_service(&conn);
    let owner = Uuid::new_v4();

    let task = create_with_due(&service, owner, yesterday());
    assert_eq!(task.status, TaskStatus::Overdue);

    // Owner pushes the due date out but leaves the stored status untouched;
    // the task stays overdue indefinitely.
    let updated = service
        .update_task(
            owner,
            task.uuid,
            &TaskUpdateRequest {
                title: task.title.clone(),
                description: task.description.clone(),
                assignee: task.assignee,
                due_date: Some(tomorrow()),
                status: TaskStatus::Overdue,
            },
        )
        .unwrap();
    assert_eq!(updated.status, TaskStatus::Overdue);
}

#[test]
fn overdue_task_resets_only_through_explicit_ongoing() {
    let conn = setup();
    let service = task_service(&conn);
    let owner = Uuid::new_v4();

    let task = create_with_due(&service, owner, yesterday());
    let updated = service
        .update_task(
            owner,
            task.uuid,
            &TaskUpdateRequest {
                title: task.title.clone(),
                description: task.description.clone(),
                assignee: task.assignee,
                due_date: Some(tomorrow()),
                status: TaskStatus::Ongoing,
            },
        )
        .unwrap();
    assert_eq!(updated.status, TaskStatus::Ongoing);
}

#[test]
fn explicit_ongoing_with_past_due_derives_overdue_again() {
    let conn = setup();
    let service = task_service(&conn);
    let owner = Uuid::new_v4();

    let task = create_with_due(&service, owner, yesterday());
    let updated = service
        .update_task(
            owner,
            task.uuid,
            &TaskUpdateRequest {
                title: task.title.clone(),
                description: task.description.clone(),
                assignee: task.assignee,
                due_date: Some(yesterday()),
                status: TaskStatus::Ongoing,
            },
        )
        .unwrap();
    assert_eq!(updated.status, TaskStatus::Overdue);
}

#[test]
fn overdue_is_rejected_as_direct_status_input() {
    let conn = setup();
    let service = task_service(&conn);
    let owner = Uuid::new_v4();

    let task = create_with_due(&service, owner, tomorrow());
    let err = service
        .update_task(
            owner,
            task.uuid,
            &TaskUpdateRequest {
                title: task.title.clone(),
                description: task.description.clone(),
                assignee: task.assignee,
                due_date: task.due_date,
                status: TaskStatus::Overdue,
            },
        )
        .unwrap_err();

    assert!(matches!(err, TaskServiceError::OverdueNotSettable(id) if id == task.uuid));

    let loaded = service.get_task(owner, task.uuid).unwrap();
    assert_eq!(loaded.status, TaskStatus::Ongoing);
}
