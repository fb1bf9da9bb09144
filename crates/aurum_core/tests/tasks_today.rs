use aurum_core::model::hierarchy::{
    AreaDraft, PillarDraft, ProjectDraft, TaskDraft, TaskPatch,
};
use aurum_core::model::validate::ValidationError;
use aurum_core::service::task_service::{TaskService, TaskServiceError};
use aurum_core::time::{start_of_day, MS_PER_DAY, MS_PER_HOUR};
use aurum_core::{
    open_db_in_memory, HierarchyService, Priority, ProjectStatus, SqliteAlignmentRepository,
    SqliteHierarchyRepository, SqliteTaskRepository, TaskStatus,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use uuid::Uuid;

type Tasks<'conn> = TaskService<SqliteTaskRepository<'conn>, SqliteAlignmentRepository<'conn>>;
type Hierarchy<'conn> = HierarchyService<SqliteHierarchyRepository<'conn>, SqliteTaskRepository<'conn>>;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

fn now() -> i64 {
    start_of_day(today()) + 10 * MS_PER_HOUR
}

fn tasks(conn: &Connection) -> Tasks<'_> {
    TaskService::new(
        SqliteTaskRepository::try_new(conn).unwrap(),
        SqliteAlignmentRepository::try_new(conn).unwrap(),
    )
}

fn hierarchy(conn: &Connection) -> Hierarchy<'_> {
    HierarchyService::new(
        SqliteHierarchyRepository::try_new(conn).unwrap(),
        SqliteTaskRepository::try_new(conn).unwrap(),
    )
}

/// One pillar with one area; returns the id of a fresh project under it.
fn seed_project(conn: &Connection, priority: Priority, area_importance: u8) -> Uuid {
    let hierarchy = hierarchy(conn);
    let pillar = hierarchy
        .create_pillar(
            &PillarDraft {
                name: "Career".to_string(),
                ..PillarDraft::default()
            },
            now(),
        )
        .unwrap();
    let area = hierarchy
        .create_area(
            &AreaDraft {
                pillar_id: pillar.id,
                name: "Writing".to_string(),
                importance: Some(area_importance),
                ..AreaDraft::default()
            },
            now(),
        )
        .unwrap();
    hierarchy
        .create_project(
            &ProjectDraft {
                area_id: area.id,
                name: "Book".to_string(),
                status: ProjectStatus::InProgress,
                priority,
                ..ProjectDraft::default()
            },
            now(),
        )
        .unwrap()
        .id
}

fn draft(project_id: Uuid, name: &str, priority: Priority, due_date: Option<i64>) -> TaskDraft {
    TaskDraft {
        project_id,
        name: name.to_string(),
        priority,
        due_date,
        ..TaskDraft::default()
    }
}

#[test]
fn create_task_requires_live_project() {
    let conn = open_db_in_memory().unwrap();
    let service = tasks(&conn);
    let missing = Uuid::new_v4();

    let err = service
        .create_task(&draft(missing, "Nowhere", Priority::Low, None), now())
        .unwrap_err();
    assert!(matches!(err, TaskServiceError::ProjectNotFound(id) if id == missing));
}

#[test]
fn create_task_rejects_unknown_dependency() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn, Priority::Medium, 3);
    let service = tasks(&conn);
    let missing = Uuid::new_v4();

    let mut with_dep = draft(project, "Edit", Priority::Medium, None);
    with_dep.dependency_ids = vec![missing];
    let err = service.create_task(&with_dep, now()).unwrap_err();
    assert!(matches!(err, TaskServiceError::DependencyNotFound(id) if id == missing));
}

#[test]
fn dependency_cycles_and_self_edges_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn, Priority::Medium, 3);
    let service = tasks(&conn);
    let outline = service
        .create_task(&draft(project, "Outline", Priority::Medium, None), now())
        .unwrap();
    let mut draft_chapter = draft(project, "Chapter", Priority::Medium, None);
    draft_chapter.dependency_ids = vec![outline.id, outline.id];
    let chapter = service.create_task(&draft_chapter, now()).unwrap();
    assert_eq!(chapter.dependency_ids, vec![outline.id]);
    let review = service
        .create_task(&draft(project, "Review", Priority::Medium, None), now())
        .unwrap();
    service
        .set_dependencies(review.id, &[chapter.id], now())
        .unwrap();

    let err = service
        .set_dependencies(outline.id, &[review.id], now())
        .unwrap_err();
    assert!(matches!(
        err,
        TaskServiceError::DependencyCycle { task_id, dependency_id }
            if task_id == outline.id && dependency_id == review.id
    ));

    let err = service
        .set_dependencies(outline.id, &[outline.id], now())
        .unwrap_err();
    assert!(matches!(
        err,
        TaskServiceError::Validation(ValidationError::SelfDependency)
    ));

    assert!(service.get_task(outline.id).unwrap().dependency_ids.is_empty());
}

#[test]
fn completion_records_points_once() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn, Priority::High, 5);
    let service = tasks(&conn);
    let task = service
        .create_task(&draft(project, "Ship draft", Priority::High, None), now())
        .unwrap();

    let first = service.complete_task(task.id, now()).unwrap();
    assert_eq!(first.task.status, TaskStatus::Done);
    assert_eq!(first.task.completed_at, Some(now()));
    assert_eq!(first.points.unwrap().total(), 50);

    let again = service.complete_task(task.id, now() + 1).unwrap();
    assert!(again.points.is_none());

    let reopened = service.reopen_task(task.id, now() + 2).unwrap();
    assert_eq!(reopened.status, TaskStatus::Todo);
    assert_eq!(reopened.completed_at, None);
    assert!(service.complete_task(task.id, now() + 3).unwrap().points.is_none());

    let records: i64 = conn
        .query_row("SELECT COUNT(*) FROM alignment_scores;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(records, 1);
}

#[test]
fn status_patch_to_done_also_scores() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn, Priority::Low, 3);
    let service = tasks(&conn);
    let task = service
        .create_task(&draft(project, "Proofread", Priority::Medium, None), now())
        .unwrap();

    let updated = service
        .update_task(
            task.id,
            &TaskPatch {
                status: Some(TaskStatus::Done),
                ..TaskPatch::default()
            },
            now(),
        )
        .unwrap();
    assert!(updated.is_done());

    let points: i64 = conn
        .query_row(
            "SELECT points_earned FROM alignment_scores WHERE task_id = ?1;",
            [task.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(points, 5);
}

#[test]
fn today_orders_by_score_and_counts_completions() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn, Priority::Medium, 3);
    let service = tasks(&conn);
    let yesterday = start_of_day(today()) - MS_PER_DAY;
    let tomorrow = start_of_day(today()) + MS_PER_DAY;

    let overdue = service
        .create_task(&draft(project, "Overdue", Priority::High, Some(yesterday)), now())
        .unwrap();
    let undated = service
        .create_task(&draft(project, "Someday", Priority::Low, None), now())
        .unwrap();
    service
        .create_task(&draft(project, "Tomorrow", Priority::High, Some(tomorrow)), now())
        .unwrap();
    let finished = service
        .create_task(&draft(project, "Finished", Priority::Medium, None), now())
        .unwrap();
    service.complete_task(finished.id, now()).unwrap();

    let view = service.today(now(), 50).unwrap();

    let ids: Vec<Uuid> = view.tasks.iter().map(|row| row.task.id).collect();
    assert_eq!(ids, vec![overdue.id, undated.id]);
    let top = &view.tasks[0];
    assert!(top.is_overdue);
    assert!(top.dependencies_met);
    assert_eq!(top.score, 89.5);
    assert_eq!(top.project_name, "Book");
    assert_eq!(top.area_name, "Writing");
    assert_eq!(top.pillar_name, "Career");
    assert!(!view.tasks[1].is_overdue);
    assert_eq!(view.tasks[1].score, 39.5);

    assert_eq!(view.stats.completed_today, 1);
    assert_eq!(view.stats.total_today, 3);
    assert_eq!(view.stats.completion_rate, 33.3);
}

#[test]
fn today_marks_blocked_tasks_and_respects_limit() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn, Priority::Medium, 3);
    let service = tasks(&conn);
    let first = service
        .create_task(&draft(project, "First", Priority::Medium, None), now())
        .unwrap();
    let mut blocked = draft(project, "Blocked", Priority::Medium, None);
    blocked.dependency_ids = vec![first.id];
    let blocked = service.create_task(&blocked, now()).unwrap();

    let view = service.today(now(), 10).unwrap();
    let row = view
        .tasks
        .iter()
        .find(|row| row.task.id == blocked.id)
        .unwrap();
    assert!(!row.dependencies_met);
    assert_eq!(row.score_breakdown.dependency, 2.0);
    assert_eq!(view.tasks[0].task.id, first.id);

    let limited = service.today(now(), 1).unwrap();
    assert_eq!(limited.tasks.len(), 1);
    assert_eq!(limited.stats.total_today, 1);
}

#[test]
fn today_skips_archived_projects() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn, Priority::Medium, 3);
    let service = tasks(&conn);
    service
        .create_task(&draft(project, "Hidden", Priority::High, None), now())
        .unwrap();

    hierarchy(&conn)
        .set_project_archived(project, true, now())
        .unwrap();

    let view = service.today(now(), 10).unwrap();
    assert!(view.tasks.is_empty());
    assert_eq!(view.stats.completion_rate, 0.0);
}

#[test]
fn daily_summary_picks_busiest_project() {
    let conn = open_db_in_memory().unwrap();
    let busy = seed_project(&conn, Priority::Medium, 3);
    let quiet = seed_project(&conn, Priority::Medium, 3);
    let service = tasks(&conn);
    let yesterday = start_of_day(today()) - MS_PER_DAY;

    let quiet_task = service
        .create_task(&draft(quiet, "Quiet", Priority::Medium, None), now())
        .unwrap();
    let busy_one = service
        .create_task(&draft(busy, "Busy one", Priority::Medium, None), now())
        .unwrap();
    let busy_two = service
        .create_task(&draft(busy, "Busy two", Priority::Medium, None), now())
        .unwrap();
    service
        .create_task(&draft(busy, "Late", Priority::High, Some(yesterday)), now())
        .unwrap();
    service.complete_task(quiet_task.id, now()).unwrap();
    service.complete_task(busy_one.id, now() + 1).unwrap();
    service.complete_task(busy_two.id, now() + 2).unwrap();

    let summary = service.daily_summary(now() + 3).unwrap();
    assert_eq!(summary.completed_count, 3);
    assert_eq!(summary.projects_touched, 2);
    assert_eq!(summary.pending_high_priority, 1);
    assert_eq!(summary.top_project, Some(busy));
}

#[test]
fn deleted_task_is_gone() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn, Priority::Medium, 3);
    let service = tasks(&conn);
    let task = service
        .create_task(&draft(project, "Temp", Priority::Low, None), now())
        .unwrap();

    service.delete_task(task.id, now()).unwrap();

    assert!(matches!(
        service.get_task(task.id).unwrap_err(),
        TaskServiceError::TaskNotFound(_)
    ));
    assert!(service.list_tasks(project).unwrap().is_empty());
}
