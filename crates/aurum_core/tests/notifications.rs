use aurum_core::model::hierarchy::{AreaDraft, PillarDraft, ProjectDraft, Task, TaskDraft};
use aurum_core::model::notification::{
    NotificationChannel, NotificationKind, NotificationPreferences, QuietHours,
};
use aurum_core::service::notification_service::{
    EmailError, EmailMessage, EmailSender, NotificationError,
};
use aurum_core::service::task_service::TaskService;
use aurum_core::time::{start_of_day, MS_PER_DAY, MS_PER_HOUR, MS_PER_MINUTE};
use aurum_core::{
    open_db_in_memory, CooldownBreaker, HierarchyService, NotificationService, Priority,
    SqliteAlignmentRepository, SqliteHierarchyRepository, SqliteNotificationRepository,
    SqliteTaskRepository,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<EmailMessage>>,
}

impl EmailSender for RecordingSender {
    fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct FailingSender;

impl EmailSender for FailingSender {
    fn send(&self, _message: &EmailMessage) -> Result<(), EmailError> {
        Err(EmailError("smtp unavailable".to_string()))
    }
}

type Service<'conn, E> =
    NotificationService<SqliteNotificationRepository<'conn>, SqliteTaskRepository<'conn>, E>;

fn now() -> i64 {
    start_of_day(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()) + 10 * MS_PER_HOUR
}

fn service<E: EmailSender + 'static>(conn: &Connection, sender: Arc<E>, cooldown_ms: i64) -> Service<'_, E> {
    NotificationService::new(
        SqliteNotificationRepository::try_new(conn).unwrap(),
        SqliteTaskRepository::try_new(conn).unwrap(),
        sender,
        CooldownBreaker::new(cooldown_ms),
    )
}

fn seed_project(conn: &Connection) -> Uuid {
    let hierarchy = HierarchyService::new(
        SqliteHierarchyRepository::try_new(conn).unwrap(),
        SqliteTaskRepository::try_new(conn).unwrap(),
    );
    let pillar = hierarchy
        .create_pillar(
            &PillarDraft {
                name: "Work".to_string(),
                ..PillarDraft::default()
            },
            now(),
        )
        .unwrap();
    let area = hierarchy
        .create_area(
            &AreaDraft {
                pillar_id: pillar.id,
                name: "Clients".to_string(),
                ..AreaDraft::default()
            },
            now(),
        )
        .unwrap();
    hierarchy
        .create_project(
            &ProjectDraft {
                area_id: area.id,
                name: "Website".to_string(),
                ..ProjectDraft::default()
            },
            now(),
        )
        .unwrap()
        .id
}

fn create_task(conn: &Connection, project_id: Uuid, name: &str, due_date: i64, due_time: Option<&str>) -> Task {
    TaskService::new(
        SqliteTaskRepository::try_new(conn).unwrap(),
        SqliteAlignmentRepository::try_new(conn).unwrap(),
    )
    .create_task(
        &TaskDraft {
            project_id,
            name: name.to_string(),
            priority: Priority::High,
            due_date: Some(due_date),
            due_time: due_time.map(str::to_string),
            ..TaskDraft::default()
        },
        now(),
    )
    .unwrap()
}

fn tomorrow() -> i64 {
    start_of_day(NaiveDate::from_ymd_opt(2024, 3, 16).unwrap())
}

fn set_prefs<E: EmailSender + 'static>(
    service: &Service<'_, E>,
    change: impl FnOnce(&mut NotificationPreferences),
) {
    let mut prefs = service.preferences().unwrap();
    change(&mut prefs);
    service.update_preferences(&prefs).unwrap();
}

#[test]
fn schedules_advance_and_due_reminders() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn);
    let task = create_task(&conn, project, "Send invoice", tomorrow(), Some("12:00"));
    let service = service(&conn, Arc::new(RecordingSender::default()), 0);

    let reminders = service.schedule_task_reminders(&task, now()).unwrap();

    assert_eq!(reminders.len(), 2);
    let due_at = tomorrow() + 12 * MS_PER_HOUR;
    let advance = &reminders[0];
    assert_eq!(advance.kind, NotificationKind::TaskReminder);
    assert_eq!(advance.scheduled_at, due_at - 30 * MS_PER_MINUTE);
    assert_eq!(advance.title, "Task Due Soon: Send invoice");
    assert_eq!(
        advance.message,
        "Your task 'Send invoice' is due in 30 minutes. (Project: Website)"
    );
    assert_eq!(
        advance.channels,
        vec![NotificationChannel::InApp, NotificationChannel::Email]
    );
    let due = &reminders[1];
    assert_eq!(due.kind, NotificationKind::TaskDue);
    assert_eq!(due.scheduled_at, due_at);
    assert_eq!(due.title, "Task Due Now: Send invoice");

    service.schedule_task_reminders(&task, now()).unwrap();
    assert_eq!(service.task_reminders(task.id).unwrap().len(), 2);
}

#[test]
fn advance_reminder_in_the_past_is_dropped() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn);
    let today = start_of_day(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    let task = create_task(&conn, project, "Call back", today, Some("10:10"));
    let service = service(&conn, Arc::new(RecordingSender::default()), 0);

    let reminders = service.schedule_task_reminders(&task, now()).unwrap();

    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].kind, NotificationKind::TaskDue);
}

#[test]
fn delivers_due_reminders_once() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn);
    let task = create_task(&conn, project, "Deploy", tomorrow(), Some("12:00"));
    let sender = Arc::new(RecordingSender::default());
    let service = service(&conn, Arc::clone(&sender), 0);
    service.schedule_task_reminders(&task, now()).unwrap();

    let at = tomorrow() + 12 * MS_PER_HOUR;
    let report = service.process_due_reminders(at).unwrap();

    assert_eq!(report.examined, 2);
    assert_eq!(report.sent, 2);
    assert_eq!(service.unread_count().unwrap(), 2);
    let sent = sender.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|message| message.task_id == task.id));
    assert!(sent[0].subject.starts_with("Aurum Life: "));

    let again = service.process_due_reminders(at + MS_PER_MINUTE).unwrap();
    assert_eq!(again.examined, 0);
    assert!(service
        .task_reminders(task.id)
        .unwrap()
        .iter()
        .all(|reminder| reminder.is_sent && reminder.sent_at == Some(at)));
}

#[test]
fn quiet_hours_defer_and_disabled_kinds_skip() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn);
    let task = create_task(&conn, project, "Pack", tomorrow(), Some("23:00"));
    let service = service(&conn, Arc::new(RecordingSender::default()), 0);
    service.schedule_task_reminders(&task, now()).unwrap();

    set_prefs(&service, |prefs| {
        prefs.quiet_hours = Some(QuietHours::new("22:00", "07:00").unwrap());
    });
    let at = tomorrow() + 23 * MS_PER_HOUR;
    let quiet = service.process_due_reminders(at).unwrap();
    assert_eq!(quiet.deferred, 2);
    assert_eq!(quiet.sent, 0);
    assert!(service
        .task_reminders(task.id)
        .unwrap()
        .iter()
        .all(|reminder| reminder.is_pending()));

    set_prefs(&service, |prefs| {
        prefs.quiet_hours = None;
        prefs.task_reminder = false;
    });
    let report = service.process_due_reminders(at).unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.sent, 1);
    let advance = service
        .task_reminders(task.id)
        .unwrap()
        .into_iter()
        .find(|reminder| reminder.kind == NotificationKind::TaskReminder)
        .unwrap();
    assert!(advance.is_pending());
}

#[test]
fn disabled_reminders_do_not_starve_the_batch() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn);
    let service = service(&conn, Arc::new(RecordingSender::default()), 0).with_batch_size(5);
    set_prefs(&service, |prefs| prefs.task_reminder = false);
    for index in 0..7 {
        let task = create_task(&conn, project, &format!("Chore {index}"), tomorrow(), None);
        service.schedule_task_reminders(&task, now()).unwrap();
    }

    set_prefs(&service, |prefs| {
        prefs.task_due = false;
        prefs.task_reminder = true;
    });
    let fresh = create_task(&conn, project, "Call", tomorrow(), Some("01:00"));
    service.schedule_task_reminders(&fresh, now()).unwrap();

    let at = tomorrow() + MS_PER_HOUR;
    let report = service.process_due_reminders(at).unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.sent, 1);
    assert!(service.task_reminders(fresh.id).unwrap()[0].is_sent);

    set_prefs(&service, |prefs| prefs.task_due = true);
    let resumed = service.process_due_reminders(at).unwrap();
    assert_eq!(resumed.examined, 5);
    assert_eq!(resumed.sent, 5);
}

#[test]
fn disabled_channels_are_filtered_at_delivery() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn);
    let task = create_task(&conn, project, "Review", tomorrow(), None);
    let sender = Arc::new(RecordingSender::default());
    let service = service(&conn, Arc::clone(&sender), 0);
    set_prefs(&service, |prefs| prefs.task_reminder = false);
    service.schedule_task_reminders(&task, now()).unwrap();
    assert!(service.task_reminders(task.id).unwrap()[0]
        .channels
        .contains(&NotificationChannel::Email));

    set_prefs(&service, |prefs| prefs.email_enabled = false);
    let report = service.process_due_reminders(tomorrow()).unwrap();

    assert_eq!(report.sent, 1);
    assert!(sender.sent.lock().unwrap().is_empty());
    assert_eq!(service.unread_count().unwrap(), 1);
}

#[test]
fn failing_email_retries_with_backoff_then_fails() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn);
    let task = create_task(&conn, project, "Report", tomorrow(), None);
    let service = service(&conn, Arc::new(FailingSender), 0);
    set_prefs(&service, |prefs| prefs.task_reminder = false);
    service.schedule_task_reminders(&task, now()).unwrap();

    let mut at = tomorrow();
    for expected_retry in 1..=3u32 {
        let report = service.process_due_reminders(at).unwrap();
        assert_eq!(report.retried, 1);
        let reminder = service.task_reminders(task.id).unwrap().remove(0);
        assert_eq!(reminder.retry_count, expected_retry);
        let next = reminder.next_attempt_at.unwrap();
        assert_eq!(next, at + 5 * MS_PER_MINUTE * i64::from(expected_retry));

        assert_eq!(service.process_due_reminders(next - 1).unwrap().examined, 0);
        at = next;
    }

    let report = service.process_due_reminders(at).unwrap();
    assert_eq!(report.failed, 1);
    let reminder = service.task_reminders(task.id).unwrap().remove(0);
    assert!(reminder.failed);
    assert!(!reminder.is_sent);
    assert_eq!(service.process_due_reminders(at + MS_PER_DAY).unwrap().examined, 0);

    assert_eq!(service.list_notifications(false, 10).unwrap().len(), 1);
}

#[test]
fn open_breaker_defers_without_consuming_retries() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn);
    let first = create_task(&conn, project, "First", tomorrow(), None);
    let second = create_task(&conn, project, "Second", tomorrow(), Some("00:01"));
    let service = service(&conn, Arc::new(FailingSender), 10 * MS_PER_MINUTE);
    set_prefs(&service, |prefs| prefs.task_reminder = false);
    service.schedule_task_reminders(&first, now()).unwrap();
    service.schedule_task_reminders(&second, now()).unwrap();

    let at = tomorrow() + MS_PER_MINUTE;
    let report = service.process_due_reminders(at).unwrap();

    assert_eq!(report.retried, 1);
    assert_eq!(report.deferred, 1);
    let held = service.task_reminders(second.id).unwrap().remove(0);
    assert_eq!(held.retry_count, 0);
    assert_eq!(held.next_attempt_at, Some(at + 10 * MS_PER_MINUTE));
    assert_eq!(service.list_notifications(false, 10).unwrap().len(), 1);
}

#[test]
fn overdue_reminders_repeat_at_most_hourly() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn);
    let yesterday = start_of_day(NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
    let task = create_task(&conn, project, "Taxes", yesterday, None);
    let service = service(&conn, Arc::new(RecordingSender::default()), 0);

    assert_eq!(service.check_overdue_tasks(now()).unwrap(), 1);
    assert_eq!(service.process_due_reminders(now()).unwrap().sent, 1);
    assert_eq!(service.check_overdue_tasks(now() + 30 * MS_PER_MINUTE).unwrap(), 0);
    assert_eq!(service.check_overdue_tasks(now() + MS_PER_HOUR).unwrap(), 1);
    // The second one is still pending, so nothing new is queued.
    assert_eq!(service.check_overdue_tasks(now() + 2 * MS_PER_HOUR).unwrap(), 0);

    let overdue: Vec<_> = service
        .task_reminders(task.id)
        .unwrap()
        .into_iter()
        .filter(|reminder| reminder.kind == NotificationKind::TaskOverdue)
        .collect();
    assert_eq!(overdue.len(), 2);
    assert_eq!(overdue[0].title, "Overdue Task: Taxes");
    assert_eq!(
        overdue[0].message,
        "Your task 'Taxes' is overdue. Please review and update it. (Project: Website)"
    );

    set_prefs(&service, |prefs| prefs.task_overdue = false);
    assert_eq!(service.check_overdue_tasks(now() + 3 * MS_PER_HOUR).unwrap(), 0);
}

#[test]
fn overdue_reminder_is_not_stacked_through_quiet_hours() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn);
    let yesterday = start_of_day(NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
    let task = create_task(&conn, project, "Renew passport", yesterday, None);
    let service = service(&conn, Arc::new(RecordingSender::default()), 0);
    set_prefs(&service, |prefs| {
        prefs.quiet_hours = Some(QuietHours::new("22:00", "07:00").unwrap());
    });

    let evening = start_of_day(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()) + 22 * MS_PER_HOUR;
    let mut queued = 0;
    for hour in 0..=8 {
        let at = evening + hour * MS_PER_HOUR;
        queued += service.check_overdue_tasks(at).unwrap();
        assert_eq!(service.process_due_reminders(at).unwrap().sent, 0);
    }
    assert_eq!(queued, 1);

    let morning = tomorrow() + 7 * MS_PER_HOUR + 30 * MS_PER_MINUTE;
    let report = service.process_due_reminders(morning).unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.sent, 1);
    let inbox = service.list_notifications(false, 50).unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].task_id, Some(task.id));
}

#[test]
fn inbox_read_delete_and_clear() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn);
    let first = create_task(&conn, project, "One", tomorrow(), None);
    let second = create_task(&conn, project, "Two", tomorrow(), None);
    let service = service(&conn, Arc::new(RecordingSender::default()), 0);
    set_prefs(&service, |prefs| prefs.task_reminder = false);
    service.schedule_task_reminders(&first, now()).unwrap();
    service.schedule_task_reminders(&second, now()).unwrap();
    service.process_due_reminders(tomorrow()).unwrap();

    let inbox = service.list_notifications(false, 10).unwrap();
    assert_eq!(inbox.len(), 2);
    service.mark_read(inbox[0].id).unwrap();
    assert_eq!(service.unread_count().unwrap(), 1);
    assert_eq!(service.list_notifications(true, 10).unwrap().len(), 1);
    assert_eq!(service.mark_all_read().unwrap(), 1);
    assert_eq!(service.unread_count().unwrap(), 0);

    service.delete_notification(inbox[0].id).unwrap();
    assert!(matches!(
        service.delete_notification(inbox[0].id).unwrap_err(),
        NotificationError::NotificationNotFound(_)
    ));
    assert!(matches!(
        service.mark_read(Uuid::new_v4()).unwrap_err(),
        NotificationError::NotificationNotFound(_)
    ));
    assert_eq!(service.clear_notifications().unwrap(), 1);
    assert!(service.list_notifications(false, 10).unwrap().is_empty());
}

#[test]
fn preference_updates_are_validated() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, Arc::new(RecordingSender::default()), 0);

    let mut prefs = service.preferences().unwrap();
    assert_eq!(prefs, NotificationPreferences::default());
    prefs.reminder_advance_minutes = 2_000;
    assert!(matches!(
        service.update_preferences(&prefs).unwrap_err(),
        NotificationError::Validation(_)
    ));

    prefs.reminder_advance_minutes = 15;
    prefs.quiet_hours = Some(QuietHours {
        start: "25:00".to_string(),
        end: "07:00".to_string(),
    });
    assert!(matches!(
        service.update_preferences(&prefs).unwrap_err(),
        NotificationError::Validation(_)
    ));

    prefs.quiet_hours = None;
    service.update_preferences(&prefs).unwrap();
    assert_eq!(service.preferences().unwrap().reminder_advance_minutes, 15);
}
