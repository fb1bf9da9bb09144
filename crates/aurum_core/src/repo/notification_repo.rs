//! Notification inbox, reminder queue and preference persistence.
//!
//! # Invariants
//! - Reminder queue reads skip reminders whose task is deleted or done.
//! - Preferences live in a single row (`id = 1`) created on first read.

use crate::model::hierarchy::TaskId;
use crate::model::notification::{
    channels_to_db, parse_channels, Notification, NotificationChannel, NotificationId,
    NotificationKind, NotificationPreferences, QuietHours, ReminderId, TaskReminder,
};
use crate::repo::{
    bool_to_int, ensure_connection_ready, invalid_enum, parse_bool, parse_optional_uuid,
    parse_u32, parse_uuid, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const NOTIFICATION_SELECT_SQL: &str = "SELECT
    id,
    kind,
    title,
    message,
    task_id,
    is_read,
    created_at
FROM notifications";

const REMINDER_SELECT_SQL: &str = "SELECT
    r.id,
    r.task_id,
    r.kind,
    r.scheduled_at,
    r.title,
    r.message,
    r.channels,
    r.is_sent,
    r.sent_at,
    r.retry_count,
    r.max_retries,
    r.next_attempt_at,
    r.failed,
    r.created_at
FROM task_reminders r";

/// Repository interface for notifications and reminders.
pub trait NotificationRepository {
    fn insert_notification(&self, notification: &Notification) -> RepoResult<()>;
    /// Newest first.
    fn list_notifications(&self, unread_only: bool, limit: u32) -> RepoResult<Vec<Notification>>;
    fn count_unread(&self) -> RepoResult<u64>;
    fn mark_read(&self, id: NotificationId) -> RepoResult<()>;
    /// Returns how many notifications changed state.
    fn mark_all_read(&self) -> RepoResult<usize>;
    fn delete_notification(&self, id: NotificationId) -> RepoResult<()>;
    fn clear_notifications(&self) -> RepoResult<usize>;

    fn insert_reminder(&self, reminder: &TaskReminder) -> RepoResult<()>;
    /// Pending reminders scheduled at or before `now` whose retry gate has
    /// passed, restricted to `kinds` and to rows carrying at least one of
    /// `channels`.
    fn list_due_reminders(
        &self,
        now: i64,
        kinds: &[NotificationKind],
        channels: &[NotificationChannel],
        limit: u32,
    ) -> RepoResult<Vec<TaskReminder>>;
    fn list_task_reminders(&self, task_id: TaskId) -> RepoResult<Vec<TaskReminder>>;
    fn mark_reminder_sent(&self, id: ReminderId, now: i64) -> RepoResult<()>;
    /// Persists retry bookkeeping after a failed delivery attempt.
    fn record_reminder_failure(&self, reminder: &TaskReminder) -> RepoResult<()>;
    /// Drops pending reminders of a task; used when its schedule changes.
    fn cancel_pending_reminders(&self, task_id: TaskId) -> RepoResult<usize>;
    /// Whether the task has an overdue reminder that is neither sent nor failed.
    fn has_pending_overdue_reminder(&self, task_id: TaskId) -> RepoResult<bool>;
    /// Latest `sent_at` of an overdue reminder for the task.
    fn last_overdue_sent_at(&self, task_id: TaskId) -> RepoResult<Option<i64>>;

    fn load_preferences(&self) -> RepoResult<NotificationPreferences>;
    fn save_preferences(&self, preferences: &NotificationPreferences) -> RepoResult<()>;
}

/// SQLite-backed notification repository.
pub struct SqliteNotificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotificationRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_reminders(&self, sql: &str, bind: impl rusqlite::Params) -> RepoResult<Vec<TaskReminder>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(bind)?;
        let mut reminders = Vec::new();
        while let Some(row) = rows.next()? {
            reminders.push(parse_reminder_row(row)?);
        }
        Ok(reminders)
    }
}

impl NotificationRepository for SqliteNotificationRepository<'_> {
    fn insert_notification(&self, notification: &Notification) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO notifications (
                id,
                kind,
                title,
                message,
                task_id,
                is_read,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                notification.id.to_string(),
                notification.kind.as_str(),
                notification.title.as_str(),
                notification.message.as_str(),
                notification.task_id.map(|id| id.to_string()),
                bool_to_int(notification.is_read),
                notification.created_at,
            ],
        )?;
        Ok(())
    }

    fn list_notifications(&self, unread_only: bool, limit: u32) -> RepoResult<Vec<Notification>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTIFICATION_SELECT_SQL}
             WHERE (?1 = 0 OR is_read = 0)
             ORDER BY created_at DESC, id ASC
             LIMIT ?2;"
        ))?;
        let mut rows = stmt.query(params![bool_to_int(unread_only), i64::from(limit)])?;
        let mut notifications = Vec::new();
        while let Some(row) = rows.next()? {
            notifications.push(parse_notification_row(row)?);
        }
        Ok(notifications)
    }

    fn count_unread(&self) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE is_read = 0;",
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn mark_read(&self, id: NotificationId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "notification",
                id,
            });
        }
        Ok(())
    }

    fn mark_all_read(&self) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("UPDATE notifications SET is_read = 1 WHERE is_read = 0;", [])?;
        Ok(changed)
    }

    fn delete_notification(&self, id: NotificationId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM notifications WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "notification",
                id,
            });
        }
        Ok(())
    }

    fn clear_notifications(&self) -> RepoResult<usize> {
        let removed = self.conn.execute("DELETE FROM notifications;", [])?;
        Ok(removed)
    }

    fn insert_reminder(&self, reminder: &TaskReminder) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO task_reminders (
                id,
                task_id,
                kind,
                scheduled_at,
                title,
                message,
                channels,
                is_sent,
                sent_at,
                retry_count,
                max_retries,
                next_attempt_at,
                failed,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
            params![
                reminder.id.to_string(),
                reminder.task_id.to_string(),
                reminder.kind.as_str(),
                reminder.scheduled_at,
                reminder.title.as_str(),
                reminder.message.as_str(),
                channels_to_db(&reminder.channels),
                bool_to_int(reminder.is_sent),
                reminder.sent_at,
                i64::from(reminder.retry_count),
                i64::from(reminder.max_retries),
                reminder.next_attempt_at,
                bool_to_int(reminder.failed),
                reminder.created_at,
            ],
        )?;
        Ok(())
    }

    fn list_due_reminders(
        &self,
        now: i64,
        kinds: &[NotificationKind],
        channels: &[NotificationChannel],
        limit: u32,
    ) -> RepoResult<Vec<TaskReminder>> {
        if kinds.is_empty() || channels.is_empty() {
            return Ok(Vec::new());
        }
        let kind_marks = vec!["?"; kinds.len()].join(", ");
        let channel_filter =
            vec!["instr(',' || r.channels || ',', ?) > 0"; channels.len()].join(" OR ");
        let sql = format!(
            "{REMINDER_SELECT_SQL}
             INNER JOIN tasks t ON t.id = r.task_id
             WHERE r.is_sent = 0
               AND r.failed = 0
               AND r.scheduled_at <= ?
               AND (r.next_attempt_at IS NULL OR r.next_attempt_at <= ?)
               AND t.is_deleted = 0
               AND t.status <> 'done'
               AND r.kind IN ({kind_marks})
               AND ({channel_filter})
             ORDER BY r.scheduled_at ASC, r.id ASC
             LIMIT ?;"
        );

        let mut bind_values = vec![Value::Integer(now), Value::Integer(now)];
        bind_values.extend(kinds.iter().map(|kind| Value::Text(kind.as_str().to_string())));
        bind_values.extend(
            channels
                .iter()
                .map(|channel| Value::Text(format!(",{},", channel.as_str()))),
        );
        bind_values.push(Value::Integer(i64::from(limit)));
        self.query_reminders(&sql, params_from_iter(bind_values))
    }

    fn list_task_reminders(&self, task_id: TaskId) -> RepoResult<Vec<TaskReminder>> {
        self.query_reminders(
            &format!(
                "{REMINDER_SELECT_SQL}
                 WHERE r.task_id = ?1
                 ORDER BY r.scheduled_at ASC, r.id ASC;"
            ),
            [task_id.to_string()],
        )
    }

    fn mark_reminder_sent(&self, id: ReminderId, now: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE task_reminders
             SET is_sent = 1,
                 sent_at = ?2,
                 next_attempt_at = NULL
             WHERE id = ?1;",
            params![id.to_string(), now],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "reminder",
                id,
            });
        }
        Ok(())
    }

    fn record_reminder_failure(&self, reminder: &TaskReminder) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE task_reminders
             SET retry_count = ?2,
                 next_attempt_at = ?3,
                 failed = ?4
             WHERE id = ?1;",
            params![
                reminder.id.to_string(),
                i64::from(reminder.retry_count),
                reminder.next_attempt_at,
                bool_to_int(reminder.failed),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "reminder",
                id: reminder.id,
            });
        }
        Ok(())
    }

    fn cancel_pending_reminders(&self, task_id: TaskId) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM task_reminders
             WHERE task_id = ?1
               AND is_sent = 0
               AND failed = 0
               AND kind <> 'task_overdue';",
            [task_id.to_string()],
        )?;
        Ok(removed)
    }

    fn has_pending_overdue_reminder(&self, task_id: TaskId) -> RepoResult<bool> {
        let pending: i64 = self.conn.query_row(
            "SELECT EXISTS (
                SELECT 1
                FROM task_reminders
                WHERE task_id = ?1
                  AND kind = 'task_overdue'
                  AND is_sent = 0
                  AND failed = 0
             );",
            [task_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(pending != 0)
    }

    fn last_overdue_sent_at(&self, task_id: TaskId) -> RepoResult<Option<i64>> {
        let latest: Option<i64> = self.conn.query_row(
            "SELECT MAX(sent_at)
             FROM task_reminders
             WHERE task_id = ?1
               AND kind = 'task_overdue'
               AND is_sent = 1;",
            [task_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(latest)
    }

    fn load_preferences(&self) -> RepoResult<NotificationPreferences> {
        self.conn.execute(
            "INSERT OR IGNORE INTO notification_preferences (id) VALUES (1);",
            [],
        )?;
        let preferences = self
            .conn
            .query_row(
                "SELECT
                    in_app_enabled,
                    email_enabled,
                    task_due,
                    task_overdue,
                    task_reminder,
                    project_deadline,
                    recurring_task,
                    reminder_advance_minutes,
                    quiet_hours_start,
                    quiet_hours_end
                 FROM notification_preferences
                 WHERE id = 1;",
                [],
                |row| Ok(parse_preferences_row(row)),
            )
            .optional()?;
        match preferences {
            Some(parsed) => parsed,
            None => Ok(NotificationPreferences::default()),
        }
    }

    fn save_preferences(&self, preferences: &NotificationPreferences) -> RepoResult<()> {
        let (quiet_start, quiet_end) = match preferences.quiet_hours.as_ref() {
            Some(window) => (Some(window.start.as_str()), Some(window.end.as_str())),
            None => (None, None),
        };
        self.conn.execute(
            "INSERT INTO notification_preferences (
                id,
                in_app_enabled,
                email_enabled,
                task_due,
                task_overdue,
                task_reminder,
                project_deadline,
                recurring_task,
                reminder_advance_minutes,
                quiet_hours_start,
                quiet_hours_end
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                in_app_enabled = excluded.in_app_enabled,
                email_enabled = excluded.email_enabled,
                task_due = excluded.task_due,
                task_overdue = excluded.task_overdue,
                task_reminder = excluded.task_reminder,
                project_deadline = excluded.project_deadline,
                recurring_task = excluded.recurring_task,
                reminder_advance_minutes = excluded.reminder_advance_minutes,
                quiet_hours_start = excluded.quiet_hours_start,
                quiet_hours_end = excluded.quiet_hours_end;",
            params![
                bool_to_int(preferences.in_app_enabled),
                bool_to_int(preferences.email_enabled),
                bool_to_int(preferences.task_due),
                bool_to_int(preferences.task_overdue),
                bool_to_int(preferences.task_reminder),
                bool_to_int(preferences.project_deadline),
                bool_to_int(preferences.recurring_task),
                i64::from(preferences.reminder_advance_minutes),
                quiet_start,
                quiet_end,
            ],
        )?;
        Ok(())
    }
}

fn parse_notification_row(row: &Row<'_>) -> RepoResult<Notification> {
    let id_text: String = row.get("id")?;
    let kind_text: String = row.get("kind")?;
    Ok(Notification {
        id: parse_uuid(&id_text, "notifications.id")?,
        kind: NotificationKind::parse(&kind_text)
            .ok_or_else(|| invalid_enum(&kind_text, "notifications.kind"))?,
        title: row.get("title")?,
        message: row.get("message")?,
        task_id: parse_optional_uuid(row.get("task_id")?, "notifications.task_id")?,
        is_read: parse_bool(row.get("is_read")?, "notifications.is_read")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_reminder_row(row: &Row<'_>) -> RepoResult<TaskReminder> {
    let id_text: String = row.get("id")?;
    let task_text: String = row.get("task_id")?;
    let kind_text: String = row.get("kind")?;
    let channels_text: String = row.get("channels")?;
    Ok(TaskReminder {
        id: parse_uuid(&id_text, "task_reminders.id")?,
        task_id: parse_uuid(&task_text, "task_reminders.task_id")?,
        kind: NotificationKind::parse(&kind_text)
            .ok_or_else(|| invalid_enum(&kind_text, "task_reminders.kind"))?,
        scheduled_at: row.get("scheduled_at")?,
        title: row.get("title")?,
        message: row.get("message")?,
        channels: parse_channels(&channels_text)
            .ok_or_else(|| invalid_enum(&channels_text, "task_reminders.channels"))?,
        is_sent: parse_bool(row.get("is_sent")?, "task_reminders.is_sent")?,
        sent_at: row.get("sent_at")?,
        retry_count: parse_u32(row.get("retry_count")?, "task_reminders.retry_count")?,
        max_retries: parse_u32(row.get("max_retries")?, "task_reminders.max_retries")?,
        next_attempt_at: row.get("next_attempt_at")?,
        failed: parse_bool(row.get("failed")?, "task_reminders.failed")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_preferences_row(row: &Row<'_>) -> RepoResult<NotificationPreferences> {
    let column = "notification_preferences";
    let quiet_start: Option<String> = row.get("quiet_hours_start")?;
    let quiet_end: Option<String> = row.get("quiet_hours_end")?;
    let quiet_hours = match (quiet_start, quiet_end) {
        (Some(start), Some(end)) => Some(QuietHours::new(&start, &end).map_err(|err| {
            RepoError::InvalidData(format!("invalid quiet hours in {column}: {err}"))
        })?),
        _ => None,
    };
    Ok(NotificationPreferences {
        in_app_enabled: parse_bool(row.get("in_app_enabled")?, column)?,
        email_enabled: parse_bool(row.get("email_enabled")?, column)?,
        task_due: parse_bool(row.get("task_due")?, column)?,
        task_overdue: parse_bool(row.get("task_overdue")?, column)?,
        task_reminder: parse_bool(row.get("task_reminder")?, column)?,
        project_deadline: parse_bool(row.get("project_deadline")?, column)?,
        recurring_task: parse_bool(row.get("recurring_task")?, column)?,
        reminder_advance_minutes: parse_u32(row.get("reminder_advance_minutes")?, column)?,
        quiet_hours,
    })
}
