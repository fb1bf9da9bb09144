//! Task reminders, delivery and the in-app inbox.
//!
//! # Responsibility
//! - Schedule advance/due reminders from a task's due instant.
//! - Deliver due reminders through enabled channels, honoring quiet hours.
//! - Retry failed deliveries with linear backoff, then mark them failed.
//! - Raise overdue reminders at most once per hour per task.
//!
//! # Invariants
//! - Reminders of a disabled kind, or with no enabled channel, stay pending
//!   and are not read by a delivery pass, so they never fill its batch.
//! - Deferred reminders stay pending.
//! - A task has at most one pending overdue reminder.
//! - In-app notifications are stored on the first attempt only, so email
//!   retries never duplicate inbox rows.
//! - Email goes through [`CooldownBreaker`]; while it is open, reminders
//!   are deferred without consuming a retry.

use crate::breaker::{BreakerError, CooldownBreaker};
use crate::model::hierarchy::{Task, TaskId};
use crate::model::notification::{
    Notification, NotificationChannel, NotificationId, NotificationKind, NotificationPreferences,
    QuietHours, TaskReminder,
};
use crate::model::validate::{check_range, ValidationError};
use crate::repo::notification_repo::NotificationRepository;
use crate::repo::task_repo::TaskRepository;
use crate::repo::RepoError;
use crate::time::{minute_of_day, MS_PER_HOUR, MS_PER_MINUTE};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const EMAIL_BREAKER_KEY: &str = "email";
const RETRY_STEP_MS: i64 = 5 * MS_PER_MINUTE;
const OVERDUE_REPEAT_MS: i64 = MS_PER_HOUR;
const MAX_ADVANCE_MINUTES: i64 = 24 * 60;
pub const DEFAULT_EMAIL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_BATCH_SIZE: u32 = 100;

/// Outbound email payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub reminder_id: Uuid,
    pub task_id: TaskId,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailError(pub String);

impl Display for EmailError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "email delivery failed: {}", self.0)
    }
}

impl Error for EmailError {}

/// Delivery port for the email channel.
pub trait EmailSender: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Sender that accepts every message and only logs its metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        info!(
            "event=email_send module=notification status=ok reminder_id={} task_id={}",
            message.reminder_id, message.task_id
        );
        Ok(())
    }
}

#[derive(Debug)]
pub enum NotificationError {
    Validation(ValidationError),
    NotificationNotFound(NotificationId),
    TaskNotFound(TaskId),
    Repo(RepoError),
}

impl Display for NotificationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotificationNotFound(id) => write!(f, "notification not found: {id}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NotificationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for NotificationError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for NotificationError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "notification",
                id,
            } => Self::NotificationNotFound(id),
            RepoError::NotFound { entity: "task", id } => Self::TaskNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

pub type NotificationResult<T> = Result<T, NotificationError>;

/// Counters for one [`NotificationService::process_due_reminders`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    pub examined: usize,
    pub sent: usize,
    /// Held back by quiet hours or an open email breaker.
    pub deferred: usize,
    pub retried: usize,
    pub failed: usize,
}

enum Delivery {
    Sent,
    Deferred { until: i64 },
    Failed,
}

pub struct NotificationService<N: NotificationRepository, T: TaskRepository, E: EmailSender + 'static> {
    notifications: N,
    tasks: T,
    email: Arc<E>,
    breaker: CooldownBreaker,
    email_timeout: Duration,
    batch_size: u32,
}

impl<N: NotificationRepository, T: TaskRepository, E: EmailSender + 'static> NotificationService<N, T, E> {
    pub fn new(notifications: N, tasks: T, email: Arc<E>, breaker: CooldownBreaker) -> Self {
        Self {
            notifications,
            tasks,
            email,
            breaker,
            email_timeout: DEFAULT_EMAIL_TIMEOUT,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_email_timeout(mut self, timeout: Duration) -> Self {
        self.email_timeout = timeout;
        self
    }

    pub fn preferences(&self) -> NotificationResult<NotificationPreferences> {
        Ok(self.notifications.load_preferences()?)
    }

    pub fn update_preferences(
        &self,
        preferences: &NotificationPreferences,
    ) -> NotificationResult<NotificationPreferences> {
        check_range(
            "reminder_advance_minutes",
            i64::from(preferences.reminder_advance_minutes),
            0,
            MAX_ADVANCE_MINUTES,
        )?;
        let mut preferences = preferences.clone();
        if let Some(window) = preferences.quiet_hours.as_ref() {
            preferences.quiet_hours = Some(QuietHours::new(&window.start, &window.end)?);
        }
        self.notifications.save_preferences(&preferences)?;
        Ok(preferences)
    }

    /// Replaces the task's pending advance/due reminders with fresh ones.
    ///
    /// Tasks without a due date or already done get none.
    pub fn schedule_task_reminders(&self, task: &Task, now: i64) -> NotificationResult<Vec<TaskReminder>> {
        self.notifications.cancel_pending_reminders(task.id)?;
        let Some(due_at) = task.due_at() else {
            return Ok(Vec::new());
        };
        if task.is_done() {
            return Ok(Vec::new());
        }

        let preferences = self.notifications.load_preferences()?;
        let project_suffix = self.project_suffix(task)?;
        let mut scheduled = Vec::new();

        let advance_minutes = preferences.reminder_advance_minutes;
        if preferences.task_reminder && advance_minutes > 0 {
            let remind_at = due_at - i64::from(advance_minutes) * MS_PER_MINUTE;
            if remind_at > now {
                scheduled.push(TaskReminder::new(
                    task.id,
                    NotificationKind::TaskReminder,
                    remind_at,
                    format!("Task Due Soon: {}", task.name),
                    format!(
                        "Your task '{}' is due in {advance_minutes} minutes.{project_suffix}",
                        task.name
                    ),
                    preferences.default_channels(),
                    now,
                ));
            }
        }

        if preferences.task_due {
            scheduled.push(TaskReminder::new(
                task.id,
                NotificationKind::TaskDue,
                due_at,
                format!("Task Due Now: {}", task.name),
                format!("Your task '{}' is due now.{project_suffix}", task.name),
                preferences.default_channels(),
                now,
            ));
        }

        for reminder in &scheduled {
            self.notifications.insert_reminder(reminder)?;
        }
        info!(
            "event=reminder_schedule module=notification status=ok task_id={} count={}",
            task.id,
            scheduled.len()
        );
        Ok(scheduled)
    }

    /// Delivers every reminder that is due at `now`.
    pub fn process_due_reminders(&self, now: i64) -> NotificationResult<ProcessReport> {
        let preferences = self.notifications.load_preferences()?;
        let quiet = preferences.in_quiet_hours(minute_of_day(now));
        let mut report = ProcessReport::default();

        let due = self.notifications.list_due_reminders(
            now,
            &preferences.enabled_kinds(),
            &preferences.enabled_channels(),
            self.batch_size,
        )?;
        for mut reminder in due {
            report.examined += 1;
            if quiet {
                debug!(
                    "event=reminder_defer module=notification status=quiet_hours reminder_id={}",
                    reminder.id
                );
                report.deferred += 1;
                continue;
            }
            let channels: Vec<NotificationChannel> = reminder
                .channels
                .iter()
                .copied()
                .filter(|channel| preferences.channel_enabled(*channel))
                .collect();

            match self.deliver(&reminder, &channels, now)? {
                Delivery::Sent => {
                    self.notifications.mark_reminder_sent(reminder.id, now)?;
                    report.sent += 1;
                }
                Delivery::Deferred { until } => {
                    reminder.next_attempt_at = Some(until);
                    self.notifications.record_reminder_failure(&reminder)?;
                    report.deferred += 1;
                }
                Delivery::Failed => {
                    schedule_retry(&mut reminder, now);
                    self.notifications.record_reminder_failure(&reminder)?;
                    if reminder.failed {
                        error!(
                            "event=reminder_fail module=notification status=error reminder_id={} retries={}",
                            reminder.id, reminder.retry_count
                        );
                        report.failed += 1;
                    } else {
                        warn!(
                            "event=reminder_retry module=notification status=retry reminder_id={} retry={} next_attempt_at={:?}",
                            reminder.id, reminder.retry_count, reminder.next_attempt_at
                        );
                        report.retried += 1;
                    }
                }
            }
        }

        if report.examined > 0 {
            info!(
                "event=reminder_process module=notification status=ok examined={} sent={} deferred={} retried={} failed={}",
                report.examined, report.sent, report.deferred, report.retried, report.failed
            );
        }
        Ok(report)
    }

    /// Queues an overdue reminder for each open overdue task that has none
    /// pending and was not sent one within the last hour. Returns how many
    /// were queued.
    pub fn check_overdue_tasks(&self, now: i64) -> NotificationResult<usize> {
        let preferences = self.notifications.load_preferences()?;
        if !preferences.task_overdue {
            return Ok(0);
        }

        let mut queued = 0;
        for task in self.tasks.list_open_overdue(now)? {
            if !task.due_at().is_some_and(|due| due < now) {
                continue;
            }
            let Some(context) = self.tasks.hierarchy_context(task.project_id)? else {
                continue;
            };
            if self.notifications.has_pending_overdue_reminder(task.id)? {
                continue;
            }
            if let Some(last) = self.notifications.last_overdue_sent_at(task.id)? {
                if now - last < OVERDUE_REPEAT_MS {
                    continue;
                }
            }

            let reminder = TaskReminder::new(
                task.id,
                NotificationKind::TaskOverdue,
                now,
                format!("Overdue Task: {}", task.name),
                format!(
                    "Your task '{}' is overdue. Please review and update it. (Project: {})",
                    task.name, context.project_name
                ),
                preferences.default_channels(),
                now,
            );
            self.notifications.insert_reminder(&reminder)?;
            queued += 1;
        }

        if queued > 0 {
            info!("event=overdue_check module=notification status=ok queued={queued}");
        }
        Ok(queued)
    }

    pub fn list_notifications(&self, unread_only: bool, limit: u32) -> NotificationResult<Vec<Notification>> {
        Ok(self.notifications.list_notifications(unread_only, limit)?)
    }

    pub fn unread_count(&self) -> NotificationResult<u64> {
        Ok(self.notifications.count_unread()?)
    }

    pub fn mark_read(&self, id: NotificationId) -> NotificationResult<()> {
        Ok(self.notifications.mark_read(id)?)
    }

    pub fn mark_all_read(&self) -> NotificationResult<usize> {
        Ok(self.notifications.mark_all_read()?)
    }

    pub fn delete_notification(&self, id: NotificationId) -> NotificationResult<()> {
        Ok(self.notifications.delete_notification(id)?)
    }

    pub fn clear_notifications(&self) -> NotificationResult<usize> {
        Ok(self.notifications.clear_notifications()?)
    }

    pub fn task_reminders(&self, task_id: TaskId) -> NotificationResult<Vec<TaskReminder>> {
        Ok(self.notifications.list_task_reminders(task_id)?)
    }

    fn deliver(
        &self,
        reminder: &TaskReminder,
        channels: &[NotificationChannel],
        now: i64,
    ) -> NotificationResult<Delivery> {
        // An open breaker holds the whole reminder back, in-app row included.
        if channels.contains(&NotificationChannel::Email) {
            if let Some(until) = self.breaker.retry_at(EMAIL_BREAKER_KEY, now) {
                return Ok(Delivery::Deferred { until });
            }
        }
        if channels.contains(&NotificationChannel::InApp) && reminder.retry_count == 0 {
            self.notifications.insert_notification(&Notification {
                id: Uuid::new_v4(),
                kind: reminder.kind,
                title: reminder.title.clone(),
                message: reminder.message.clone(),
                task_id: Some(reminder.task_id),
                is_read: false,
                created_at: now,
            })?;
        }

        if !channels.contains(&NotificationChannel::Email) {
            return Ok(Delivery::Sent);
        }

        let sender = Arc::clone(&self.email);
        let message = EmailMessage {
            reminder_id: reminder.id,
            task_id: reminder.task_id,
            subject: format!("Aurum Life: {}", reminder.title),
            body: reminder.message.clone(),
        };
        match self
            .breaker
            .call_with_timeout(EMAIL_BREAKER_KEY, now, self.email_timeout, move || {
                sender.send(&message)
            }) {
            Ok(()) => Ok(Delivery::Sent),
            Err(BreakerError::Open { retry_at, .. }) => Ok(Delivery::Deferred { until: retry_at }),
            Err(err) => {
                warn!(
                    "event=email_send module=notification status=error reminder_id={} error={}",
                    reminder.id, err
                );
                Ok(Delivery::Failed)
            }
        }
    }

    fn project_suffix(&self, task: &Task) -> NotificationResult<String> {
        Ok(self
            .tasks
            .hierarchy_context(task.project_id)?
            .map(|context| format!(" (Project: {})", context.project_name))
            .unwrap_or_default())
    }
}

/// Linear backoff: the n-th retry waits `5min * n`; past `max_retries`
/// the reminder is marked failed.
fn schedule_retry(reminder: &mut TaskReminder, now: i64) {
    if reminder.retry_count < reminder.max_retries {
        reminder.next_attempt_at = Some(now + RETRY_STEP_MS * i64::from(reminder.retry_count + 1));
        reminder.retry_count += 1;
    } else {
        reminder.failed = true;
        reminder.next_attempt_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder() -> TaskReminder {
        TaskReminder::new(
            Uuid::new_v4(),
            NotificationKind::TaskDue,
            0,
            "t".to_string(),
            "m".to_string(),
            vec![NotificationChannel::Email],
            0,
        )
    }

    #[test]
    fn retries_back_off_linearly_then_fail() {
        let mut reminder = reminder();
        schedule_retry(&mut reminder, 1_000);
        assert_eq!(reminder.retry_count, 1);
        assert_eq!(reminder.next_attempt_at, Some(1_000 + 5 * MS_PER_MINUTE));

        schedule_retry(&mut reminder, 2_000);
        assert_eq!(reminder.next_attempt_at, Some(2_000 + 10 * MS_PER_MINUTE));
        schedule_retry(&mut reminder, 3_000);
        assert_eq!(reminder.retry_count, 3);
        assert!(!reminder.failed);

        schedule_retry(&mut reminder, 4_000);
        assert!(reminder.failed);
        assert_eq!(reminder.next_attempt_at, None);
        assert_eq!(reminder.retry_count, 3);
    }

    #[test]
    fn email_error_displays_reason() {
        let err = EmailError("smtp down".to_string());
        assert_eq!(err.to_string(), "email delivery failed: smtp down");
    }
}
