//! Notification, reminder and preference records.
//!
//! # Invariants
//! - A reminder is terminal once `is_sent` or `failed` is set.
//! - `retry_count <= max_retries`.

use crate::model::hierarchy::TaskId;
use crate::model::validate::{parse_time_of_day, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type NotificationId = Uuid;
pub type ReminderId = Uuid;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_REMINDER_ADVANCE_MINUTES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskDue,
    TaskOverdue,
    TaskReminder,
    ProjectDeadline,
    RecurringTask,
}

impl NotificationKind {
    pub const ALL: [Self; 5] = [
        Self::TaskDue,
        Self::TaskOverdue,
        Self::TaskReminder,
        Self::ProjectDeadline,
        Self::RecurringTask,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaskDue => "task_due",
            Self::TaskOverdue => "task_overdue",
            Self::TaskReminder => "task_reminder",
            Self::ProjectDeadline => "project_deadline",
            Self::RecurringTask => "recurring_task",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "task_due" => Some(Self::TaskDue),
            "task_overdue" => Some(Self::TaskOverdue),
            "task_reminder" => Some(Self::TaskReminder),
            "project_deadline" => Some(Self::ProjectDeadline),
            "recurring_task" => Some(Self::RecurringTask),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    InApp,
    Email,
}

impl NotificationChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InApp => "in_app",
            Self::Email => "email",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "in_app" => Some(Self::InApp),
            "email" => Some(Self::Email),
            _ => None,
        }
    }
}

/// Stored in-app notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub task_id: Option<TaskId>,
    pub is_read: bool,
    pub created_at: i64,
}

/// Scheduled delivery for one task event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReminder {
    pub id: ReminderId,
    pub task_id: TaskId,
    pub kind: NotificationKind,
    pub scheduled_at: i64,
    pub title: String,
    pub message: String,
    pub channels: Vec<NotificationChannel>,
    pub is_sent: bool,
    pub sent_at: Option<i64>,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Earliest time the next delivery attempt may run.
    pub next_attempt_at: Option<i64>,
    pub failed: bool,
    pub created_at: i64,
}

impl TaskReminder {
    pub fn new(
        task_id: TaskId,
        kind: NotificationKind,
        scheduled_at: i64,
        title: String,
        message: String,
        channels: Vec<NotificationChannel>,
        now: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            kind,
            scheduled_at,
            title,
            message,
            channels,
            is_sent: false,
            sent_at: None,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            next_attempt_at: None,
            failed: false,
            created_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.is_sent && !self.failed
    }
}

/// `HH:MM` window during which deliveries are held back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    pub start: String,
    pub end: String,
}

impl QuietHours {
    pub fn new(start: &str, end: &str) -> Result<Self, ValidationError> {
        parse_time_of_day("quiet_hours_start", start)?;
        parse_time_of_day("quiet_hours_end", end)?;
        Ok(Self {
            start: start.trim().to_string(),
            end: end.trim().to_string(),
        })
    }

    /// Whether `minute_of_day` falls inside the window. Windows whose end
    /// precedes their start wrap past midnight; an empty window never matches.
    pub fn contains(&self, minute_of_day: u32) -> bool {
        let (Ok(start), Ok(end)) = (
            parse_time_of_day("quiet_hours_start", &self.start),
            parse_time_of_day("quiet_hours_end", &self.end),
        ) else {
            return false;
        };
        if start <= end {
            start <= minute_of_day && minute_of_day < end
        } else {
            minute_of_day >= start || minute_of_day < end
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub in_app_enabled: bool,
    pub email_enabled: bool,
    pub task_due: bool,
    pub task_overdue: bool,
    pub task_reminder: bool,
    pub project_deadline: bool,
    pub recurring_task: bool,
    pub reminder_advance_minutes: u32,
    pub quiet_hours: Option<QuietHours>,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            in_app_enabled: true,
            email_enabled: true,
            task_due: true,
            task_overdue: true,
            task_reminder: true,
            project_deadline: true,
            recurring_task: true,
            reminder_advance_minutes: DEFAULT_REMINDER_ADVANCE_MINUTES,
            quiet_hours: None,
        }
    }
}

impl NotificationPreferences {
    pub fn kind_enabled(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::TaskDue => self.task_due,
            NotificationKind::TaskOverdue => self.task_overdue,
            NotificationKind::TaskReminder => self.task_reminder,
            NotificationKind::ProjectDeadline => self.project_deadline,
            NotificationKind::RecurringTask => self.recurring_task,
        }
    }

    pub fn channel_enabled(&self, channel: NotificationChannel) -> bool {
        match channel {
            NotificationChannel::InApp => self.in_app_enabled,
            NotificationChannel::Email => self.email_enabled,
        }
    }

    pub fn enabled_kinds(&self) -> Vec<NotificationKind> {
        NotificationKind::ALL
            .into_iter()
            .filter(|kind| self.kind_enabled(*kind))
            .collect()
    }

    pub fn enabled_channels(&self) -> Vec<NotificationChannel> {
        [NotificationChannel::InApp, NotificationChannel::Email]
            .into_iter()
            .filter(|channel| self.channel_enabled(*channel))
            .collect()
    }

    /// Channels to use for new reminders.
    pub fn default_channels(&self) -> Vec<NotificationChannel> {
        let mut channels = vec![NotificationChannel::InApp];
        if self.email_enabled {
            channels.push(NotificationChannel::Email);
        }
        channels
    }

    pub fn in_quiet_hours(&self, minute_of_day: u32) -> bool {
        self.quiet_hours
            .as_ref()
            .is_some_and(|window| window.contains(minute_of_day))
    }
}

/// Encodes channels as a comma-separated column value.
pub fn channels_to_db(channels: &[NotificationChannel]) -> String {
    channels
        .iter()
        .map(|channel| channel.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn parse_channels(value: &str) -> Option<Vec<NotificationChannel>> {
    if value.trim().is_empty() {
        return Some(Vec::new());
    }
    value.split(',').map(NotificationChannel::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_hours_same_day_window() {
        let window = QuietHours::new("13:00", "14:30").unwrap();
        assert!(!window.contains(12 * 60 + 59));
        assert!(window.contains(13 * 60));
        assert!(window.contains(14 * 60 + 29));
        assert!(!window.contains(14 * 60 + 30));
    }

    #[test]
    fn quiet_hours_wrap_past_midnight() {
        let window = QuietHours::new("22:00", "07:00").unwrap();
        assert!(window.contains(23 * 60));
        assert!(window.contains(0));
        assert!(window.contains(6 * 60 + 59));
        assert!(!window.contains(7 * 60));
        assert!(!window.contains(12 * 60));
    }

    #[test]
    fn quiet_hours_reject_malformed_bounds() {
        assert!(QuietHours::new("22:00", "7am").is_err());
    }

    #[test]
    fn channels_encode_and_parse() {
        let encoded = channels_to_db(&[NotificationChannel::InApp, NotificationChannel::Email]);
        assert_eq!(encoded, "in_app,email");
        assert_eq!(
            parse_channels(&encoded),
            Some(vec![NotificationChannel::InApp, NotificationChannel::Email])
        );
        assert_eq!(parse_channels(""), Some(Vec::new()));
        assert_eq!(parse_channels("sms"), None);
    }

    #[test]
    fn default_channels_follow_email_toggle() {
        let mut prefs = NotificationPreferences::default();
        assert_eq!(prefs.default_channels().len(), 2);
        prefs.email_enabled = false;
        assert_eq!(prefs.default_channels(), vec![NotificationChannel::InApp]);
    }
}
