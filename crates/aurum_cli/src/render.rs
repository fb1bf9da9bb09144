//! Output formatting for JSON and plain-text modes.

use aurum_core::model::hierarchy::{Area, Pillar, Project, Task};
use aurum_core::model::journal::{JournalEntry, JournalTemplate};
use aurum_core::model::notification::{Notification, NotificationPreferences, TaskReminder};
use aurum_core::service::hierarchy_service::PillarNode;
use aurum_core::service::task_service::TodayView;
use aurum_core::time::date_of;
use chrono::DateTime;
use serde::Serialize;
use std::fmt::Write as _;

pub struct Printer {
    json: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Prints `value` as pretty JSON, or through `human` in text mode.
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            let text = human(value);
            if !text.is_empty() {
                println!("{}", text.trim_end());
            }
        }
        Ok(())
    }

    /// Prints a one-line confirmation; JSON mode gets `{"ok":true,...}`.
    pub fn done(&self, message: &str) -> anyhow::Result<()> {
        self.emit(&serde_json::json!({ "ok": true, "message": message }), |_| {
            message.to_string()
        })
    }
}

pub fn timestamp(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|value| value.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| epoch_ms.to_string())
}

fn archived_marker(archived: bool) -> &'static str {
    if archived {
        " [archived]"
    } else {
        ""
    }
}

pub fn pillar_line(pillar: &Pillar) -> String {
    let allocation = pillar
        .time_allocation_percentage
        .map(|value| format!(" {value}%"))
        .unwrap_or_default();
    format!(
        "{} {} {}{} weight={}{}",
        pillar.id,
        pillar.icon,
        pillar.name,
        allocation,
        pillar.weight,
        archived_marker(pillar.archived)
    )
}

pub fn area_line(area: &Area) -> String {
    format!(
        "{} {} {} importance={}{}",
        area.id,
        area.icon,
        area.name,
        area.importance,
        archived_marker(area.archived)
    )
}

pub fn project_line(project: &Project) -> String {
    let deadline = project
        .deadline
        .map(|value| format!(" deadline={}", date_of(value)))
        .unwrap_or_default();
    format!(
        "{} {} {} [{}] priority={}{}{}",
        project.id,
        project.icon,
        project.name,
        project.status.as_str(),
        project.priority.as_str(),
        deadline,
        archived_marker(project.archived)
    )
}

pub fn task_line(task: &Task) -> String {
    let check = if task.is_done() { "x" } else { " " };
    let due = match (task.due_date, task.due_time.as_deref()) {
        (Some(date), Some(time)) => format!(" due={} {time}", date_of(date)),
        (Some(date), None) => format!(" due={}", date_of(date)),
        _ => String::new(),
    };
    format!(
        "[{check}] {} {} priority={}{}",
        task.id,
        task.name,
        task.priority.as_str(),
        due
    )
}

pub fn lines<T>(items: &[T], line: impl Fn(&T) -> String, empty: &str) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    items.iter().map(line).collect::<Vec<_>>().join("\n")
}

pub fn tree(nodes: &[PillarNode]) -> String {
    if nodes.is_empty() {
        return "no pillars".to_string();
    }
    let mut out = String::new();
    for node in nodes {
        let _ = writeln!(out, "{}", pillar_line(&node.pillar));
        for area in &node.areas {
            let _ = writeln!(out, "  {}", area_line(&area.area));
            for project in &area.projects {
                let _ = writeln!(
                    out,
                    "    {} ({}/{} tasks, {}%)",
                    project_line(&project.project),
                    project.tasks.completed,
                    project.tasks.total,
                    project.progress_percentage
                );
            }
        }
    }
    out
}

pub fn today(view: &TodayView) -> String {
    let mut out = String::new();
    for row in &view.tasks {
        let mut flags = String::new();
        if row.is_overdue {
            flags.push_str(" overdue");
        }
        if !row.dependencies_met {
            flags.push_str(" blocked");
        }
        let _ = writeln!(
            out,
            "{:>6.1} {} ({} / {} / {}){}",
            row.score,
            task_line(&row.task),
            row.pillar_name,
            row.area_name,
            row.project_name,
            flags
        );
    }
    if view.tasks.is_empty() {
        out.push_str("nothing due today\n");
    }
    let _ = writeln!(
        out,
        "completed {}/{} ({}%)",
        view.stats.completed_today, view.stats.total_today, view.stats.completion_rate
    );
    out
}

pub fn entry_line(entry: &JournalEntry) -> String {
    let tags = if entry.tags.is_empty() {
        String::new()
    } else {
        format!(" #{}", entry.tags.join(" #"))
    };
    format!(
        "{} {} {} ({}){}",
        entry.id,
        timestamp(entry.created_at),
        entry.title,
        entry.mood.as_str(),
        tags
    )
}

pub fn entry(entry: &JournalEntry) -> String {
    format!("{}\n\n{}", entry_line(entry), entry.content)
}

pub fn template_line(template: &JournalTemplate) -> String {
    let builtin = if template.is_builtin { " [builtin]" } else { "" };
    format!(
        "{} {}{} ({} prompts)",
        template.id,
        template.name,
        builtin,
        template.prompts.len()
    )
}

pub fn notification_line(notification: &Notification) -> String {
    let unread = if notification.is_read { " " } else { "*" };
    format!(
        "{unread} {} {} {}: {}",
        notification.id,
        timestamp(notification.created_at),
        notification.title,
        notification.message
    )
}

pub fn reminder_line(reminder: &TaskReminder) -> String {
    let state = if reminder.is_sent {
        "sent"
    } else if reminder.failed {
        "failed"
    } else {
        "pending"
    };
    format!(
        "{} {} at {} [{}] retries={}",
        reminder.id,
        reminder.kind.as_str(),
        timestamp(reminder.scheduled_at),
        state,
        reminder.retry_count
    )
}

pub fn preferences(prefs: &NotificationPreferences) -> String {
    let quiet = prefs
        .quiet_hours
        .as_ref()
        .map(|window| format!("{}-{}", window.start, window.end))
        .unwrap_or_else(|| "off".to_string());
    format!(
        "in_app: {}\nemail: {}\ntask_due: {}\ntask_overdue: {}\ntask_reminder: {}\nadvance_minutes: {}\nquiet_hours: {}",
        prefs.in_app_enabled,
        prefs.email_enabled,
        prefs.task_due,
        prefs.task_overdue,
        prefs.task_reminder,
        prefs.reminder_advance_minutes,
        quiet
    )
}

/// `key: value` lines from any serializable struct.
pub fn fields<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(map)) => map
            .iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(text) => format!("{key}: {text}"),
                serde_json::Value::Null => format!("{key}: -"),
                other => format!("{key}: {other}"),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Ok(other) => other.to_string(),
        Err(err) => format!("<unprintable: {err}>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Sample {
        name: &'static str,
        count: u32,
        goal: Option<u32>,
    }

    #[test]
    fn fields_renders_key_value_lines() {
        let text = fields(&Sample {
            name: "focus",
            count: 3,
            goal: None,
        });
        assert_eq!(text, "count: 3\ngoal: -\nname: focus");
    }

    #[test]
    fn timestamp_formats_utc_minutes() {
        assert_eq!(timestamp(0), "1970-01-01 00:00");
    }

    #[test]
    fn lines_uses_placeholder_when_empty() {
        let items: Vec<u8> = Vec::new();
        assert_eq!(lines(&items, |item| item.to_string(), "none"), "none");
    }
}
