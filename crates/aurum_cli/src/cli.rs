//! Command-line surface.

use aurum_core::model::hierarchy::{Priority, ProjectStatus, TaskStatus};
use aurum_core::model::journal::Mood;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// aurum: align daily work with the pillars of your life
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Config file to use instead of the default search path.
    #[arg(long, global = true, env = "AURUM_CONFIG")]
    pub config: Option<PathBuf>,
    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage pillars.
    #[command(subcommand)]
    Pillar(PillarCommand),
    /// Manage areas.
    #[command(subcommand)]
    Area(AreaCommand),
    /// Manage projects.
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Manage tasks.
    #[command(subcommand)]
    Task(TaskCommand),
    /// Show pillars, areas and projects as a tree.
    Tree {
        #[arg(long)]
        archived: bool,
    },
    /// Prioritized tasks for today.
    Today {
        /// Maximum tasks to show; defaults to `today_limit` from config.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// End-of-day summary.
    Summary,
    /// Write and browse journal entries.
    #[command(subcommand)]
    Journal(JournalCommand),
    /// Manage journal templates.
    #[command(subcommand)]
    Template(TemplateCommand),
    /// Notifications and reminders.
    #[command(subcommand)]
    Notify(NotifyCommand),
    /// Alignment score dashboard.
    Alignment,
    /// Completion insights.
    #[command(subcommand)]
    Insights(InsightsCommand),
    /// User settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Developer diagnostics.
    #[cfg(debug_assertions)]
    #[command(subcommand)]
    Debug(DebugCommand),
}

#[derive(Args, Debug)]
pub struct ListFlags {
    /// Include archived items.
    #[arg(long)]
    pub archived: bool,
}

#[derive(Subcommand, Debug)]
pub enum PillarCommand {
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        icon: String,
        #[arg(long, default_value = "")]
        color: String,
        /// Share of weekly time, 0-100.
        #[arg(long)]
        allocation: Option<u8>,
        /// Scoring weight, 0.1-2.0.
        #[arg(long)]
        weight: Option<f64>,
    },
    List(ListFlags),
    Show {
        id: Uuid,
    },
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long, conflicts_with = "clear_allocation")]
        allocation: Option<u8>,
        #[arg(long)]
        clear_allocation: bool,
        #[arg(long)]
        weight: Option<f64>,
    },
    Archive {
        id: Uuid,
    },
    Unarchive {
        id: Uuid,
    },
    /// Set the display order; every active pillar must be listed once.
    Reorder {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<Uuid>,
    },
    /// Delete a pillar with all of its areas, projects and tasks.
    Delete {
        id: Uuid,
    },
    Stats {
        id: Uuid,
    },
}

#[derive(Subcommand, Debug)]
pub enum AreaCommand {
    Create {
        #[arg(long)]
        pillar: Uuid,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        icon: String,
        #[arg(long, default_value = "")]
        color: String,
        /// 1 (low) to 5 (critical).
        #[arg(long)]
        importance: Option<u8>,
    },
    List {
        #[arg(long)]
        pillar: Option<Uuid>,
        #[command(flatten)]
        flags: ListFlags,
    },
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        importance: Option<u8>,
    },
    Move {
        id: Uuid,
        #[arg(long)]
        pillar: Uuid,
    },
    Archive {
        id: Uuid,
    },
    Unarchive {
        id: Uuid,
    },
    Delete {
        id: Uuid,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    Create {
        #[arg(long)]
        area: Uuid,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        icon: String,
        #[arg(long, value_parser = parse_project_status, default_value = "not_started")]
        status: ProjectStatus,
        #[arg(long, value_parser = parse_priority, default_value = "medium")]
        priority: Priority,
        #[arg(long)]
        importance: Option<u8>,
        /// Deadline as YYYY-MM-DD.
        #[arg(long)]
        deadline: Option<NaiveDate>,
    },
    List {
        #[arg(long)]
        area: Option<Uuid>,
        #[command(flatten)]
        flags: ListFlags,
    },
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long, value_parser = parse_project_status)]
        status: Option<ProjectStatus>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long)]
        importance: Option<u8>,
        #[arg(long, conflicts_with = "clear_deadline")]
        deadline: Option<NaiveDate>,
        #[arg(long)]
        clear_deadline: bool,
    },
    Move {
        id: Uuid,
        #[arg(long)]
        area: Uuid,
    },
    Archive {
        id: Uuid,
    },
    Unarchive {
        id: Uuid,
    },
    Delete {
        id: Uuid,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    Create {
        #[arg(long)]
        project: Uuid,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_parser = parse_priority, default_value = "medium")]
        priority: Priority,
        /// Due date as YYYY-MM-DD.
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Due time as HH:MM (UTC).
        #[arg(long, requires = "due")]
        at: Option<String>,
        /// Estimate in minutes.
        #[arg(long)]
        estimate: Option<u32>,
        #[arg(long = "depends-on")]
        depends_on: Vec<Uuid>,
    },
    List {
        #[arg(long)]
        project: Uuid,
    },
    Show {
        id: Uuid,
    },
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long, value_parser = parse_task_status)]
        status: Option<TaskStatus>,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,
        #[arg(long)]
        clear_due: bool,
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        estimate: Option<u32>,
    },
    /// Replace the task's dependencies.
    Deps {
        id: Uuid,
        ids: Vec<Uuid>,
    },
    Complete {
        id: Uuid,
    },
    Reopen {
        id: Uuid,
    },
    Delete {
        id: Uuid,
    },
    /// Show the pillar/area/project a task belongs to.
    Locate {
        id: Uuid,
    },
}

#[derive(Subcommand, Debug)]
pub enum JournalCommand {
    Create {
        title: String,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long, value_parser = parse_mood, default_value = "reflective")]
        mood: Mood,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        template: Option<Uuid>,
    },
    List {
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long)]
        limit: Option<u32>,
    },
    Show {
        id: Uuid,
    },
    Update {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long, value_parser = parse_mood)]
        mood: Option<Mood>,
        /// Replaces all tags.
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
    },
    /// Move an entry to the trash.
    Delete {
        id: Uuid,
    },
    Restore {
        id: Uuid,
    },
    /// Permanently delete a trashed entry.
    Purge {
        id: Uuid,
    },
    Trash {
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long)]
        limit: Option<u32>,
    },
    EmptyTrash,
    Search {
        query: String,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Entries from this month and day in earlier years.
    OnThisDay {
        /// Defaults to today (UTC).
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Insights,
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    List,
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "prompt", required = true)]
        prompts: Vec<String>,
    },
    Delete {
        id: Uuid,
    },
    /// Add any missing built-in templates.
    Seed,
}

#[derive(Subcommand, Debug)]
pub enum NotifyCommand {
    List {
        #[arg(long)]
        unread: bool,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    Unread,
    Read {
        id: Uuid,
    },
    ReadAll,
    Delete {
        id: Uuid,
    },
    Clear,
    /// Schedule reminders for a task from its due date.
    Schedule {
        task: Uuid,
    },
    /// Deliver reminders that are due now.
    Process,
    /// Queue reminders for overdue tasks.
    CheckOverdue,
    /// Show or change notification preferences.
    Prefs(PrefsArgs),
}

#[derive(Args, Debug)]
pub struct PrefsArgs {
    #[arg(long)]
    pub in_app: Option<bool>,
    #[arg(long)]
    pub email: Option<bool>,
    #[arg(long)]
    pub task_due: Option<bool>,
    #[arg(long)]
    pub task_overdue: Option<bool>,
    #[arg(long)]
    pub task_reminder: Option<bool>,
    /// Minutes before due for the advance reminder.
    #[arg(long)]
    pub advance: Option<u32>,
    /// Quiet hours as HH:MM-HH:MM.
    #[arg(long, conflicts_with = "clear_quiet_hours")]
    pub quiet_hours: Option<String>,
    #[arg(long)]
    pub clear_quiet_hours: bool,
}

#[derive(Subcommand, Debug)]
pub enum InsightsCommand {
    /// Completed work per pillar.
    Snapshot,
    Area { id: Uuid },
    Project { id: Uuid },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    Show,
    /// Set the display name; an empty value clears it.
    Name { name: String },
    /// Set the monthly alignment goal.
    Goal {
        #[arg(conflicts_with = "clear")]
        points: Option<u32>,
        #[arg(long)]
        clear: bool,
    },
    Onboarding {
        #[arg(action = clap::ArgAction::Set)]
        completed: bool,
    },
}

#[cfg(debug_assertions)]
#[derive(Subcommand, Debug)]
pub enum DebugCommand {
    /// Print store metadata and row counts.
    Dump,
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    Priority::parse(value).ok_or_else(|| format!("expected low|medium|high, got `{value}`"))
}

fn parse_project_status(value: &str) -> Result<ProjectStatus, String> {
    ProjectStatus::parse(value)
        .ok_or_else(|| format!("expected not_started|in_progress|completed|on_hold, got `{value}`"))
}

fn parse_task_status(value: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(value).ok_or_else(|| format!("expected todo|in_progress|done, got `{value}`"))
}

fn parse_mood(value: &str) -> Result<Mood, String> {
    Mood::parse(value)
        .ok_or_else(|| format!("expected optimistic|inspired|reflective|challenging, got `{value}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["aurum", "today", "--limit", "5", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Today { limit: Some(5) }));
    }

    #[test]
    fn rejects_unknown_priority() {
        let err = Cli::try_parse_from([
            "aurum",
            "task",
            "create",
            "--project",
            "7f1c2f0e-2f1d-4a43-9f55-8a9f3e2c1b10",
            "Write",
            "--priority",
            "urgent",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("low|medium|high"));
    }
}
