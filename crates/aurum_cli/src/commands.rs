//! Subcommand dispatch.
//!
//! Each handler builds the services it needs from the shared connection,
//! runs one use-case and hands the result to the [`Printer`].

use crate::cli::{
    AreaCommand, Command, InsightsCommand, JournalCommand, NotifyCommand, PillarCommand, PrefsArgs,
    ProjectCommand, SettingsCommand, TaskCommand, TemplateCommand,
};
use crate::render::{self, Printer};
use anyhow::{bail, Context};
use aurum_core::model::hierarchy::{
    AreaDraft, AreaPatch, PillarDraft, PillarPatch, ProjectDraft, ProjectPatch, Task, TaskDraft,
    TaskPatch,
};
use aurum_core::model::journal::{JournalDraft, JournalPatch, TemplateDraft};
use aurum_core::model::notification::QuietHours;
use aurum_core::repo::task_repo::TaskRepository;
use aurum_core::service::task_service::TaskService;
use aurum_core::time::{date_of, now_epoch_ms, start_of_day};
use aurum_core::{
    AlignmentService, AppConfig, CooldownBreaker, HierarchyService, InsightsService,
    JournalService, ListOptions, LogEmailSender, NotificationService, SettingsService,
    SqliteAlignmentRepository, SqliteHierarchyRepository, SqliteJournalRepository,
    SqliteNotificationRepository, SqliteSettingsRepository, SqliteTaskRepository,
};
use chrono::NaiveDate;
use log::info;
use rusqlite::Connection;
use std::sync::Arc;

type Hierarchy<'conn> = HierarchyService<SqliteHierarchyRepository<'conn>, SqliteTaskRepository<'conn>>;
type Tasks<'conn> = TaskService<SqliteTaskRepository<'conn>, SqliteAlignmentRepository<'conn>>;
type Notifications<'conn> =
    NotificationService<SqliteNotificationRepository<'conn>, SqliteTaskRepository<'conn>, LogEmailSender>;

pub fn dispatch(
    conn: &Connection,
    config: &AppConfig,
    printer: &Printer,
    command: Command,
) -> anyhow::Result<()> {
    let name = command_name(&command);
    let now = now_epoch_ms();
    let result = match command {
        Command::Pillar(command) => pillar(conn, printer, command, now),
        Command::Area(command) => area(conn, printer, command, now),
        Command::Project(command) => project(conn, printer, command, now),
        Command::Task(command) => task(conn, config, printer, command, now),
        Command::Tree { archived } => {
            let nodes = hierarchy(conn)?.hierarchy_tree(ListOptions {
                include_archived: archived,
            })?;
            printer.emit(&nodes, |nodes| render::tree(nodes))
        }
        Command::Today { limit } => {
            let limit = limit.unwrap_or(config.today_limit as usize);
            let view = tasks(conn)?.today(now, limit)?;
            printer.emit(&view, render::today)
        }
        Command::Summary => {
            let summary = tasks(conn)?.daily_summary(now)?;
            printer.emit(&summary, render::fields)
        }
        Command::Journal(command) => journal(conn, printer, command, now),
        Command::Template(command) => template(conn, printer, command, now),
        Command::Notify(command) => notify(conn, config, printer, command, now),
        Command::Alignment => {
            let service = AlignmentService::new(
                SqliteAlignmentRepository::try_new(conn)?,
                SqliteSettingsRepository::try_new(conn)?,
            );
            printer.emit(&service.dashboard(now)?, render::fields)
        }
        Command::Insights(command) => insights(conn, printer, command),
        Command::Settings(command) => settings(conn, printer, command, now),
        #[cfg(debug_assertions)]
        Command::Debug(crate::cli::DebugCommand::Dump) => debug_dump(conn, config, printer),
    };
    let status = if result.is_ok() { "ok" } else { "error" };
    info!("event=cli_command module=cli status={status} command={name}");
    result
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Pillar(_) => "pillar",
        Command::Area(_) => "area",
        Command::Project(_) => "project",
        Command::Task(_) => "task",
        Command::Tree { .. } => "tree",
        Command::Today { .. } => "today",
        Command::Summary => "summary",
        Command::Journal(_) => "journal",
        Command::Template(_) => "template",
        Command::Notify(_) => "notify",
        Command::Alignment => "alignment",
        Command::Insights(_) => "insights",
        Command::Settings(_) => "settings",
        #[cfg(debug_assertions)]
        Command::Debug(_) => "debug",
    }
}

fn hierarchy(conn: &Connection) -> anyhow::Result<Hierarchy<'_>> {
    Ok(HierarchyService::new(
        SqliteHierarchyRepository::try_new(conn)?,
        SqliteTaskRepository::try_new(conn)?,
    ))
}

fn tasks(conn: &Connection) -> anyhow::Result<Tasks<'_>> {
    Ok(TaskService::new(
        SqliteTaskRepository::try_new(conn)?,
        SqliteAlignmentRepository::try_new(conn)?,
    ))
}

fn notifications<'conn>(
    conn: &'conn Connection,
    config: &AppConfig,
) -> anyhow::Result<Notifications<'conn>> {
    Ok(NotificationService::new(
        SqliteNotificationRepository::try_new(conn)?,
        SqliteTaskRepository::try_new(conn)?,
        Arc::new(LogEmailSender),
        CooldownBreaker::new(config.email_cooldown_ms()),
    )
    .with_batch_size(config.reminder_poll_batch))
}

fn journal_service(conn: &Connection) -> anyhow::Result<JournalService<SqliteJournalRepository<'_>>> {
    Ok(JournalService::new(SqliteJournalRepository::try_new(conn)?))
}

fn day_start(date: Option<NaiveDate>) -> Option<i64> {
    date.map(start_of_day)
}

fn pillar(conn: &Connection, printer: &Printer, command: PillarCommand, now: i64) -> anyhow::Result<()> {
    let service = hierarchy(conn)?;
    match command {
        PillarCommand::Create {
            name,
            description,
            icon,
            color,
            allocation,
            weight,
        } => {
            let pillar = service.create_pillar(
                &PillarDraft {
                    name,
                    description,
                    icon,
                    color,
                    time_allocation_percentage: allocation,
                    weight,
                },
                now,
            )?;
            printer.emit(&pillar, render::pillar_line)
        }
        PillarCommand::List(flags) => {
            let pillars = service.list_pillars(ListOptions {
                include_archived: flags.archived,
            })?;
            printer.emit(&pillars, |pillars| {
                render::lines(pillars, render::pillar_line, "no pillars")
            })
        }
        PillarCommand::Show { id } => printer.emit(&service.get_pillar(id)?, render::fields),
        PillarCommand::Update {
            id,
            name,
            description,
            icon,
            color,
            allocation,
            clear_allocation,
            weight,
        } => {
            let time_allocation_percentage = if clear_allocation {
                Some(None)
            } else {
                allocation.map(Some)
            };
            let pillar = service.update_pillar(
                id,
                &PillarPatch {
                    name,
                    description,
                    icon,
                    color,
                    time_allocation_percentage,
                    weight,
                },
                now,
            )?;
            printer.emit(&pillar, render::pillar_line)
        }
        PillarCommand::Archive { id } => {
            printer.emit(&service.set_pillar_archived(id, true, now)?, render::pillar_line)
        }
        PillarCommand::Unarchive { id } => {
            printer.emit(&service.set_pillar_archived(id, false, now)?, render::pillar_line)
        }
        PillarCommand::Reorder { ids } => {
            service.reorder_pillars(&ids, now)?;
            printer.done(&format!("reordered {} pillars", ids.len()))
        }
        PillarCommand::Delete { id } => printer.emit(&service.delete_pillar(id, now)?, render::fields),
        PillarCommand::Stats { id } => printer.emit(&service.pillar_stats(id)?, render::fields),
    }
}

fn area(conn: &Connection, printer: &Printer, command: AreaCommand, now: i64) -> anyhow::Result<()> {
    let service = hierarchy(conn)?;
    match command {
        AreaCommand::Create {
            pillar,
            name,
            description,
            icon,
            color,
            importance,
        } => {
            let area = service.create_area(
                &AreaDraft {
                    pillar_id: pillar,
                    name,
                    description,
                    icon,
                    color,
                    importance,
                },
                now,
            )?;
            printer.emit(&area, render::area_line)
        }
        AreaCommand::List { pillar, flags } => {
            let areas = service.list_areas(
                pillar,
                ListOptions {
                    include_archived: flags.archived,
                },
            )?;
            printer.emit(&areas, |areas| render::lines(areas, render::area_line, "no areas"))
        }
        AreaCommand::Update {
            id,
            name,
            description,
            icon,
            color,
            importance,
        } => {
            let area = service.update_area(
                id,
                &AreaPatch {
                    name,
                    description,
                    icon,
                    color,
                    importance,
                },
                now,
            )?;
            printer.emit(&area, render::area_line)
        }
        AreaCommand::Move { id, pillar } => {
            printer.emit(&service.move_area(id, pillar, now)?, render::area_line)
        }
        AreaCommand::Archive { id } => {
            printer.emit(&service.set_area_archived(id, true, now)?, render::area_line)
        }
        AreaCommand::Unarchive { id } => {
            printer.emit(&service.set_area_archived(id, false, now)?, render::area_line)
        }
        AreaCommand::Delete { id } => printer.emit(&service.delete_area(id, now)?, render::fields),
    }
}

fn project(conn: &Connection, printer: &Printer, command: ProjectCommand, now: i64) -> anyhow::Result<()> {
    let service = hierarchy(conn)?;
    match command {
        ProjectCommand::Create {
            area,
            name,
            description,
            icon,
            status,
            priority,
            importance,
            deadline,
        } => {
            let project = service.create_project(
                &ProjectDraft {
                    area_id: area,
                    name,
                    description,
                    icon,
                    status,
                    priority,
                    importance,
                    deadline: day_start(deadline),
                },
                now,
            )?;
            printer.emit(&project, render::project_line)
        }
        ProjectCommand::List { area, flags } => {
            let projects = service.list_projects(
                area,
                ListOptions {
                    include_archived: flags.archived,
                },
            )?;
            printer.emit(&projects, |projects| {
                render::lines(projects, render::project_line, "no projects")
            })
        }
        ProjectCommand::Update {
            id,
            name,
            description,
            icon,
            status,
            priority,
            importance,
            deadline,
            clear_deadline,
        } => {
            let deadline = if clear_deadline {
                Some(None)
            } else {
                deadline.map(|date| Some(start_of_day(date)))
            };
            let project = service.update_project(
                id,
                &ProjectPatch {
                    name,
                    description,
                    icon,
                    status,
                    priority,
                    importance,
                    deadline,
                },
                now,
            )?;
            printer.emit(&project, render::project_line)
        }
        ProjectCommand::Move { id, area } => {
            printer.emit(&service.move_project(id, area, now)?, render::project_line)
        }
        ProjectCommand::Archive { id } => {
            printer.emit(&service.set_project_archived(id, true, now)?, render::project_line)
        }
        ProjectCommand::Unarchive { id } => {
            printer.emit(&service.set_project_archived(id, false, now)?, render::project_line)
        }
        ProjectCommand::Delete { id } => {
            printer.emit(&service.delete_project(id, now)?, render::fields)
        }
    }
}

fn task(
    conn: &Connection,
    config: &AppConfig,
    printer: &Printer,
    command: TaskCommand,
    now: i64,
) -> anyhow::Result<()> {
    let service = tasks(conn)?;
    match command {
        TaskCommand::Create {
            project,
            name,
            description,
            priority,
            due,
            at,
            estimate,
            depends_on,
        } => {
            let task = service.create_task(
                &TaskDraft {
                    project_id: project,
                    name,
                    description,
                    priority,
                    due_date: day_start(due),
                    due_time: at,
                    estimated_duration: estimate,
                    dependency_ids: depends_on,
                },
                now,
            )?;
            refresh_reminders(conn, config, &task, now)?;
            printer.emit(&task, render::task_line)
        }
        TaskCommand::List { project } => {
            let tasks = service.list_tasks(project)?;
            printer.emit(&tasks, |tasks| render::lines(tasks, render::task_line, "no tasks"))
        }
        TaskCommand::Show { id } => printer.emit(&service.get_task(id)?, render::fields),
        TaskCommand::Update {
            id,
            name,
            description,
            priority,
            status,
            due,
            clear_due,
            at,
            estimate,
        } => {
            let (due_date, due_time) = if clear_due {
                (Some(None), Some(None))
            } else {
                (due.map(|date| Some(start_of_day(date))), at.map(Some))
            };
            let reschedule = due_date.is_some() || due_time.is_some() || status.is_some();
            let task = service.update_task(
                id,
                &TaskPatch {
                    name,
                    description,
                    priority,
                    status,
                    due_date,
                    due_time,
                    estimated_duration: estimate.map(Some),
                },
                now,
            )?;
            if reschedule {
                refresh_reminders(conn, config, &task, now)?;
            }
            printer.emit(&task, render::task_line)
        }
        TaskCommand::Deps { id, ids } => {
            printer.emit(&service.set_dependencies(id, &ids, now)?, render::fields)
        }
        TaskCommand::Complete { id } => {
            let outcome = service.complete_task(id, now)?;
            refresh_reminders(conn, config, &outcome.task, now)?;
            printer.emit(&outcome, |outcome| match outcome.points {
                Some(points) => format!(
                    "{}\n+{} alignment points",
                    render::task_line(&outcome.task),
                    points.total()
                ),
                None => render::task_line(&outcome.task),
            })
        }
        TaskCommand::Reopen { id } => {
            let task = service.reopen_task(id, now)?;
            refresh_reminders(conn, config, &task, now)?;
            printer.emit(&task, render::task_line)
        }
        TaskCommand::Delete { id } => {
            service.delete_task(id, now)?;
            printer.done(&format!("deleted task {id}"))
        }
        TaskCommand::Locate { id } => {
            let crumb = hierarchy(conn)?.locate_task(id)?;
            printer.emit(&crumb, |crumb| {
                format!(
                    "{} > {} > {}",
                    crumb.pillar.name, crumb.area.name, crumb.project.name
                )
            })
        }
    }
}

/// Rebuilds the task's pending reminders after its due date or status moved.
fn refresh_reminders(conn: &Connection, config: &AppConfig, task: &Task, now: i64) -> anyhow::Result<()> {
    notifications(conn, config)?.schedule_task_reminders(task, now)?;
    Ok(())
}

fn journal(conn: &Connection, printer: &Printer, command: JournalCommand, now: i64) -> anyhow::Result<()> {
    let service = journal_service(conn)?;
    match command {
        JournalCommand::Create {
            title,
            content,
            mood,
            tags,
            template,
        } => {
            let entry = service.create_entry(
                &JournalDraft {
                    title,
                    content,
                    mood,
                    tags,
                    template_id: template,
                },
                now,
            )?;
            printer.emit(&entry, render::entry_line)
        }
        JournalCommand::List { skip, limit } => {
            let page = service.list(skip, limit)?;
            printer.emit(&page, |page| {
                format!(
                    "{}\n({} of {})",
                    render::lines(&page.entries, render::entry_line, "no entries"),
                    page.entries.len(),
                    page.total
                )
            })
        }
        JournalCommand::Show { id } => printer.emit(&service.get_entry(id)?, render::entry),
        JournalCommand::Update {
            id,
            title,
            content,
            mood,
            tags,
        } => {
            let entry = service.update_entry(
                id,
                &JournalPatch {
                    title,
                    content,
                    mood,
                    tags,
                },
                now,
            )?;
            printer.emit(&entry, render::entry_line)
        }
        JournalCommand::Delete { id } => {
            service.delete_entry(id, now)?;
            printer.done(&format!("moved entry {id} to trash"))
        }
        JournalCommand::Restore { id } => {
            printer.emit(&service.restore_entry(id, now)?, render::entry_line)
        }
        JournalCommand::Purge { id } => {
            service.purge_entry(id)?;
            printer.done(&format!("purged entry {id}"))
        }
        JournalCommand::Trash { skip, limit } => {
            let page = service.list_trash(skip, limit)?;
            printer.emit(&page, |page| {
                render::lines(&page.entries, render::entry_line, "trash is empty")
            })
        }
        JournalCommand::EmptyTrash => {
            let purged = service.empty_trash()?;
            printer.done(&format!("purged {purged} entries"))
        }
        JournalCommand::Search { query, limit } => {
            let results = service.search(&query, limit)?;
            printer.emit(&results, |results| {
                if results.results.is_empty() {
                    return "no matches".to_string();
                }
                results
                    .results
                    .iter()
                    .map(|hit| format!("{}\n    {}", render::entry_line(&hit.entry), hit.snippet))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        JournalCommand::OnThisDay { date } => {
            let date = date.unwrap_or_else(|| date_of(now));
            let found = service.on_this_day(date)?;
            printer.emit(&found, |found| {
                render::lines(&found.entries, render::entry_line, "no entries on this day")
            })
        }
        JournalCommand::Insights => printer.emit(&service.insights(now)?, render::fields),
    }
}

fn template(conn: &Connection, printer: &Printer, command: TemplateCommand, now: i64) -> anyhow::Result<()> {
    let service = journal_service(conn)?;
    match command {
        TemplateCommand::List => {
            let templates = service.list_templates()?;
            printer.emit(&templates, |templates| {
                render::lines(templates, render::template_line, "no templates")
            })
        }
        TemplateCommand::Create {
            name,
            description,
            prompts,
        } => {
            let template = service.create_template(
                &TemplateDraft {
                    name,
                    description,
                    prompts,
                },
                now,
            )?;
            printer.emit(&template, render::template_line)
        }
        TemplateCommand::Delete { id } => {
            service.delete_template(id)?;
            printer.done(&format!("deleted template {id}"))
        }
        TemplateCommand::Seed => {
            let added = service.seed_builtin_templates(now)?;
            printer.done(&format!("added {added} built-in templates"))
        }
    }
}

fn notify(
    conn: &Connection,
    config: &AppConfig,
    printer: &Printer,
    command: NotifyCommand,
    now: i64,
) -> anyhow::Result<()> {
    let service = notifications(conn, config)?;
    match command {
        NotifyCommand::List { unread, limit } => {
            let items = service.list_notifications(unread, limit)?;
            printer.emit(&items, |items| {
                render::lines(items, render::notification_line, "no notifications")
            })
        }
        NotifyCommand::Unread => {
            let count = service.unread_count()?;
            printer.emit(&serde_json::json!({ "unread": count }), |_| count.to_string())
        }
        NotifyCommand::Read { id } => {
            service.mark_read(id)?;
            printer.done(&format!("marked {id} read"))
        }
        NotifyCommand::ReadAll => {
            let marked = service.mark_all_read()?;
            printer.done(&format!("marked {marked} read"))
        }
        NotifyCommand::Delete { id } => {
            service.delete_notification(id)?;
            printer.done(&format!("deleted notification {id}"))
        }
        NotifyCommand::Clear => {
            let cleared = service.clear_notifications()?;
            printer.done(&format!("cleared {cleared} notifications"))
        }
        NotifyCommand::Schedule { task } => {
            let task = SqliteTaskRepository::try_new(conn)?
                .get_task(task)?
                .with_context(|| format!("task {task} not found"))?;
            let reminders = service.schedule_task_reminders(&task, now)?;
            printer.emit(&reminders, |reminders| {
                render::lines(reminders, render::reminder_line, "no reminders scheduled")
            })
        }
        NotifyCommand::Process => printer.emit(&service.process_due_reminders(now)?, render::fields),
        NotifyCommand::CheckOverdue => {
            let queued = service.check_overdue_tasks(now)?;
            printer.done(&format!("queued {queued} overdue reminders"))
        }
        NotifyCommand::Prefs(args) => {
            let current = service.preferences()?;
            let updated = if args.is_empty() {
                current
            } else {
                service.update_preferences(&apply_prefs(current, args)?)?
            };
            printer.emit(&updated, render::preferences)
        }
    }
}

impl PrefsArgs {
    fn is_empty(&self) -> bool {
        self.in_app.is_none()
            && self.email.is_none()
            && self.task_due.is_none()
            && self.task_overdue.is_none()
            && self.task_reminder.is_none()
            && self.advance.is_none()
            && self.quiet_hours.is_none()
            && !self.clear_quiet_hours
    }
}

fn apply_prefs(
    mut prefs: aurum_core::model::notification::NotificationPreferences,
    args: PrefsArgs,
) -> anyhow::Result<aurum_core::model::notification::NotificationPreferences> {
    if let Some(value) = args.in_app {
        prefs.in_app_enabled = value;
    }
    if let Some(value) = args.email {
        prefs.email_enabled = value;
    }
    if let Some(value) = args.task_due {
        prefs.task_due = value;
    }
    if let Some(value) = args.task_overdue {
        prefs.task_overdue = value;
    }
    if let Some(value) = args.task_reminder {
        prefs.task_reminder = value;
    }
    if let Some(value) = args.advance {
        prefs.reminder_advance_minutes = value;
    }
    if args.clear_quiet_hours {
        prefs.quiet_hours = None;
    } else if let Some(window) = args.quiet_hours {
        let Some((start, end)) = window.split_once('-') else {
            bail!("quiet hours must look like HH:MM-HH:MM, got `{window}`");
        };
        prefs.quiet_hours = Some(QuietHours::new(start.trim(), end.trim())?);
    }
    Ok(prefs)
}

fn insights(conn: &Connection, printer: &Printer, command: InsightsCommand) -> anyhow::Result<()> {
    let service = InsightsService::new(
        SqliteHierarchyRepository::try_new(conn)?,
        SqliteTaskRepository::try_new(conn)?,
    );
    match command {
        InsightsCommand::Snapshot => {
            let snapshot = service.alignment_snapshot()?;
            printer.emit(&snapshot, |snapshot| {
                let mut lines = vec![format!(
                    "{} tasks and {} projects completed",
                    snapshot.total_tasks_completed, snapshot.total_projects_completed
                )];
                lines.extend(snapshot.pillar_alignment.iter().map(|row| {
                    format!("{:>5.1}% {} ({})", row.percentage, row.pillar_name, row.task_count)
                }));
                lines.join("\n")
            })
        }
        InsightsCommand::Area { id } => printer.emit(&service.area_insight(id)?, render::fields),
        InsightsCommand::Project { id } => {
            printer.emit(&service.project_insight(id)?, render::fields)
        }
    }
}

fn settings(conn: &Connection, printer: &Printer, command: SettingsCommand, now: i64) -> anyhow::Result<()> {
    let service = SettingsService::new(SqliteSettingsRepository::try_new(conn)?);
    let settings = match command {
        SettingsCommand::Show => service.get()?,
        SettingsCommand::Name { name } => service.set_display_name(&name, now)?,
        SettingsCommand::Goal { points, clear } => {
            if !clear && points.is_none() {
                bail!("pass a goal or --clear");
            }
            service.set_monthly_goal(if clear { None } else { points }, now)?
        }
        SettingsCommand::Onboarding { completed } => {
            service.set_onboarding_completed(completed, now)?
        }
    };
    printer.emit(&settings, render::fields)
}

#[cfg(debug_assertions)]
fn debug_dump(conn: &Connection, config: &AppConfig, printer: &Printer) -> anyhow::Result<()> {
    const TABLES: [&str; 9] = [
        "pillars",
        "areas",
        "projects",
        "tasks",
        "journal_entries",
        "journal_templates",
        "alignment_scores",
        "notifications",
        "task_reminders",
    ];

    let user_version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let mut counts = serde_json::Map::new();
    for table in TABLES {
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })?;
        counts.insert(table.to_string(), count.into());
    }
    let logging = aurum_core::logging_status().map(|status| {
        serde_json::json!({
            "level": status.level,
            "log_dir": status.log_dir.display().to_string(),
        })
    });
    let dump = serde_json::json!({
        "core_version": aurum_core::core_version(),
        "db_path": config.db_path.display().to_string(),
        "user_version": user_version,
        "rows": counts,
        "logging": logging,
    });
    printer.emit(&dump, |dump| {
        serde_json::to_string_pretty(dump).unwrap_or_else(|err| err.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurum_core::model::notification::NotificationPreferences;

    fn empty_prefs() -> PrefsArgs {
        PrefsArgs {
            in_app: None,
            email: None,
            task_due: None,
            task_overdue: None,
            task_reminder: None,
            advance: None,
            quiet_hours: None,
            clear_quiet_hours: false,
        }
    }

    #[test]
    fn apply_prefs_parses_quiet_hours_window() {
        let mut args = empty_prefs();
        args.quiet_hours = Some("22:00-07:00".to_string());
        args.email = Some(false);
        let prefs = apply_prefs(NotificationPreferences::default(), args).unwrap();
        let window = prefs.quiet_hours.unwrap();
        assert_eq!((window.start.as_str(), window.end.as_str()), ("22:00", "07:00"));
        assert!(!prefs.email_enabled);
    }

    #[test]
    fn apply_prefs_rejects_window_without_separator() {
        let mut args = empty_prefs();
        args.quiet_hours = Some("22:00".to_string());
        assert!(apply_prefs(NotificationPreferences::default(), args).is_err());
    }

    #[test]
    fn empty_prefs_args_leave_preferences_untouched() {
        assert!(empty_prefs().is_empty());
    }

    #[test]
    fn today_renders_into_in_memory_store() {
        let conn = aurum_core::open_db_in_memory().unwrap();
        let config = AppConfig::default();
        let printer = Printer::new(true);
        dispatch(&conn, &config, &printer, Command::Today { limit: Some(3) }).unwrap();
        dispatch(&conn, &config, &printer, Command::Summary).unwrap();
    }
}
