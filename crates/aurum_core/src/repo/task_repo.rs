//! Task repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist tasks and their dependency edges.
//! - Provide the time-window queries used by Today, alignment and reminders.
//!
//! # Invariants
//! - Only active (`is_deleted=0`) tasks are returned.
//! - Project listing is deterministic: `sort_order ASC, id ASC`.
//! - Dependency edges are replaced as a whole inside one transaction.

use crate::model::hierarchy::{
    AreaId, PillarId, Priority, ProjectId, Task, TaskId, TaskStatus,
};
use crate::repo::hierarchy_repo::Scope;
use crate::repo::{
    bool_to_int, ensure_connection_ready, invalid_enum, parse_bool, parse_u32, parse_u8,
    parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde::Serialize;

const TASK_SELECT_SQL: &str = "SELECT
    t.id,
    t.project_id,
    t.name,
    t.description,
    t.priority,
    t.status,
    t.due_date,
    t.due_time,
    t.estimated_duration,
    t.completed_at,
    t.sort_order,
    t.is_deleted,
    t.created_at,
    t.updated_at
FROM tasks t";

/// Task counts for a scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub total: u64,
    pub completed: u64,
}

/// Ancestry of a project, flattened for scoring and display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyContext {
    pub pillar_id: PillarId,
    pub pillar_name: String,
    pub pillar_weight: f64,
    pub area_id: AreaId,
    pub area_name: String,
    pub area_importance: u8,
    pub project_id: ProjectId,
    pub project_name: String,
    pub project_priority: Priority,
    pub project_importance: u8,
}

/// Repository interface for task operations.
pub trait TaskRepository {
    /// Inserts a task together with its dependency edges.
    fn insert_task(&self, task: &Task) -> RepoResult<()>;
    /// Updates scalar task fields. Dependencies are left untouched.
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    fn list_tasks(&self, project_id: ProjectId) -> RepoResult<Vec<Task>>;
    fn next_task_sort_order(&self, project_id: ProjectId) -> RepoResult<i64>;
    fn set_dependencies(&self, task_id: TaskId, dependency_ids: &[TaskId], now: i64) -> RepoResult<()>;
    fn list_dependency_ids(&self, task_id: TaskId) -> RepoResult<Vec<TaskId>>;
    /// Whether every active dependency of the task is done.
    fn dependencies_met(&self, task_id: TaskId) -> RepoResult<bool>;
    /// Open tasks in unarchived projects that are undated or due at or before `cutoff`.
    fn list_open_due_by(&self, cutoff: i64) -> RepoResult<Vec<Task>>;
    /// Open tasks with a due date strictly before `before`.
    fn list_open_overdue(&self, before: i64) -> RepoResult<Vec<Task>>;
    /// Tasks completed within `[from, to]`.
    fn list_completed_between(&self, from: i64, to: i64) -> RepoResult<Vec<Task>>;
    fn soft_delete_task(&self, id: TaskId, now: i64) -> RepoResult<()>;
    fn count_tasks(&self, scope: Scope) -> RepoResult<TaskCounts>;
    fn hierarchy_context(&self, project_id: ProjectId) -> RepoResult<Option<HierarchyContext>>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_tasks(&self, sql: &str, bind: impl rusqlite::Params) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(bind)?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            let mut task = parse_task_row(row)?;
            task.dependency_ids = load_dependency_ids(self.conn, task.id)?;
            tasks.push(task);
        }
        Ok(tasks)
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn insert_task(&self, task: &Task) -> RepoResult<()> {
        task.validate(task.created_at)?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO tasks (
                id,
                project_id,
                name,
                description,
                priority,
                status,
                due_date,
                due_time,
                estimated_duration,
                completed_at,
                sort_order,
                is_deleted,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
            params![
                task.id.to_string(),
                task.project_id.to_string(),
                task.name.as_str(),
                task.description.as_str(),
                task.priority.as_str(),
                task.status.as_str(),
                task.due_date,
                task.due_time.as_deref(),
                task.estimated_duration.map(i64::from),
                task.completed_at,
                task.sort_order,
                bool_to_int(task.is_deleted),
                task.created_at,
                task.updated_at,
            ],
        )?;
        write_dependencies(&tx, task.id, &task.dependency_ids)?;
        tx.commit()?;
        Ok(())
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        task.validate(task.updated_at)?;
        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                project_id = ?2,
                name = ?3,
                description = ?4,
                priority = ?5,
                status = ?6,
                due_date = ?7,
                due_time = ?8,
                estimated_duration = ?9,
                completed_at = ?10,
                sort_order = ?11,
                updated_at = ?12
             WHERE id = ?1
               AND is_deleted = 0;",
            params![
                task.id.to_string(),
                task.project_id.to_string(),
                task.name.as_str(),
                task.description.as_str(),
                task.priority.as_str(),
                task.status.as_str(),
                task.due_date,
                task.due_time.as_deref(),
                task.estimated_duration.map(i64::from),
                task.completed_at,
                task.sort_order,
                task.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "task",
                id: task.id,
            });
        }
        Ok(())
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let tasks = self.query_tasks(
            &format!(
                "{TASK_SELECT_SQL}
                 WHERE t.id = ?1
                   AND t.is_deleted = 0;"
            ),
            [id.to_string()],
        )?;
        Ok(tasks.into_iter().next())
    }

    fn list_tasks(&self, project_id: ProjectId) -> RepoResult<Vec<Task>> {
        self.query_tasks(
            &format!(
                "{TASK_SELECT_SQL}
                 WHERE t.project_id = ?1
                   AND t.is_deleted = 0
                 ORDER BY t.sort_order ASC, t.id ASC;"
            ),
            [project_id.to_string()],
        )
    }

    fn next_task_sort_order(&self, project_id: ProjectId) -> RepoResult<i64> {
        let next = self.conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1
             FROM tasks
             WHERE project_id = ?1
               AND is_deleted = 0;",
            [project_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(next)
    }

    fn set_dependencies(&self, task_id: TaskId, dependency_ids: &[TaskId], now: i64) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE tasks
             SET updated_at = ?2
             WHERE id = ?1
               AND is_deleted = 0;",
            params![task_id.to_string(), now],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "task",
                id: task_id,
            });
        }
        tx.execute(
            "DELETE FROM task_dependencies WHERE task_id = ?1;",
            [task_id.to_string()],
        )?;
        write_dependencies(&tx, task_id, dependency_ids)?;
        tx.commit()?;
        Ok(())
    }

    fn list_dependency_ids(&self, task_id: TaskId) -> RepoResult<Vec<TaskId>> {
        load_dependency_ids(self.conn, task_id)
    }

    fn dependencies_met(&self, task_id: TaskId) -> RepoResult<bool> {
        let blocking: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM task_dependencies d
             INNER JOIN tasks dep ON dep.id = d.depends_on_id
             WHERE d.task_id = ?1
               AND dep.is_deleted = 0
               AND dep.status <> 'done';",
            [task_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(blocking == 0)
    }

    fn list_open_due_by(&self, cutoff: i64) -> RepoResult<Vec<Task>> {
        self.query_tasks(
            &format!(
                "{TASK_SELECT_SQL}
                 INNER JOIN projects p ON p.id = t.project_id
                 INNER JOIN areas a ON a.id = p.area_id
                 INNER JOIN pillars pl ON pl.id = a.pillar_id
                 WHERE t.is_deleted = 0
                   AND t.status <> 'done'
                   AND (t.due_date IS NULL OR t.due_date <= ?1)
                   AND p.is_deleted = 0 AND p.archived = 0
                   AND a.is_deleted = 0 AND a.archived = 0
                   AND pl.is_deleted = 0 AND pl.archived = 0
                 ORDER BY t.id ASC;"
            ),
            [cutoff],
        )
    }

    fn list_open_overdue(&self, before: i64) -> RepoResult<Vec<Task>> {
        self.query_tasks(
            &format!(
                "{TASK_SELECT_SQL}
                 WHERE t.is_deleted = 0
                   AND t.status <> 'done'
                   AND t.due_date IS NOT NULL
                   AND t.due_date < ?1
                 ORDER BY t.due_date ASC, t.id ASC;"
            ),
            [before],
        )
    }

    fn list_completed_between(&self, from: i64, to: i64) -> RepoResult<Vec<Task>> {
        self.query_tasks(
            &format!(
                "{TASK_SELECT_SQL}
                 WHERE t.is_deleted = 0
                   AND t.status = 'done'
                   AND t.completed_at BETWEEN ?1 AND ?2
                 ORDER BY t.completed_at ASC, t.id ASC;"
            ),
            params![from, to],
        )
    }

    fn soft_delete_task(&self, id: TaskId, now: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET is_deleted = 1,
                 updated_at = ?2
             WHERE id = ?1
               AND is_deleted = 0;",
            params![id.to_string(), now],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "task", id });
        }
        Ok(())
    }

    fn count_tasks(&self, scope: Scope) -> RepoResult<TaskCounts> {
        let (filter, bind_values) = scope.project_filter("project_id");
        let sql = format!(
            "SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'done' THEN 1 ELSE 0 END), 0)
             FROM tasks
             WHERE is_deleted = 0
               AND {filter};"
        );
        let (total, completed): (i64, i64) = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
        Ok(TaskCounts {
            total: total.max(0) as u64,
            completed: completed.max(0) as u64,
        })
    }

    fn hierarchy_context(&self, project_id: ProjectId) -> RepoResult<Option<HierarchyContext>> {
        let row = self
            .conn
            .query_row(
                "SELECT
                    pl.id,
                    pl.name,
                    pl.weight,
                    a.id,
                    a.name,
                    a.importance,
                    p.id,
                    p.name,
                    p.priority,
                    p.importance
                 FROM projects p
                 INNER JOIN areas a ON a.id = p.area_id
                 INNER JOIN pillars pl ON pl.id = a.pillar_id
                 WHERE p.id = ?1
                   AND p.is_deleted = 0
                   AND a.is_deleted = 0
                   AND pl.is_deleted = 0;",
                [project_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, String>(8)?,
                        row.get::<_, i64>(9)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            pillar_id,
            pillar_name,
            pillar_weight,
            area_id,
            area_name,
            area_importance,
            project_id,
            project_name,
            project_priority,
            project_importance,
        )) = row
        else {
            return Ok(None);
        };

        Ok(Some(HierarchyContext {
            pillar_id: parse_uuid(&pillar_id, "pillars.id")?,
            pillar_name,
            pillar_weight,
            area_id: parse_uuid(&area_id, "areas.id")?,
            area_name,
            area_importance: parse_u8(area_importance, "areas.importance")?,
            project_id: parse_uuid(&project_id, "projects.id")?,
            project_name,
            project_priority: Priority::parse(&project_priority)
                .ok_or_else(|| invalid_enum(&project_priority, "projects.priority"))?,
            project_importance: parse_u8(project_importance, "projects.importance")?,
        }))
    }
}

fn write_dependencies(tx: &Transaction<'_>, task_id: TaskId, dependency_ids: &[TaskId]) -> RepoResult<()> {
    for dependency_id in dependency_ids {
        tx.execute(
            "INSERT OR IGNORE INTO task_dependencies (task_id, depends_on_id)
             VALUES (?1, ?2);",
            params![task_id.to_string(), dependency_id.to_string()],
        )?;
    }
    Ok(())
}

fn load_dependency_ids(conn: &Connection, task_id: TaskId) -> RepoResult<Vec<TaskId>> {
    let mut stmt = conn.prepare(
        "SELECT d.depends_on_id
         FROM task_dependencies d
         INNER JOIN tasks dep ON dep.id = d.depends_on_id
         WHERE d.task_id = ?1
           AND dep.is_deleted = 0
         ORDER BY d.depends_on_id ASC;",
    )?;
    let mut rows = stmt.query([task_id.to_string()])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "task_dependencies.depends_on_id")?);
    }
    Ok(ids)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let project_text: String = row.get("project_id")?;
    let priority_text: String = row.get("priority")?;
    let status_text: String = row.get("status")?;
    let estimate = row
        .get::<_, Option<i64>>("estimated_duration")?
        .map(|value| parse_u32(value, "tasks.estimated_duration"))
        .transpose()?;
    Ok(Task {
        id: parse_uuid(&id_text, "tasks.id")?,
        project_id: parse_uuid(&project_text, "tasks.project_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        priority: Priority::parse(&priority_text)
            .ok_or_else(|| invalid_enum(&priority_text, "tasks.priority"))?,
        status: TaskStatus::parse(&status_text)
            .ok_or_else(|| invalid_enum(&status_text, "tasks.status"))?,
        due_date: row.get("due_date")?,
        due_time: row.get("due_time")?,
        estimated_duration: estimate,
        dependency_ids: Vec::new(),
        completed_at: row.get("completed_at")?,
        sort_order: row.get("sort_order")?,
        is_deleted: parse_bool(row.get("is_deleted")?, "tasks.is_deleted")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
