//! Pillar/area/project repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the upper three hierarchy levels.
//! - Own cascading soft deletes so a subtree disappears in one transaction.
//!
//! # Invariants
//! - Soft-deleted rows are never returned by list APIs.
//! - Archived rows are hidden unless `include_archived` is requested.
//! - Listing is deterministic: `sort_order ASC, id ASC`.

use crate::model::hierarchy::{
    Area, AreaId, Pillar, PillarId, Priority, Project, ProjectId, ProjectStatus,
};
use crate::repo::{
    bool_to_int, ensure_connection_ready, invalid_enum, parse_bool, parse_u8, parse_uuid,
    RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use serde::Serialize;

const PILLAR_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    icon,
    color,
    time_allocation_percentage,
    weight,
    sort_order,
    archived,
    is_deleted,
    created_at,
    updated_at
FROM pillars";

const AREA_SELECT_SQL: &str = "SELECT
    id,
    pillar_id,
    name,
    description,
    icon,
    color,
    importance,
    sort_order,
    archived,
    is_deleted,
    created_at,
    updated_at
FROM areas";

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    area_id,
    name,
    description,
    icon,
    status,
    priority,
    importance,
    deadline,
    sort_order,
    archived,
    is_deleted,
    created_at,
    updated_at
FROM projects";

/// Subset of the hierarchy that aggregate queries are restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Pillar(PillarId),
    Area(AreaId),
    Project(ProjectId),
}

impl Scope {
    /// SQL predicate restricting a `project_id` column, plus its bind values.
    pub(crate) fn project_filter(&self, column: &str) -> (String, Vec<Value>) {
        match self {
            Self::All => (
                format!(
                    "{column} IN (
                        SELECT p.id
                        FROM projects p
                        INNER JOIN areas a ON a.id = p.area_id
                        INNER JOIN pillars pl ON pl.id = a.pillar_id
                        WHERE p.is_deleted = 0 AND a.is_deleted = 0 AND pl.is_deleted = 0
                    )"
                ),
                Vec::new(),
            ),
            Self::Pillar(id) => (
                format!(
                    "{column} IN (
                        SELECT p.id
                        FROM projects p
                        INNER JOIN areas a ON a.id = p.area_id
                        WHERE a.pillar_id = ? AND p.is_deleted = 0 AND a.is_deleted = 0
                    )"
                ),
                vec![Value::Text(id.to_string())],
            ),
            Self::Area(id) => (
                format!(
                    "{column} IN (
                        SELECT id FROM projects WHERE area_id = ? AND is_deleted = 0
                    )"
                ),
                vec![Value::Text(id.to_string())],
            ),
            Self::Project(id) => (format!("{column} = ?"), vec![Value::Text(id.to_string())]),
        }
    }
}

/// List visibility options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub include_archived: bool,
}

/// Rows tombstoned by one cascading delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub pillars: usize,
    pub areas: usize,
    pub projects: usize,
    pub tasks: usize,
}

/// Project counts for a scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProjectCounts {
    pub total: u64,
    pub completed: u64,
}

/// Repository interface for the upper hierarchy levels.
pub trait HierarchyRepository {
    fn insert_pillar(&self, pillar: &Pillar) -> RepoResult<()>;
    fn update_pillar(&self, pillar: &Pillar) -> RepoResult<()>;
    fn get_pillar(&self, id: PillarId) -> RepoResult<Option<Pillar>>;
    fn list_pillars(&self, options: ListOptions) -> RepoResult<Vec<Pillar>>;
    fn next_pillar_sort_order(&self) -> RepoResult<i64>;
    /// Rewrites pillar `sort_order` to match `ordered_ids` in one transaction.
    fn reorder_pillars(&self, ordered_ids: &[PillarId], now: i64) -> RepoResult<()>;
    fn delete_pillar_cascade(&self, id: PillarId, now: i64) -> RepoResult<CascadeReport>;

    fn insert_area(&self, area: &Area) -> RepoResult<()>;
    fn update_area(&self, area: &Area) -> RepoResult<()>;
    fn get_area(&self, id: AreaId) -> RepoResult<Option<Area>>;
    fn list_areas(&self, pillar_id: Option<PillarId>, options: ListOptions) -> RepoResult<Vec<Area>>;
    fn next_area_sort_order(&self, pillar_id: PillarId) -> RepoResult<i64>;
    fn delete_area_cascade(&self, id: AreaId, now: i64) -> RepoResult<CascadeReport>;

    fn insert_project(&self, project: &Project) -> RepoResult<()>;
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    fn list_projects(
        &self,
        area_id: Option<AreaId>,
        options: ListOptions,
    ) -> RepoResult<Vec<Project>>;
    fn next_project_sort_order(&self, area_id: AreaId) -> RepoResult<i64>;
    fn delete_project_cascade(&self, id: ProjectId, now: i64) -> RepoResult<CascadeReport>;

    fn count_areas(&self, pillar_id: PillarId) -> RepoResult<u64>;
    fn count_projects(&self, scope: Scope) -> RepoResult<ProjectCounts>;
}

/// SQLite-backed hierarchy repository.
pub struct SqliteHierarchyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHierarchyRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl HierarchyRepository for SqliteHierarchyRepository<'_> {
    fn insert_pillar(&self, pillar: &Pillar) -> RepoResult<()> {
        pillar.validate()?;
        self.conn.execute(
            "INSERT INTO pillars (
                id,
                name,
                description,
                icon,
                color,
                time_allocation_percentage,
                weight,
                sort_order,
                archived,
                is_deleted,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                pillar.id.to_string(),
                pillar.name.as_str(),
                pillar.description.as_str(),
                pillar.icon.as_str(),
                pillar.color.as_str(),
                pillar.time_allocation_percentage.map(i64::from),
                pillar.weight,
                pillar.sort_order,
                bool_to_int(pillar.archived),
                bool_to_int(pillar.is_deleted),
                pillar.created_at,
                pillar.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_pillar(&self, pillar: &Pillar) -> RepoResult<()> {
        pillar.validate()?;
        let changed = self.conn.execute(
            "UPDATE pillars
             SET
                name = ?2,
                description = ?3,
                icon = ?4,
                color = ?5,
                time_allocation_percentage = ?6,
                weight = ?7,
                sort_order = ?8,
                archived = ?9,
                updated_at = ?10
             WHERE id = ?1
               AND is_deleted = 0;",
            params![
                pillar.id.to_string(),
                pillar.name.as_str(),
                pillar.description.as_str(),
                pillar.icon.as_str(),
                pillar.color.as_str(),
                pillar.time_allocation_percentage.map(i64::from),
                pillar.weight,
                pillar.sort_order,
                bool_to_int(pillar.archived),
                pillar.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "pillar",
                id: pillar.id,
            });
        }
        Ok(())
    }

    fn get_pillar(&self, id: PillarId) -> RepoResult<Option<Pillar>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PILLAR_SELECT_SQL}
             WHERE id = ?1
               AND is_deleted = 0;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_pillar_row(row)?));
        }
        Ok(None)
    }

    fn list_pillars(&self, options: ListOptions) -> RepoResult<Vec<Pillar>> {
        let mut sql = format!("{PILLAR_SELECT_SQL} WHERE is_deleted = 0");
        if !options.include_archived {
            sql.push_str(" AND archived = 0");
        }
        sql.push_str(" ORDER BY sort_order ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut pillars = Vec::new();
        while let Some(row) = rows.next()? {
            pillars.push(parse_pillar_row(row)?);
        }
        Ok(pillars)
    }

    fn next_pillar_sort_order(&self) -> RepoResult<i64> {
        let next = self.conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1
             FROM pillars
             WHERE is_deleted = 0;",
            [],
            |row| row.get(0),
        )?;
        Ok(next)
    }

    fn reorder_pillars(&self, ordered_ids: &[PillarId], now: i64) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for (index, id) in ordered_ids.iter().enumerate() {
            let changed = tx.execute(
                "UPDATE pillars
                 SET sort_order = ?2,
                     updated_at = ?3
                 WHERE id = ?1
                   AND is_deleted = 0;",
                params![id.to_string(), index as i64, now],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound {
                    entity: "pillar",
                    id: *id,
                });
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_pillar_cascade(&self, id: PillarId, now: i64) -> RepoResult<CascadeReport> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let tasks = tx.execute(
            "UPDATE tasks
             SET is_deleted = 1,
                 updated_at = ?2
             WHERE is_deleted = 0
               AND project_id IN (
                   SELECT p.id
                   FROM projects p
                   INNER JOIN areas a ON a.id = p.area_id
                   WHERE a.pillar_id = ?1
               );",
            params![id.to_string(), now],
        )?;
        let projects = tx.execute(
            "UPDATE projects
             SET is_deleted = 1,
                 updated_at = ?2
             WHERE is_deleted = 0
               AND area_id IN (SELECT id FROM areas WHERE pillar_id = ?1);",
            params![id.to_string(), now],
        )?;
        let areas = tx.execute(
            "UPDATE areas
             SET is_deleted = 1,
                 updated_at = ?2
             WHERE is_deleted = 0
               AND pillar_id = ?1;",
            params![id.to_string(), now],
        )?;
        let pillars = tx.execute(
            "UPDATE pillars
             SET is_deleted = 1,
                 updated_at = ?2
             WHERE id = ?1
               AND is_deleted = 0;",
            params![id.to_string(), now],
        )?;
        if pillars == 0 {
            return Err(RepoError::NotFound {
                entity: "pillar",
                id,
            });
        }
        tx.commit()?;
        Ok(CascadeReport {
            pillars,
            areas,
            projects,
            tasks,
        })
    }

    fn insert_area(&self, area: &Area) -> RepoResult<()> {
        area.validate()?;
        self.conn.execute(
            "INSERT INTO areas (
                id,
                pillar_id,
                name,
                description,
                icon,
                color,
                importance,
                sort_order,
                archived,
                is_deleted,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                area.id.to_string(),
                area.pillar_id.to_string(),
                area.name.as_str(),
                area.description.as_str(),
                area.icon.as_str(),
                area.color.as_str(),
                i64::from(area.importance),
                area.sort_order,
                bool_to_int(area.archived),
                bool_to_int(area.is_deleted),
                area.created_at,
                area.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_area(&self, area: &Area) -> RepoResult<()> {
        area.validate()?;
        let changed = self.conn.execute(
            "UPDATE areas
             SET
                pillar_id = ?2,
                name = ?3,
                description = ?4,
                icon = ?5,
                color = ?6,
                importance = ?7,
                sort_order = ?8,
                archived = ?9,
                updated_at = ?10
             WHERE id = ?1
               AND is_deleted = 0;",
            params![
                area.id.to_string(),
                area.pillar_id.to_string(),
                area.name.as_str(),
                area.description.as_str(),
                area.icon.as_str(),
                area.color.as_str(),
                i64::from(area.importance),
                area.sort_order,
                bool_to_int(area.archived),
                area.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "area",
                id: area.id,
            });
        }
        Ok(())
    }

    fn get_area(&self, id: AreaId) -> RepoResult<Option<Area>> {
        let mut stmt = self.conn.prepare(&format!(
            "{AREA_SELECT_SQL}
             WHERE id = ?1
               AND is_deleted = 0;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_area_row(row)?));
        }
        Ok(None)
    }

    fn list_areas(&self, pillar_id: Option<PillarId>, options: ListOptions) -> RepoResult<Vec<Area>> {
        let mut sql = format!("{AREA_SELECT_SQL} WHERE is_deleted = 0");
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(pillar_id) = pillar_id {
            sql.push_str(" AND pillar_id = ?");
            bind_values.push(Value::Text(pillar_id.to_string()));
        }
        if !options.include_archived {
            sql.push_str(" AND archived = 0");
        }
        sql.push_str(" ORDER BY sort_order ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut areas = Vec::new();
        while let Some(row) = rows.next()? {
            areas.push(parse_area_row(row)?);
        }
        Ok(areas)
    }

    fn next_area_sort_order(&self, pillar_id: PillarId) -> RepoResult<i64> {
        let next = self.conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1
             FROM areas
             WHERE pillar_id = ?1
               AND is_deleted = 0;",
            [pillar_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(next)
    }

    fn delete_area_cascade(&self, id: AreaId, now: i64) -> RepoResult<CascadeReport> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let tasks = tx.execute(
            "UPDATE tasks
             SET is_deleted = 1,
                 updated_at = ?2
             WHERE is_deleted = 0
               AND project_id IN (SELECT id FROM projects WHERE area_id = ?1);",
            params![id.to_string(), now],
        )?;
        let projects = tx.execute(
            "UPDATE projects
             SET is_deleted = 1,
                 updated_at = ?2
             WHERE is_deleted = 0
               AND area_id = ?1;",
            params![id.to_string(), now],
        )?;
        let areas = tx.execute(
            "UPDATE areas
             SET is_deleted = 1,
                 updated_at = ?2
             WHERE id = ?1
               AND is_deleted = 0;",
            params![id.to_string(), now],
        )?;
        if areas == 0 {
            return Err(RepoError::NotFound { entity: "area", id });
        }
        tx.commit()?;
        Ok(CascadeReport {
            pillars: 0,
            areas,
            projects,
            tasks,
        })
    }

    fn insert_project(&self, project: &Project) -> RepoResult<()> {
        project.validate()?;
        self.conn.execute(
            "INSERT INTO projects (
                id,
                area_id,
                name,
                description,
                icon,
                status,
                priority,
                importance,
                deadline,
                sort_order,
                archived,
                is_deleted,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
            params![
                project.id.to_string(),
                project.area_id.to_string(),
                project.name.as_str(),
                project.description.as_str(),
                project.icon.as_str(),
                project.status.as_str(),
                project.priority.as_str(),
                i64::from(project.importance),
                project.deadline,
                project.sort_order,
                bool_to_int(project.archived),
                bool_to_int(project.is_deleted),
                project.created_at,
                project.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        project.validate()?;
        let changed = self.conn.execute(
            "UPDATE projects
             SET
                area_id = ?2,
                name = ?3,
                description = ?4,
                icon = ?5,
                status = ?6,
                priority = ?7,
                importance = ?8,
                deadline = ?9,
                sort_order = ?10,
                archived = ?11,
                updated_at = ?12
             WHERE id = ?1
               AND is_deleted = 0;",
            params![
                project.id.to_string(),
                project.area_id.to_string(),
                project.name.as_str(),
                project.description.as_str(),
                project.icon.as_str(),
                project.status.as_str(),
                project.priority.as_str(),
                i64::from(project.importance),
                project.deadline,
                project.sort_order,
                bool_to_int(project.archived),
                project.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "project",
                id: project.id,
            });
        }
        Ok(())
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE id = ?1
               AND is_deleted = 0;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn list_projects(
        &self,
        area_id: Option<AreaId>,
        options: ListOptions,
    ) -> RepoResult<Vec<Project>> {
        let mut sql = format!("{PROJECT_SELECT_SQL} WHERE is_deleted = 0");
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(area_id) = area_id {
            sql.push_str(" AND area_id = ?");
            bind_values.push(Value::Text(area_id.to_string()));
        }
        if !options.include_archived {
            sql.push_str(" AND archived = 0");
        }
        sql.push_str(" ORDER BY sort_order ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn next_project_sort_order(&self, area_id: AreaId) -> RepoResult<i64> {
        let next = self.conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1
             FROM projects
             WHERE area_id = ?1
               AND is_deleted = 0;",
            [area_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(next)
    }

    fn delete_project_cascade(&self, id: ProjectId, now: i64) -> RepoResult<CascadeReport> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let tasks = tx.execute(
            "UPDATE tasks
             SET is_deleted = 1,
                 updated_at = ?2
             WHERE is_deleted = 0
               AND project_id = ?1;",
            params![id.to_string(), now],
        )?;
        let projects = tx.execute(
            "UPDATE projects
             SET is_deleted = 1,
                 updated_at = ?2
             WHERE id = ?1
               AND is_deleted = 0;",
            params![id.to_string(), now],
        )?;
        if projects == 0 {
            return Err(RepoError::NotFound {
                entity: "project",
                id,
            });
        }
        tx.commit()?;
        Ok(CascadeReport {
            pillars: 0,
            areas: 0,
            projects,
            tasks,
        })
    }

    fn count_areas(&self, pillar_id: PillarId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM areas
             WHERE pillar_id = ?1
               AND is_deleted = 0;",
            [pillar_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn count_projects(&self, scope: Scope) -> RepoResult<ProjectCounts> {
        let (filter, bind_values) = scope.project_filter("id");
        let sql = format!(
            "SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0)
             FROM projects
             WHERE is_deleted = 0
               AND {filter};"
        );
        let (total, completed): (i64, i64) = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
        Ok(ProjectCounts {
            total: total.max(0) as u64,
            completed: completed.max(0) as u64,
        })
    }
}

fn parse_pillar_row(row: &Row<'_>) -> RepoResult<Pillar> {
    let id_text: String = row.get("id")?;
    let allocation = row
        .get::<_, Option<i64>>("time_allocation_percentage")?
        .map(|value| parse_u8(value, "pillars.time_allocation_percentage"))
        .transpose()?;
    Ok(Pillar {
        id: parse_uuid(&id_text, "pillars.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        icon: row.get("icon")?,
        color: row.get("color")?,
        time_allocation_percentage: allocation,
        weight: row.get("weight")?,
        sort_order: row.get("sort_order")?,
        archived: parse_bool(row.get("archived")?, "pillars.archived")?,
        is_deleted: parse_bool(row.get("is_deleted")?, "pillars.is_deleted")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_area_row(row: &Row<'_>) -> RepoResult<Area> {
    let id_text: String = row.get("id")?;
    let pillar_text: String = row.get("pillar_id")?;
    Ok(Area {
        id: parse_uuid(&id_text, "areas.id")?,
        pillar_id: parse_uuid(&pillar_text, "areas.pillar_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        icon: row.get("icon")?,
        color: row.get("color")?,
        importance: parse_u8(row.get("importance")?, "areas.importance")?,
        sort_order: row.get("sort_order")?,
        archived: parse_bool(row.get("archived")?, "areas.archived")?,
        is_deleted: parse_bool(row.get("is_deleted")?, "areas.is_deleted")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let id_text: String = row.get("id")?;
    let area_text: String = row.get("area_id")?;
    let status_text: String = row.get("status")?;
    let priority_text: String = row.get("priority")?;
    Ok(Project {
        id: parse_uuid(&id_text, "projects.id")?,
        area_id: parse_uuid(&area_text, "projects.area_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        icon: row.get("icon")?,
        status: ProjectStatus::parse(&status_text)
            .ok_or_else(|| invalid_enum(&status_text, "projects.status"))?,
        priority: Priority::parse(&priority_text)
            .ok_or_else(|| invalid_enum(&priority_text, "projects.priority"))?,
        importance: parse_u8(row.get("importance")?, "projects.importance")?,
        deadline: row.get("deadline")?,
        sort_order: row.get("sort_order")?,
        archived: parse_bool(row.get("archived")?, "projects.archived")?,
        is_deleted: parse_bool(row.get("is_deleted")?, "projects.is_deleted")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
