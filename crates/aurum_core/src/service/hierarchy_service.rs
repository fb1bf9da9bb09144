//! Pillar/area/project use-case service.
//!
//! # Responsibility
//! - Validate parent/child invariants above the repository layer.
//! - Provide drill-down navigation, moves, archiving, ordering and
//!   cascading deletes.
//!
//! # Invariants
//! - Parents must exist and not be soft-deleted when children are created
//!   or moved under them.
//! - Moves append the item at the end of its new parent.
//! - `reorder_pillars` accepts only an exact permutation of the active pillars.

use crate::analytics::percentage;
use crate::model::hierarchy::{
    Area, AreaDraft, AreaId, AreaPatch, Pillar, PillarDraft, PillarId, PillarPatch, Project,
    ProjectDraft, ProjectId, ProjectPatch, TaskId,
};
use crate::model::validate::ValidationError;
use crate::repo::hierarchy_repo::{CascadeReport, HierarchyRepository, ListOptions, Scope};
use crate::repo::task_repo::{TaskCounts, TaskRepository};
use crate::repo::RepoError;
use log::info;
use serde::Serialize;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Debug)]
pub enum HierarchyError {
    Validation(ValidationError),
    NotFound { entity: &'static str, id: Uuid },
    /// The parent named by a create/move does not exist or is deleted.
    ParentNotFound { entity: &'static str, id: Uuid },
    /// Reorder input is not a permutation of the active pillars.
    InvalidOrder { expected: usize, actual: usize },
    Repo(RepoError),
}

impl Display for HierarchyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::ParentNotFound { entity, id } => write!(f, "parent {entity} not found: {id}"),
            Self::InvalidOrder { expected, actual } => write!(
                f,
                "pillar order must list each of the {expected} active pillars exactly once (got {actual} ids)"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HierarchyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for HierarchyError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for HierarchyError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

pub type HierarchyResult<T> = Result<T, HierarchyError>;

/// Project plus task progress, as shown in the hierarchy tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectNode {
    pub project: Project,
    pub tasks: TaskCounts,
    pub progress_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaNode {
    pub area: Area,
    pub projects: Vec<ProjectNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PillarNode {
    pub pillar: Pillar,
    pub areas: Vec<AreaNode>,
}

/// Ancestors of a task, from the top of the hierarchy down.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breadcrumb {
    pub pillar: Pillar,
    pub area: Area,
    pub project: Project,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PillarStats {
    pub pillar_id: PillarId,
    pub area_count: u64,
    pub project_count: u64,
    pub completed_project_count: u64,
    pub task_count: u64,
    pub completed_task_count: u64,
    /// Completed share of tasks, rounded to 2 decimals.
    pub progress_percentage: f64,
}

pub struct HierarchyService<H: HierarchyRepository, T: TaskRepository> {
    hierarchy: H,
    tasks: T,
}

impl<H: HierarchyRepository, T: TaskRepository> HierarchyService<H, T> {
    pub fn new(hierarchy: H, tasks: T) -> Self {
        Self { hierarchy, tasks }
    }

    pub fn create_pillar(&self, draft: &PillarDraft, now: i64) -> HierarchyResult<Pillar> {
        let sort_order = self.hierarchy.next_pillar_sort_order()?;
        let pillar = Pillar::from_draft(draft, sort_order, now)?;
        self.hierarchy.insert_pillar(&pillar)?;
        info!(
            "event=pillar_create module=hierarchy status=ok pillar_id={}",
            pillar.id
        );
        Ok(pillar)
    }

    pub fn update_pillar(&self, id: PillarId, patch: &PillarPatch, now: i64) -> HierarchyResult<Pillar> {
        let mut pillar = self.require_pillar(id)?;
        pillar.apply_patch(patch, now)?;
        self.hierarchy.update_pillar(&pillar)?;
        Ok(pillar)
    }

    pub fn get_pillar(&self, id: PillarId) -> HierarchyResult<Pillar> {
        self.require_pillar(id)
    }

    pub fn list_pillars(&self, options: ListOptions) -> HierarchyResult<Vec<Pillar>> {
        Ok(self.hierarchy.list_pillars(options)?)
    }

    pub fn set_pillar_archived(&self, id: PillarId, archived: bool, now: i64) -> HierarchyResult<Pillar> {
        let mut pillar = self.require_pillar(id)?;
        pillar.archived = archived;
        pillar.updated_at = now;
        self.hierarchy.update_pillar(&pillar)?;
        Ok(pillar)
    }

    pub fn reorder_pillars(&self, ordered_ids: &[PillarId], now: i64) -> HierarchyResult<()> {
        let active: HashSet<PillarId> = self
            .hierarchy
            .list_pillars(ListOptions {
                include_archived: true,
            })?
            .into_iter()
            .map(|pillar| pillar.id)
            .collect();
        let requested: HashSet<PillarId> = ordered_ids.iter().copied().collect();
        if requested.len() != ordered_ids.len() || requested != active {
            return Err(HierarchyError::InvalidOrder {
                expected: active.len(),
                actual: ordered_ids.len(),
            });
        }
        self.hierarchy.reorder_pillars(ordered_ids, now)?;
        Ok(())
    }

    /// Tombstones the pillar and everything below it.
    pub fn delete_pillar(&self, id: PillarId, now: i64) -> HierarchyResult<CascadeReport> {
        let report = self.hierarchy.delete_pillar_cascade(id, now)?;
        log_cascade("pillar", id, &report);
        Ok(report)
    }

    pub fn create_area(&self, draft: &AreaDraft, now: i64) -> HierarchyResult<Area> {
        self.require_parent_pillar(draft.pillar_id)?;
        let sort_order = self.hierarchy.next_area_sort_order(draft.pillar_id)?;
        let area = Area::from_draft(draft, sort_order, now)?;
        self.hierarchy.insert_area(&area)?;
        info!(
            "event=area_create module=hierarchy status=ok area_id={} pillar_id={}",
            area.id, area.pillar_id
        );
        Ok(area)
    }

    pub fn update_area(&self, id: AreaId, patch: &AreaPatch, now: i64) -> HierarchyResult<Area> {
        let mut area = self.require_area(id)?;
        area.apply_patch(patch, now)?;
        self.hierarchy.update_area(&area)?;
        Ok(area)
    }

    pub fn get_area(&self, id: AreaId) -> HierarchyResult<Area> {
        self.require_area(id)
    }

    /// Areas under `pillar_id`, or every area when `None`.
    pub fn list_areas(&self, pillar_id: Option<PillarId>, options: ListOptions) -> HierarchyResult<Vec<Area>> {
        if let Some(pillar_id) = pillar_id {
            self.require_parent_pillar(pillar_id)?;
        }
        Ok(self.hierarchy.list_areas(pillar_id, options)?)
    }

    pub fn move_area(&self, id: AreaId, new_pillar_id: PillarId, now: i64) -> HierarchyResult<Area> {
        let mut area = self.require_area(id)?;
        self.require_parent_pillar(new_pillar_id)?;
        if area.pillar_id == new_pillar_id {
            return Ok(area);
        }
        area.sort_order = self.hierarchy.next_area_sort_order(new_pillar_id)?;
        area.pillar_id = new_pillar_id;
        area.updated_at = now;
        self.hierarchy.update_area(&area)?;
        info!(
            "event=area_move module=hierarchy status=ok area_id={} pillar_id={}",
            area.id, new_pillar_id
        );
        Ok(area)
    }

    pub fn set_area_archived(&self, id: AreaId, archived: bool, now: i64) -> HierarchyResult<Area> {
        let mut area = self.require_area(id)?;
        area.archived = archived;
        area.updated_at = now;
        self.hierarchy.update_area(&area)?;
        Ok(area)
    }

    pub fn delete_area(&self, id: AreaId, now: i64) -> HierarchyResult<CascadeReport> {
        let report = self.hierarchy.delete_area_cascade(id, now)?;
        log_cascade("area", id, &report);
        Ok(report)
    }

    pub fn create_project(&self, draft: &ProjectDraft, now: i64) -> HierarchyResult<Project> {
        self.require_parent_area(draft.area_id)?;
        let sort_order = self.hierarchy.next_project_sort_order(draft.area_id)?;
        let project = Project::from_draft(draft, sort_order, now)?;
        self.hierarchy.insert_project(&project)?;
        info!(
            "event=project_create module=hierarchy status=ok project_id={} area_id={}",
            project.id, project.area_id
        );
        Ok(project)
    }

    pub fn update_project(&self, id: ProjectId, patch: &ProjectPatch, now: i64) -> HierarchyResult<Project> {
        let mut project = self.require_project(id)?;
        project.apply_patch(patch, now)?;
        self.hierarchy.update_project(&project)?;
        Ok(project)
    }

    pub fn get_project(&self, id: ProjectId) -> HierarchyResult<Project> {
        self.require_project(id)
    }

    /// Projects under `area_id`, or every project when `None`.
    pub fn list_projects(&self, area_id: Option<AreaId>, options: ListOptions) -> HierarchyResult<Vec<Project>> {
        if let Some(area_id) = area_id {
            self.require_parent_area(area_id)?;
        }
        Ok(self.hierarchy.list_projects(area_id, options)?)
    }

    pub fn move_project(&self, id: ProjectId, new_area_id: AreaId, now: i64) -> HierarchyResult<Project> {
        let mut project = self.require_project(id)?;
        self.require_parent_area(new_area_id)?;
        if project.area_id == new_area_id {
            return Ok(project);
        }
        project.sort_order = self.hierarchy.next_project_sort_order(new_area_id)?;
        project.area_id = new_area_id;
        project.updated_at = now;
        self.hierarchy.update_project(&project)?;
        info!(
            "event=project_move module=hierarchy status=ok project_id={} area_id={}",
            project.id, new_area_id
        );
        Ok(project)
    }

    pub fn set_project_archived(&self, id: ProjectId, archived: bool, now: i64) -> HierarchyResult<Project> {
        let mut project = self.require_project(id)?;
        project.archived = archived;
        project.updated_at = now;
        self.hierarchy.update_project(&project)?;
        Ok(project)
    }

    pub fn delete_project(&self, id: ProjectId, now: i64) -> HierarchyResult<CascadeReport> {
        let report = self.hierarchy.delete_project_cascade(id, now)?;
        log_cascade("project", id, &report);
        Ok(report)
    }

    /// Nested pillars → areas → projects with task progress.
    pub fn hierarchy_tree(&self, options: ListOptions) -> HierarchyResult<Vec<PillarNode>> {
        let mut tree = Vec::new();
        for pillar in self.hierarchy.list_pillars(options)? {
            let mut areas = Vec::new();
            for area in self.hierarchy.list_areas(Some(pillar.id), options)? {
                let mut projects = Vec::new();
                for project in self.hierarchy.list_projects(Some(area.id), options)? {
                    let tasks = self.tasks.count_tasks(Scope::Project(project.id))?;
                    projects.push(ProjectNode {
                        progress_percentage: percentage(tasks.completed, tasks.total, 2),
                        project,
                        tasks,
                    });
                }
                areas.push(AreaNode { area, projects });
            }
            tree.push(PillarNode { pillar, areas });
        }
        Ok(tree)
    }

    pub fn locate_task(&self, task_id: TaskId) -> HierarchyResult<Breadcrumb> {
        let task = self
            .tasks
            .get_task(task_id)?
            .ok_or(HierarchyError::NotFound {
                entity: "task",
                id: task_id,
            })?;
        let project = self.require_project(task.project_id)?;
        let area = self.require_area(project.area_id)?;
        let pillar = self.require_pillar(area.pillar_id)?;
        Ok(Breadcrumb {
            pillar,
            area,
            project,
        })
    }

    pub fn pillar_stats(&self, id: PillarId) -> HierarchyResult<PillarStats> {
        self.require_pillar(id)?;
        let projects = self.hierarchy.count_projects(Scope::Pillar(id))?;
        let tasks = self.tasks.count_tasks(Scope::Pillar(id))?;
        Ok(PillarStats {
            pillar_id: id,
            area_count: self.hierarchy.count_areas(id)?,
            project_count: projects.total,
            completed_project_count: projects.completed,
            task_count: tasks.total,
            completed_task_count: tasks.completed,
            progress_percentage: percentage(tasks.completed, tasks.total, 2),
        })
    }

    fn require_pillar(&self, id: PillarId) -> HierarchyResult<Pillar> {
        self.hierarchy
            .get_pillar(id)?
            .ok_or(HierarchyError::NotFound {
                entity: "pillar",
                id,
            })
    }

    fn require_area(&self, id: AreaId) -> HierarchyResult<Area> {
        self.hierarchy
            .get_area(id)?
            .ok_or(HierarchyError::NotFound { entity: "area", id })
    }

    fn require_project(&self, id: ProjectId) -> HierarchyResult<Project> {
        self.hierarchy
            .get_project(id)?
            .ok_or(HierarchyError::NotFound {
                entity: "project",
                id,
            })
    }

    fn require_parent_pillar(&self, id: PillarId) -> HierarchyResult<()> {
        match self.hierarchy.get_pillar(id)? {
            Some(_) => Ok(()),
            None => Err(HierarchyError::ParentNotFound {
                entity: "pillar",
                id,
            }),
        }
    }

    fn require_parent_area(&self, id: AreaId) -> HierarchyResult<()> {
        match self.hierarchy.get_area(id)? {
            Some(_) => Ok(()),
            None => Err(HierarchyError::ParentNotFound { entity: "area", id }),
        }
    }
}

fn log_cascade(entity: &str, id: Uuid, report: &CascadeReport) {
    info!(
        "event=cascade_delete module=hierarchy status=ok entity={} id={} areas={} projects={} tasks={}",
        entity, id, report.areas, report.projects, report.tasks
    );
}
