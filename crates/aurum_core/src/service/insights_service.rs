//! Completion insights across the hierarchy.

use crate::analytics::percentage;
use crate::model::hierarchy::{AreaId, PillarId, ProjectId};
use crate::repo::hierarchy_repo::{HierarchyRepository, ListOptions, Scope};
use crate::repo::task_repo::TaskRepository;
use crate::repo::{RepoError, RepoResult};
use serde::Serialize;

/// Completed-task share of one pillar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PillarAlignment {
    pub pillar_id: PillarId,
    pub pillar_name: String,
    pub task_count: u64,
    /// Share of all completed tasks, one decimal.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentSnapshot {
    pub total_tasks_completed: u64,
    pub total_projects_completed: u64,
    /// Most completed tasks first.
    pub pillar_alignment: Vec<PillarAlignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaInsight {
    pub area_id: AreaId,
    pub tasks_completed: u64,
    pub tasks_total: u64,
    pub projects_completed: u64,
    pub projects_total: u64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectInsight {
    pub project_id: ProjectId,
    pub tasks_completed: u64,
    pub tasks_remaining: u64,
    pub completion_percentage: f64,
}

pub struct InsightsService<H: HierarchyRepository, T: TaskRepository> {
    hierarchy: H,
    tasks: T,
}

impl<H: HierarchyRepository, T: TaskRepository> InsightsService<H, T> {
    pub fn new(hierarchy: H, tasks: T) -> Self {
        Self { hierarchy, tasks }
    }

    pub fn alignment_snapshot(&self) -> RepoResult<AlignmentSnapshot> {
        let total_tasks_completed = self.tasks.count_tasks(Scope::All)?.completed;
        let total_projects_completed = self.hierarchy.count_projects(Scope::All)?.completed;

        let mut pillar_alignment = Vec::new();
        for pillar in self.hierarchy.list_pillars(ListOptions {
            include_archived: true,
        })? {
            let task_count = self.tasks.count_tasks(Scope::Pillar(pillar.id))?.completed;
            pillar_alignment.push(PillarAlignment {
                pillar_id: pillar.id,
                pillar_name: pillar.name,
                task_count,
                percentage: percentage(task_count, total_tasks_completed, 1),
            });
        }
        pillar_alignment.sort_by(|left, right| right.task_count.cmp(&left.task_count));

        Ok(AlignmentSnapshot {
            total_tasks_completed,
            total_projects_completed,
            pillar_alignment,
        })
    }

    pub fn area_insight(&self, area_id: AreaId) -> RepoResult<AreaInsight> {
        if self.hierarchy.get_area(area_id)?.is_none() {
            return Err(RepoError::NotFound {
                entity: "area",
                id: area_id,
            });
        }
        let tasks = self.tasks.count_tasks(Scope::Area(area_id))?;
        let projects = self.hierarchy.count_projects(Scope::Area(area_id))?;
        Ok(AreaInsight {
            area_id,
            tasks_completed: tasks.completed,
            tasks_total: tasks.total,
            projects_completed: projects.completed,
            projects_total: projects.total,
            completion_rate: percentage(tasks.completed, tasks.total, 1),
        })
    }

    pub fn project_insight(&self, project_id: ProjectId) -> RepoResult<ProjectInsight> {
        if self.hierarchy.get_project(project_id)?.is_none() {
            return Err(RepoError::NotFound {
                entity: "project",
                id: project_id,
            });
        }
        let tasks = self.tasks.count_tasks(Scope::Project(project_id))?;
        Ok(ProjectInsight {
            project_id,
            tasks_completed: tasks.completed,
            tasks_remaining: tasks.total - tasks.completed,
            completion_percentage: percentage(tasks.completed, tasks.total, 1),
        })
    }
}
