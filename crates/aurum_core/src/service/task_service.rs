//! Task use-case service.
//!
//! # Responsibility
//! - Create and edit tasks under active projects.
//! - Guard dependency edges against missing targets and cycles.
//! - Record alignment points exactly once per completed task.
//! - Build the scored Today view and the end-of-day summary.

use crate::analytics::alignment::{task_points, PointsBreakdown};
use crate::analytics::percentage;
use crate::analytics::scoring::{priority_score, ScoreBreakdown, ScoreInput};
use crate::model::hierarchy::{
    Priority, ProjectId, Task, TaskDraft, TaskId, TaskPatch, TaskStatus,
};
use crate::model::validate::ValidationError;
use crate::repo::alignment_repo::{AlignmentRecord, AlignmentRepository};
use crate::repo::task_repo::{HierarchyContext, TaskRepository};
use crate::repo::RepoError;
use crate::time::{date_of, end_of_day, start_of_day};
use log::info;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Debug)]
pub enum TaskServiceError {
    Validation(ValidationError),
    TaskNotFound(TaskId),
    /// Project is missing, deleted, or sits under a deleted area/pillar.
    ProjectNotFound(ProjectId),
    DependencyNotFound(TaskId),
    /// Adding `dependency_id` to `task_id` would close a loop.
    DependencyCycle { task_id: TaskId, dependency_id: TaskId },
    Repo(RepoError),
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::DependencyNotFound(id) => write!(f, "dependency task not found: {id}"),
            Self::DependencyCycle {
                task_id,
                dependency_id,
            } => write!(
                f,
                "depending on {dependency_id} would create a cycle through {task_id}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for TaskServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for TaskServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity: "task", id } => Self::TaskNotFound(id),
            RepoError::NotFound {
                entity: "project",
                id,
            } => Self::ProjectNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

/// Result of [`TaskService::complete_task`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionOutcome {
    pub task: Task,
    /// Points recorded by this call; `None` when the task had already earned them.
    pub points: Option<PointsBreakdown>,
}

/// One scored row of the Today view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodayTask {
    pub task: Task,
    pub score: f64,
    pub score_breakdown: ScoreBreakdown,
    pub is_overdue: bool,
    pub dependencies_met: bool,
    pub project_name: String,
    pub area_name: String,
    pub pillar_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TodayStats {
    /// Open tasks listed plus tasks completed today, not the listed count
    /// alone, so `completion_rate` stays within 0..=100.
    pub total_today: u64,
    pub completed_today: u64,
    /// `completed_today / total_today` in percent, one decimal.
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodayView {
    pub tasks: Vec<TodayTask>,
    pub stats: TodayStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    pub completed_count: u64,
    pub projects_touched: u64,
    /// Open high-priority tasks whose due date has passed.
    pub pending_high_priority: u64,
    /// Project with the most completions today; ties go to the one completed first.
    pub top_project: Option<ProjectId>,
}

pub struct TaskService<T: TaskRepository, A: AlignmentRepository> {
    tasks: T,
    alignment: A,
}

impl<T: TaskRepository, A: AlignmentRepository> TaskService<T, A> {
    pub fn new(tasks: T, alignment: A) -> Self {
        Self { tasks, alignment }
    }

    pub fn create_task(&self, draft: &TaskDraft, now: i64) -> TaskServiceResult<Task> {
        self.require_context(draft.project_id)?;
        let dependency_ids = dedupe(&draft.dependency_ids);
        for dependency_id in &dependency_ids {
            self.require_dependency(*dependency_id)?;
        }

        let sort_order = self.tasks.next_task_sort_order(draft.project_id)?;
        let mut task = Task::from_draft(draft, sort_order, now)?;
        task.dependency_ids = dependency_ids;
        self.tasks.insert_task(&task)?;
        info!(
            "event=task_create module=task status=ok task_id={} project_id={} deps={}",
            task.id,
            task.project_id,
            task.dependency_ids.len()
        );
        Ok(task)
    }

    pub fn get_task(&self, id: TaskId) -> TaskServiceResult<Task> {
        self.require_task(id)
    }

    pub fn list_tasks(&self, project_id: ProjectId) -> TaskServiceResult<Vec<Task>> {
        self.require_context(project_id)?;
        Ok(self.tasks.list_tasks(project_id)?)
    }

    /// Applies a partial update. A patch that marks the task done earns
    /// alignment points the same way [`Self::complete_task`] does.
    pub fn update_task(&self, id: TaskId, patch: &TaskPatch, now: i64) -> TaskServiceResult<Task> {
        let mut task = self.require_task(id)?;
        let was_done = task.is_done();
        task.apply_patch(patch, now)?;
        self.tasks.update_task(&task)?;
        if !was_done && task.is_done() {
            self.record_alignment(&task, now)?;
        }
        Ok(task)
    }

    /// Replaces the task's dependency set.
    pub fn set_dependencies(
        &self,
        id: TaskId,
        dependency_ids: &[TaskId],
        now: i64,
    ) -> TaskServiceResult<Task> {
        let mut task = self.require_task(id)?;
        let dependency_ids = dedupe(dependency_ids);
        for dependency_id in &dependency_ids {
            if *dependency_id == id {
                return Err(ValidationError::SelfDependency.into());
            }
            self.require_dependency(*dependency_id)?;
            if self.would_create_cycle(id, *dependency_id)? {
                return Err(TaskServiceError::DependencyCycle {
                    task_id: id,
                    dependency_id: *dependency_id,
                });
            }
        }

        self.tasks.set_dependencies(id, &dependency_ids, now)?;
        task.dependency_ids = dependency_ids;
        task.updated_at = now;
        Ok(task)
    }

    pub fn delete_task(&self, id: TaskId, now: i64) -> TaskServiceResult<()> {
        self.tasks.soft_delete_task(id, now)?;
        info!("event=task_delete module=task status=ok task_id={id}");
        Ok(())
    }

    /// Marks the task done and records its alignment points once.
    pub fn complete_task(&self, id: TaskId, now: i64) -> TaskServiceResult<CompletionOutcome> {
        let mut task = self.require_task(id)?;
        if !task.is_done() {
            task.set_status(TaskStatus::Done, now);
            self.tasks.update_task(&task)?;
        }
        let points = self.record_alignment(&task, now)?;
        Ok(CompletionOutcome { task, points })
    }

    /// Returns a done task to `todo`. Earned points are kept.
    pub fn reopen_task(&self, id: TaskId, now: i64) -> TaskServiceResult<Task> {
        let mut task = self.require_task(id)?;
        if task.is_done() {
            task.set_status(TaskStatus::Todo, now);
            self.tasks.update_task(&task)?;
        }
        Ok(task)
    }

    /// Open tasks due by the end of today (overdue and undated included),
    /// best first.
    pub fn today(&self, now: i64, limit: usize) -> TaskServiceResult<TodayView> {
        let today = date_of(now);
        let day_start = start_of_day(today);
        let day_end = end_of_day(today);

        let mut contexts: HashMap<ProjectId, Option<HierarchyContext>> = HashMap::new();
        let mut rows = Vec::new();
        for task in self.tasks.list_open_due_by(day_end)? {
            if !contexts.contains_key(&task.project_id) {
                let context = self.tasks.hierarchy_context(task.project_id)?;
                contexts.insert(task.project_id, context);
            }
            let Some(Some(context)) = contexts.get(&task.project_id) else {
                continue;
            };

            let dependencies_met = self.tasks.dependencies_met(task.id)?;
            let due_at = task.due_at();
            let breakdown = priority_score(
                &ScoreInput {
                    priority: task.priority,
                    due_at,
                    created_at: task.created_at,
                    area_importance: context.area_importance,
                    project_importance: context.project_importance,
                    pillar_weight: context.pillar_weight,
                    dependencies_met,
                },
                now,
            );
            rows.push(TodayTask {
                score: breakdown.total,
                score_breakdown: breakdown,
                is_overdue: due_at.is_some_and(|due| due < day_start),
                dependencies_met,
                project_name: context.project_name.clone(),
                area_name: context.area_name.clone(),
                pillar_name: context.pillar_name.clone(),
                task,
            });
        }

        rows.sort_by(compare_today_rows);
        rows.truncate(limit);

        let completed_today = self.tasks.list_completed_between(day_start, day_end)?.len() as u64;
        let total_today = rows.len() as u64 + completed_today;
        Ok(TodayView {
            stats: TodayStats {
                total_today,
                completed_today,
                completion_rate: percentage(completed_today, total_today, 1),
            },
            tasks: rows,
        })
    }

    pub fn daily_summary(&self, now: i64) -> TaskServiceResult<DailySummary> {
        let today = date_of(now);
        let completed = self
            .tasks
            .list_completed_between(start_of_day(today), end_of_day(today))?;

        // Completion order is kept so ties resolve to the earliest project.
        let mut touched: Vec<(ProjectId, u64)> = Vec::new();
        for task in &completed {
            match touched.iter_mut().find(|(id, _)| *id == task.project_id) {
                Some((_, count)) => *count += 1,
                None => touched.push((task.project_id, 1)),
            }
        }
        let top_project = touched
            .iter()
            .fold(None::<(ProjectId, u64)>, |best, &(id, count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((id, count)),
            })
            .map(|(id, _)| id);

        let pending_high_priority = self
            .tasks
            .list_open_overdue(now)?
            .iter()
            .filter(|task| task.priority == Priority::High)
            .count() as u64;

        Ok(DailySummary {
            completed_count: completed.len() as u64,
            projects_touched: touched.len() as u64,
            pending_high_priority,
            top_project,
        })
    }

    fn record_alignment(&self, task: &Task, now: i64) -> TaskServiceResult<Option<PointsBreakdown>> {
        if self.alignment.record_for_task(task.id)?.is_some() {
            return Ok(None);
        }
        let context = self.tasks.hierarchy_context(task.project_id)?;
        let points = task_points(
            task.priority,
            context.as_ref().map(|context| context.project_priority),
            context.as_ref().map(|context| context.area_importance),
        );
        let inserted = self.alignment.insert_record(&AlignmentRecord {
            id: Uuid::new_v4(),
            task_id: task.id,
            points_earned: points.total(),
            base_points: points.base_points,
            task_priority_bonus: points.task_priority_bonus,
            project_priority_bonus: points.project_priority_bonus,
            area_importance_bonus: points.area_importance_bonus,
            created_at: now,
        })?;
        if !inserted {
            return Ok(None);
        }
        info!(
            "event=alignment_record module=task status=ok task_id={} points={}",
            task.id,
            points.total()
        );
        Ok(Some(points))
    }

    /// Walks the dependency graph from `dependency_id`; reaching `task_id`
    /// means the new edge would close a loop.
    fn would_create_cycle(&self, task_id: TaskId, dependency_id: TaskId) -> TaskServiceResult<bool> {
        let mut pending = vec![dependency_id];
        let mut visited = HashSet::new();
        while let Some(current) = pending.pop() {
            if current == task_id {
                return Ok(true);
            }
            if !visited.insert(current) {
                continue;
            }
            pending.extend(self.tasks.list_dependency_ids(current)?);
        }
        Ok(false)
    }

    fn require_task(&self, id: TaskId) -> TaskServiceResult<Task> {
        self.tasks
            .get_task(id)?
            .ok_or(TaskServiceError::TaskNotFound(id))
    }

    fn require_dependency(&self, id: TaskId) -> TaskServiceResult<()> {
        match self.tasks.get_task(id)? {
            Some(_) => Ok(()),
            None => Err(TaskServiceError::DependencyNotFound(id)),
        }
    }

    fn require_context(&self, project_id: ProjectId) -> TaskServiceResult<HierarchyContext> {
        self.tasks
            .hierarchy_context(project_id)?
            .ok_or(TaskServiceError::ProjectNotFound(project_id))
    }
}

/// Score desc, then due instant asc with undated last, then id.
fn compare_today_rows(left: &TodayTask, right: &TodayTask) -> Ordering {
    right
        .score
        .total_cmp(&left.score)
        .then_with(|| match (left.task.due_at(), right.task.due_at()) {
            (Some(l), Some(r)) => l.cmp(&r),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| left.task.id.cmp(&right.task.id))
}

fn dedupe(ids: &[TaskId]) -> Vec<TaskId> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::dedupe;
    use uuid::Uuid;

    #[test]
    fn dedupe_keeps_first_occurrence_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedupe(&[a, b, a, b]), vec![a, b]);
    }
}
