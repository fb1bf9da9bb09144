//! Pillar → Area → Project → Task records.
//!
//! # Responsibility
//! - Define the four-level hierarchy records and their enums.
//! - Turn user drafts/patches into validated records.
//!
//! # Invariants
//! - Every record is identified by a stable UUID that is never reused.
//! - Children reference exactly one parent of the level above.
//! - Deletion is a soft-delete tombstone (`is_deleted`), archiving is a
//!   separate visibility flag.
//! - `Task::completed_at` is set iff `status == TaskStatus::Done`.

use crate::model::validate::{
    check_range, normalize_color, normalize_description, normalize_icon, normalize_name,
    parse_time_of_day, ValidationError,
};
use crate::time::MS_PER_DAY;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PillarId = Uuid;
pub type AreaId = Uuid;
pub type ProjectId = Uuid;
pub type TaskId = Uuid;

pub const DEFAULT_PILLAR_ICON: &str = "🎯";
pub const DEFAULT_AREA_ICON: &str = "🎯";
pub const DEFAULT_PROJECT_ICON: &str = "🚀";
pub const DEFAULT_IMPORTANCE: u8 = 3;
pub const DEFAULT_PILLAR_WEIGHT: f64 = 1.0;
/// Upper bound for task estimates (8 hours).
pub const MAX_ESTIMATED_MINUTES: u32 = 480;
const MAX_DUE_DATE_HORIZON_MS: i64 = 5 * 365 * MS_PER_DAY;

/// Shared priority scale for projects and tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Project lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    OnHold,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::OnHold => "on_hold",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "not_started" => Some(Self::NotStarted),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "on_hold" => Some(Self::OnHold),
            _ => None,
        }
    }
}

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Top-level life domain ("Health", "Career").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pillar {
    pub id: PillarId,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    /// Share of weekly time the user wants to spend here, 0..=100.
    pub time_allocation_percentage: Option<u8>,
    /// Scoring multiplier in `0.1..=2.0`.
    pub weight: f64,
    pub sort_order: i64,
    pub archived: bool,
    pub is_deleted: bool,
    /// Epoch ms.
    pub created_at: i64,
    /// Epoch ms.
    pub updated_at: i64,
}

/// Focus area inside a pillar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub id: AreaId,
    pub pillar_id: PillarId,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    /// 1 (low) ..= 5 (critical).
    pub importance: u8,
    pub sort_order: i64,
    pub archived: bool,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Outcome-oriented project inside an area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub area_id: AreaId,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub importance: u8,
    /// Epoch ms.
    pub deadline: Option<i64>,
    pub sort_order: i64,
    pub archived: bool,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Actionable item inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub status: TaskStatus,
    /// Epoch ms; the calendar day is what matters unless `due_time` is set.
    pub due_date: Option<i64>,
    /// `HH:MM` (24h, UTC).
    pub due_time: Option<String>,
    /// Minutes, 1..=480.
    pub estimated_duration: Option<u32>,
    /// Tasks that must be done before this one can start.
    pub dependency_ids: Vec<TaskId>,
    pub completed_at: Option<i64>,
    pub sort_order: i64,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating a pillar. Empty strings fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PillarDraft {
    pub name: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    pub time_allocation_percentage: Option<u8>,
    pub weight: Option<f64>,
}

/// Partial pillar update; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PillarPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    /// `Some(None)` clears the allocation.
    pub time_allocation_percentage: Option<Option<u8>>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaDraft {
    pub pillar_id: PillarId,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    pub importance: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub importance: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectDraft {
    pub area_id: AreaId,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub importance: Option<u8>,
    pub deadline: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub importance: Option<u8>,
    pub deadline: Option<Option<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<i64>,
    pub due_time: Option<String>,
    pub estimated_duration: Option<u32>,
    pub dependency_ids: Vec<TaskId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<Option<i64>>,
    pub due_time: Option<Option<String>>,
    pub estimated_duration: Option<Option<u32>>,
}

impl Pillar {
    /// Builds a validated pillar from user input.
    pub fn from_draft(draft: &PillarDraft, sort_order: i64, now: i64) -> Result<Self, ValidationError> {
        let pillar = Self {
            id: Uuid::new_v4(),
            name: normalize_name("name", &draft.name)?,
            description: normalize_description(&draft.description)?,
            icon: normalize_icon(&draft.icon, DEFAULT_PILLAR_ICON)?,
            color: normalize_color(&draft.color)?,
            time_allocation_percentage: draft.time_allocation_percentage,
            weight: draft.weight.unwrap_or(DEFAULT_PILLAR_WEIGHT),
            sort_order,
            archived: false,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        pillar.validate()?;
        Ok(pillar)
    }

    pub fn apply_patch(&mut self, patch: &PillarPatch, now: i64) -> Result<(), ValidationError> {
        if let Some(name) = patch.name.as_deref() {
            self.name = normalize_name("name", name)?;
        }
        if let Some(description) = patch.description.as_deref() {
            self.description = normalize_description(description)?;
        }
        if let Some(icon) = patch.icon.as_deref() {
            self.icon = normalize_icon(icon, DEFAULT_PILLAR_ICON)?;
        }
        if let Some(color) = patch.color.as_deref() {
            self.color = normalize_color(color)?;
        }
        if let Some(allocation) = patch.time_allocation_percentage {
            self.time_allocation_percentage = allocation;
        }
        if let Some(weight) = patch.weight {
            self.weight = weight;
        }
        self.updated_at = now;
        self.validate()
    }

    /// Checks numeric invariants that sanitizing cannot repair.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(allocation) = self.time_allocation_percentage {
            check_range("time_allocation_percentage", i64::from(allocation), 0, 100)?;
        }
        if !(0.1..=2.0).contains(&self.weight) {
            return Err(ValidationError::WeightOutOfRange(self.weight));
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}

impl Area {
    pub fn from_draft(draft: &AreaDraft, sort_order: i64, now: i64) -> Result<Self, ValidationError> {
        let area = Self {
            id: Uuid::new_v4(),
            pillar_id: draft.pillar_id,
            name: normalize_name("name", &draft.name)?,
            description: normalize_description(&draft.description)?,
            icon: normalize_icon(&draft.icon, DEFAULT_AREA_ICON)?,
            color: normalize_color(&draft.color)?,
            importance: draft.importance.unwrap_or(DEFAULT_IMPORTANCE),
            sort_order,
            archived: false,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        area.validate()?;
        Ok(area)
    }

    pub fn apply_patch(&mut self, patch: &AreaPatch, now: i64) -> Result<(), ValidationError> {
        if let Some(name) = patch.name.as_deref() {
            self.name = normalize_name("name", name)?;
        }
        if let Some(description) = patch.description.as_deref() {
            self.description = normalize_description(description)?;
        }
        if let Some(icon) = patch.icon.as_deref() {
            self.icon = normalize_icon(icon, DEFAULT_AREA_ICON)?;
        }
        if let Some(color) = patch.color.as_deref() {
            self.color = normalize_color(color)?;
        }
        if let Some(importance) = patch.importance {
            self.importance = importance;
        }
        self.updated_at = now;
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("importance", i64::from(self.importance), 1, 5)
    }
}

impl Project {
    /// Builds a validated project. A deadline must not precede `now`.
    pub fn from_draft(draft: &ProjectDraft, sort_order: i64, now: i64) -> Result<Self, ValidationError> {
        if matches!(draft.deadline, Some(deadline) if deadline < now) {
            return Err(ValidationError::DeadlineInPast);
        }
        let project = Self {
            id: Uuid::new_v4(),
            area_id: draft.area_id,
            name: normalize_name("name", &draft.name)?,
            description: normalize_description(&draft.description)?,
            icon: normalize_icon(&draft.icon, DEFAULT_PROJECT_ICON)?,
            status: draft.status,
            priority: draft.priority,
            importance: draft.importance.unwrap_or(DEFAULT_IMPORTANCE),
            deadline: draft.deadline,
            sort_order,
            archived: false,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        project.validate()?;
        Ok(project)
    }

    pub fn apply_patch(&mut self, patch: &ProjectPatch, now: i64) -> Result<(), ValidationError> {
        if let Some(name) = patch.name.as_deref() {
            self.name = normalize_name("name", name)?;
        }
        if let Some(description) = patch.description.as_deref() {
            self.description = normalize_description(description)?;
        }
        if let Some(icon) = patch.icon.as_deref() {
            self.icon = normalize_icon(icon, DEFAULT_PROJECT_ICON)?;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(importance) = patch.importance {
            self.importance = importance;
        }
        if let Some(deadline) = patch.deadline {
            self.deadline = deadline;
        }
        self.updated_at = now;
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("importance", i64::from(self.importance), 1, 5)
    }
}

impl Task {
    /// Builds a validated `todo` task.
    pub fn from_draft(draft: &TaskDraft, sort_order: i64, now: i64) -> Result<Self, ValidationError> {
        let id = Uuid::new_v4();
        let task = Self {
            id,
            project_id: draft.project_id,
            name: normalize_name("name", &draft.name)?,
            description: normalize_description(&draft.description)?,
            priority: draft.priority,
            status: TaskStatus::Todo,
            due_date: draft.due_date,
            due_time: normalize_due_time(draft.due_time.as_deref())?,
            estimated_duration: draft.estimated_duration,
            dependency_ids: draft.dependency_ids.clone(),
            completed_at: None,
            sort_order,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        task.validate(now)?;
        Ok(task)
    }

    /// Applies a patch. Status changes keep `completed_at` consistent.
    pub fn apply_patch(&mut self, patch: &TaskPatch, now: i64) -> Result<(), ValidationError> {
        if let Some(name) = patch.name.as_deref() {
            self.name = normalize_name("name", name)?;
        }
        if let Some(description) = patch.description.as_deref() {
            self.description = normalize_description(description)?;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(status) = patch.status {
            self.set_status(status, now);
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(due_time) = patch.due_time.as_ref() {
            self.due_time = normalize_due_time(due_time.as_deref())?;
        }
        if let Some(estimate) = patch.estimated_duration {
            self.estimated_duration = estimate;
        }
        self.updated_at = now;
        self.validate(now)
    }

    pub fn set_status(&mut self, status: TaskStatus, now: i64) {
        match (self.status, status) {
            (TaskStatus::Done, TaskStatus::Done) => {}
            (_, TaskStatus::Done) => self.completed_at = Some(now),
            (_, _) => self.completed_at = None,
        }
        self.status = status;
        self.updated_at = now;
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// Validates against `now` for the due-date horizon.
    pub fn validate(&self, now: i64) -> Result<(), ValidationError> {
        if let Some(estimate) = self.estimated_duration {
            check_range(
                "estimated_duration",
                i64::from(estimate),
                1,
                i64::from(MAX_ESTIMATED_MINUTES),
            )?;
        }
        if matches!(self.due_date, Some(due) if due > now + MAX_DUE_DATE_HORIZON_MS) {
            return Err(ValidationError::DueDateTooFar);
        }
        if self.dependency_ids.contains(&self.id) {
            return Err(ValidationError::SelfDependency);
        }
        Ok(())
    }

    /// Due instant including `due_time` when present.
    pub fn due_at(&self) -> Option<i64> {
        let due_date = self.due_date?;
        match self.due_time.as_deref() {
            Some(value) => match parse_time_of_day("due_time", value) {
                Ok(minutes) => Some(crate::time::at_minute_of_day(due_date, minutes)),
                Err(_) => Some(due_date),
            },
            None => Some(due_date),
        }
    }
}

fn normalize_due_time(value: Option<&str>) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => {
            parse_time_of_day("due_time", value)?;
            Ok(Some(value.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pillar_draft_applies_defaults() {
        let draft = PillarDraft {
            name: "  Health ".to_string(),
            ..PillarDraft::default()
        };
        let pillar = Pillar::from_draft(&draft, 0, 1_000).unwrap();
        assert_eq!(pillar.name, "Health");
        assert_eq!(pillar.icon, DEFAULT_PILLAR_ICON);
        assert_eq!(pillar.color, "#000000");
        assert_eq!(pillar.weight, DEFAULT_PILLAR_WEIGHT);
        assert_eq!(pillar.created_at, 1_000);
    }

    #[test]
    fn pillar_rejects_allocation_and_weight_out_of_range() {
        let draft = PillarDraft {
            name: "Career".to_string(),
            time_allocation_percentage: Some(101),
            ..PillarDraft::default()
        };
        assert!(matches!(
            Pillar::from_draft(&draft, 0, 0),
            Err(ValidationError::OutOfRange { field: "time_allocation_percentage", .. })
        ));

        let draft = PillarDraft {
            name: "Career".to_string(),
            weight: Some(2.5),
            ..PillarDraft::default()
        };
        assert_eq!(
            Pillar::from_draft(&draft, 0, 0).unwrap_err(),
            ValidationError::WeightOutOfRange(2.5)
        );
    }

    #[test]
    fn project_deadline_cannot_be_in_the_past() {
        let draft = ProjectDraft {
            area_id: Uuid::new_v4(),
            name: "Launch".to_string(),
            deadline: Some(10),
            ..ProjectDraft::default()
        };
        assert_eq!(
            Project::from_draft(&draft, 0, 20).unwrap_err(),
            ValidationError::DeadlineInPast
        );
    }

    #[test]
    fn task_status_transitions_track_completed_at() {
        let draft = TaskDraft {
            project_id: Uuid::new_v4(),
            name: "Write report".to_string(),
            ..TaskDraft::default()
        };
        let mut task = Task::from_draft(&draft, 0, 100).unwrap();
        assert_eq!(task.status, TaskStatus::Todo);

        task.set_status(TaskStatus::Done, 200);
        assert_eq!(task.completed_at, Some(200));
        task.set_status(TaskStatus::Done, 300);
        assert_eq!(task.completed_at, Some(200));

        task.set_status(TaskStatus::InProgress, 400);
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn task_rejects_bad_estimate_and_due_time() {
        let mut draft = TaskDraft {
            project_id: Uuid::new_v4(),
            name: "Run".to_string(),
            estimated_duration: Some(481),
            ..TaskDraft::default()
        };
        assert!(Task::from_draft(&draft, 0, 0).is_err());

        draft.estimated_duration = Some(30);
        draft.due_time = Some("25:00".to_string());
        assert!(matches!(
            Task::from_draft(&draft, 0, 0),
            Err(ValidationError::InvalidTimeOfDay { .. })
        ));
    }

    #[test]
    fn task_due_at_includes_time_of_day() {
        let draft = TaskDraft {
            project_id: Uuid::new_v4(),
            name: "Call".to_string(),
            due_date: Some(0),
            due_time: Some("09:30".to_string()),
            ..TaskDraft::default()
        };
        let task = Task::from_draft(&draft, 0, 0).unwrap();
        assert_eq!(task.due_at(), Some((9 * 60 + 30) * 60 * 1000));
    }

    #[test]
    fn enums_round_trip_through_storage_strings() {
        for status in [ProjectStatus::NotStarted, ProjectStatus::OnHold] {
            assert_eq!(ProjectStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(Priority::parse("HIGH"), Some(Priority::High));
        assert_eq!(TaskStatus::parse("blocked"), None);
    }
}
