//! Alignment points and dashboard arithmetic.

use crate::analytics::round_to;
use crate::model::hierarchy::Priority;
use serde::Serialize;

pub const BASE_POINTS: u32 = 5;
pub const HIGH_TASK_PRIORITY_BONUS: u32 = 10;
pub const HIGH_PROJECT_PRIORITY_BONUS: u32 = 15;
pub const CRITICAL_AREA_BONUS: u32 = 20;
/// Goal used for the progress bar while the user has not set one.
pub const PLACEHOLDER_MONTHLY_GOAL: u32 = 1000;

/// Points for one completed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointsBreakdown {
    pub base_points: u32,
    pub task_priority_bonus: u32,
    pub project_priority_bonus: u32,
    pub area_importance_bonus: u32,
}

impl PointsBreakdown {
    pub fn total(&self) -> u32 {
        self.base_points
            + self.task_priority_bonus
            + self.project_priority_bonus
            + self.area_importance_bonus
    }
}

/// Additive points: base, then bonuses for a high-priority task, a
/// high-priority project and a critical (importance 5) area.
pub fn task_points(
    task_priority: Priority,
    project_priority: Option<Priority>,
    area_importance: Option<u8>,
) -> PointsBreakdown {
    PointsBreakdown {
        base_points: BASE_POINTS,
        task_priority_bonus: if task_priority == Priority::High {
            HIGH_TASK_PRIORITY_BONUS
        } else {
            0
        },
        project_priority_bonus: if project_priority == Some(Priority::High) {
            HIGH_PROJECT_PRIORITY_BONUS
        } else {
            0
        },
        area_importance_bonus: if area_importance == Some(5) {
            CRITICAL_AREA_BONUS
        } else {
            0
        },
    }
}

/// Monthly progress toward `goal` (or the placeholder), capped at 100 and
/// rounded to one decimal.
pub fn monthly_progress(monthly_score: u64, goal: Option<u32>) -> f64 {
    let effective = goal.unwrap_or(PLACEHOLDER_MONTHLY_GOAL);
    if effective == 0 {
        return 0.0;
    }
    let percentage = (monthly_score as f64 / f64::from(effective) * 100.0).min(100.0);
    round_to(percentage, 1)
}
