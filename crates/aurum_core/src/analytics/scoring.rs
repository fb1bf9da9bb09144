//! Task priority scoring for the Today view.
//!
//! Scores are in `0.0..=100.0`; higher means "do this sooner". The score is
//! the capped sum of five parts:
//!
//! | part        | range   | driver                                   |
//! |-------------|---------|------------------------------------------|
//! | urgency     | 0..=40  | whole days until due                     |
//! | priority    | 5..=20  | task priority                            |
//! | hierarchy   | 0..=25  | area/project importance, pillar weight   |
//! | dependency  | 2 or 15 | whether every dependency is done         |
//! | age         | 0..=3   | days since creation, after one week      |

use crate::model::hierarchy::Priority;
use crate::time::whole_days_between;
use serde::Serialize;

pub const MAX_SCORE: f64 = 100.0;
const NO_DUE_DATE_URGENCY: f64 = 5.0;
const DEPENDENCIES_MET_SCORE: f64 = 15.0;
const DEPENDENCIES_BLOCKED_SCORE: f64 = 2.0;
const AGE_BONUS_AFTER_DAYS: i64 = 7;
const MAX_AGE_BONUS: f64 = 3.0;

/// Everything the score depends on, detached from storage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInput {
    pub priority: Priority,
    /// Due instant in epoch ms.
    pub due_at: Option<i64>,
    pub created_at: i64,
    pub area_importance: u8,
    pub project_importance: u8,
    pub pillar_weight: f64,
    pub dependencies_met: bool,
}

/// Per-part contributions, kept for display and debugging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub urgency: f64,
    pub priority: f64,
    pub hierarchy: f64,
    pub dependency: f64,
    pub age: f64,
    pub total: f64,
}

pub fn priority_score(input: &ScoreInput, now: i64) -> ScoreBreakdown {
    let urgency = urgency_score(input.due_at, now);
    let priority = priority_weight(input.priority);
    let hierarchy = hierarchy_score(
        input.area_importance,
        input.project_importance,
        input.pillar_weight,
    );
    let dependency = if input.dependencies_met {
        DEPENDENCIES_MET_SCORE
    } else {
        DEPENDENCIES_BLOCKED_SCORE
    };
    let age = age_bonus(input.created_at, now);
    let total = (urgency + priority + hierarchy + dependency + age).min(MAX_SCORE);
    ScoreBreakdown {
        urgency,
        priority,
        hierarchy,
        dependency,
        age,
        total,
    }
}

pub fn urgency_score(due_at: Option<i64>, now: i64) -> f64 {
    let Some(due_at) = due_at else {
        return NO_DUE_DATE_URGENCY;
    };
    let days = whole_days_between(now, due_at);
    match days {
        d if d <= 0 => 40.0,
        1 => 35.0,
        2..=3 => 25.0,
        4..=7 => 15.0,
        8..=14 => 8.0,
        d => (5.0 - d as f64 * 0.1).max(0.0),
    }
}

pub fn priority_weight(priority: Priority) -> f64 {
    match priority {
        Priority::High => 20.0,
        Priority::Medium => 12.0,
        Priority::Low => 5.0,
    }
}

pub fn hierarchy_score(area_importance: u8, project_importance: u8, pillar_weight: f64) -> f64 {
    let area = f64::from(area_importance) / 5.0 * 10.0;
    let project = f64::from(project_importance) / 5.0 * 10.0;
    let pillar = (pillar_weight * 2.5).min(5.0);
    area + project + pillar
}

fn age_bonus(created_at: i64, now: i64) -> f64 {
    let days_old = whole_days_between(created_at, now);
    if days_old > AGE_BONUS_AFTER_DAYS {
        (days_old as f64 * 0.1).min(MAX_AGE_BONUS)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{MS_PER_DAY, MS_PER_HOUR};

    const NOW: i64 = 1_000 * MS_PER_DAY;

    fn input() -> ScoreInput {
        ScoreInput {
            priority: Priority::Medium,
            due_at: None,
            created_at: NOW,
            area_importance: 3,
            project_importance: 3,
            pillar_weight: 1.0,
            dependencies_met: true,
        }
    }

    #[test]
    fn urgency_buckets() {
        assert_eq!(urgency_score(None, NOW), 5.0);
        assert_eq!(urgency_score(Some(NOW - MS_PER_DAY), NOW), 40.0);
        assert_eq!(urgency_score(Some(NOW + 3 * MS_PER_HOUR), NOW), 40.0);
        assert_eq!(urgency_score(Some(NOW + MS_PER_DAY), NOW), 35.0);
        assert_eq!(urgency_score(Some(NOW + 3 * MS_PER_DAY), NOW), 25.0);
        assert_eq!(urgency_score(Some(NOW + 7 * MS_PER_DAY), NOW), 15.0);
        assert_eq!(urgency_score(Some(NOW + 14 * MS_PER_DAY), NOW), 8.0);
        assert!((urgency_score(Some(NOW + 20 * MS_PER_DAY), NOW) - 3.0).abs() < 1e-9);
        assert_eq!(urgency_score(Some(NOW + 90 * MS_PER_DAY), NOW), 0.0);
    }

    #[test]
    fn default_task_scores_mid_range() {
        let breakdown = priority_score(&input(), NOW);
        // 5 urgency + 12 priority + (6 + 6 + 2.5) hierarchy + 15 deps
        assert!((breakdown.total - 46.5).abs() < 1e-9);
        assert_eq!(breakdown.age, 0.0);
    }

    #[test]
    fn blocked_dependencies_drop_to_two_points() {
        let mut blocked = input();
        blocked.dependencies_met = false;
        assert_eq!(priority_score(&blocked, NOW).dependency, 2.0);
    }

    #[test]
    fn age_bonus_starts_after_a_week_and_caps() {
        let mut task = input();
        task.created_at = NOW - 7 * MS_PER_DAY;
        assert_eq!(priority_score(&task, NOW).age, 0.0);
        task.created_at = NOW - 10 * MS_PER_DAY;
        assert!((priority_score(&task, NOW).age - 1.0).abs() < 1e-9);
        task.created_at = NOW - 100 * MS_PER_DAY;
        assert_eq!(priority_score(&task, NOW).age, 3.0);
    }

    #[test]
    fn total_is_capped() {
        let task = ScoreInput {
            priority: Priority::High,
            due_at: Some(NOW - MS_PER_DAY),
            created_at: NOW - 365 * MS_PER_DAY,
            area_importance: 5,
            project_importance: 5,
            pillar_weight: 2.0,
            dependencies_met: true,
        };
        // 40 + 20 + 25 + 15 + 3 = 103
        assert_eq!(priority_score(&task, NOW).total, MAX_SCORE);
    }
}
