//! Alignment score dashboard.
//!
//! Points are written by the task service on completion; this service only
//! aggregates them against the monthly goal stored in settings.

use crate::analytics::alignment::monthly_progress;
use crate::repo::alignment_repo::AlignmentRepository;
use crate::repo::settings_repo::SettingsRepository;
use crate::repo::RepoResult;
use crate::time::{start_of_month, MS_PER_DAY};
use serde::Serialize;

const ROLLING_WEEK_MS: i64 = 7 * MS_PER_DAY;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlignmentDashboard {
    /// Points earned over the last 7 days.
    pub rolling_weekly_score: u64,
    /// Points earned since the first day of the current UTC month.
    pub monthly_score: u64,
    pub monthly_goal: Option<u32>,
    /// `monthly_score / goal` in percent, capped at 100.
    pub progress_percentage: f64,
    pub has_goal_set: bool,
    pub completed_tasks_scored: u64,
}

pub struct AlignmentService<A: AlignmentRepository, S: SettingsRepository> {
    alignment: A,
    settings: S,
}

impl<A: AlignmentRepository, S: SettingsRepository> AlignmentService<A, S> {
    pub fn new(alignment: A, settings: S) -> Self {
        Self {
            alignment,
            settings,
        }
    }

    pub fn dashboard(&self, now: i64) -> RepoResult<AlignmentDashboard> {
        let goal = self.settings.load_settings()?.monthly_alignment_goal;
        let monthly_score = self.alignment.sum_points_since(start_of_month(now))?;
        Ok(AlignmentDashboard {
            rolling_weekly_score: self.alignment.sum_points_since(now - ROLLING_WEEK_MS)?,
            monthly_score,
            monthly_goal: goal,
            progress_percentage: monthly_progress(monthly_score, goal),
            has_goal_set: goal.is_some(),
            completed_tasks_scored: self.alignment.count_records()?,
        })
    }
}
