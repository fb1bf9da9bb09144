//! User settings use-cases.

use crate::model::settings::{Settings, MAX_MONTHLY_GOAL, MIN_MONTHLY_GOAL};
use crate::model::validate::{check_range, normalize_name, sanitize_text};
use crate::repo::settings_repo::SettingsRepository;
use crate::repo::RepoResult;

pub struct SettingsService<S: SettingsRepository> {
    repo: S,
}

impl<S: SettingsRepository> SettingsService<S> {
    pub fn new(repo: S) -> Self {
        Self { repo }
    }

    /// Stored settings, or defaults when never saved.
    pub fn get(&self) -> RepoResult<Settings> {
        self.repo.load_settings()
    }

    /// Sets the display name. Blank input clears it.
    pub fn set_display_name(&self, name: &str, now: i64) -> RepoResult<Settings> {
        let display_name = if sanitize_text(name).is_empty() {
            None
        } else {
            Some(normalize_name("display_name", name)?)
        };
        self.update(now, |settings| settings.display_name = display_name)
    }

    /// Sets the monthly alignment goal; `None` clears it.
    pub fn set_monthly_goal(&self, goal: Option<u32>, now: i64) -> RepoResult<Settings> {
        if let Some(goal) = goal {
            check_range(
                "monthly_alignment_goal",
                i64::from(goal),
                i64::from(MIN_MONTHLY_GOAL),
                i64::from(MAX_MONTHLY_GOAL),
            )?;
        }
        self.update(now, |settings| settings.monthly_alignment_goal = goal)
    }

    pub fn set_onboarding_completed(&self, completed: bool, now: i64) -> RepoResult<Settings> {
        self.update(now, |settings| settings.onboarding_completed = completed)
    }

    fn update(&self, now: i64, change: impl FnOnce(&mut Settings)) -> RepoResult<Settings> {
        let mut settings = self.repo.load_settings()?;
        change(&mut settings);
        settings.updated_at = now;
        self.repo.save_settings(&settings)?;
        Ok(settings)
    }
}
