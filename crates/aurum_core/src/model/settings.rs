//! Single-row user settings.

use serde::{Deserialize, Serialize};

/// Smallest accepted monthly alignment goal.
pub const MIN_MONTHLY_GOAL: u32 = 1;
/// Largest accepted monthly alignment goal.
pub const MAX_MONTHLY_GOAL: u32 = 100_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub display_name: Option<String>,
    pub monthly_alignment_goal: Option<u32>,
    pub onboarding_completed: bool,
    /// Epoch ms of the last save; 0 when never saved.
    pub updated_at: i64,
}
