//! Core domain logic for Aurum Life.
//! This crate is the single source of truth for business invariants.

pub mod analytics;
pub mod breaker;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod time;

pub use breaker::{BreakerError, CooldownBreaker};
pub use config::{AppConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::hierarchy::{
    Area, AreaId, Pillar, PillarId, Priority, Project, ProjectId, ProjectStatus, Task, TaskId,
    TaskStatus,
};
pub use model::journal::{JournalEntry, JournalTemplate, Mood};
pub use model::validate::ValidationError;
pub use repo::alignment_repo::SqliteAlignmentRepository;
pub use repo::hierarchy_repo::{CascadeReport, ListOptions, Scope, SqliteHierarchyRepository};
pub use repo::journal_repo::SqliteJournalRepository;
pub use repo::notification_repo::SqliteNotificationRepository;
pub use repo::settings_repo::SqliteSettingsRepository;
pub use repo::task_repo::SqliteTaskRepository;
pub use repo::{RepoError, RepoResult};
pub use search::fts::{SearchError, SearchHit, SearchQuery, SearchResult};
pub use service::alignment_service::AlignmentService;
pub use service::hierarchy_service::HierarchyService;
pub use service::insights_service::InsightsService;
pub use service::journal_service::JournalService;
pub use service::notification_service::{EmailSender, LogEmailSender, NotificationService};
pub use service::settings_service::SettingsService;
pub use service::task_service::TaskService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
