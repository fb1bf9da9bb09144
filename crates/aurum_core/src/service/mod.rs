//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep the CLI decoupled from storage details.
//!
//! # Invariants
//! - Services own no connection; callers build them from repositories
//!   borrowed from an explicitly opened store.
//! - Time-dependent operations take `now` (epoch ms) from the caller.

pub mod alignment_service;
pub mod hierarchy_service;
pub mod insights_service;
pub mod journal_service;
pub mod notification_service;
pub mod settings_service;
pub mod task_service;
