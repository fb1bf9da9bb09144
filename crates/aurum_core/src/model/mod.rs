//! Domain model for the life-alignment hierarchy, journal and notifications.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own input normalization so every write path applies the same rules.
//!
//! # Invariants
//! - Every domain object is identified by a stable UUID.
//! - Deletion is represented by soft-delete tombstones unless purged
//!   explicitly from the journal trash.

pub mod hierarchy;
pub mod journal;
pub mod notification;
pub mod settings;
pub mod validate;
