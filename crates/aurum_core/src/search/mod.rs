//! Full-text search entry points.
//!
//! # Responsibility
//! - Expose journal query APIs backed by the SQLite FTS5 index.
//! - Keep match-expression escaping inside core.

pub mod fts;
