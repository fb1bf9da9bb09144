//! Alignment score ledger.
//!
//! # Invariants
//! - At most one score row exists per task; repeated inserts are ignored.

use crate::model::hierarchy::TaskId;
use crate::repo::{ensure_connection_ready, parse_uuid, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

/// Points recorded for one completed task, with the bonus breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlignmentRecord {
    pub id: Uuid,
    pub task_id: TaskId,
    pub points_earned: u32,
    pub base_points: u32,
    pub task_priority_bonus: u32,
    pub project_priority_bonus: u32,
    pub area_importance_bonus: u32,
    pub created_at: i64,
}

pub trait AlignmentRepository {
    /// Inserts the record unless the task already has one. Returns whether a
    /// row was written.
    fn insert_record(&self, record: &AlignmentRecord) -> RepoResult<bool>;
    fn record_for_task(&self, task_id: TaskId) -> RepoResult<Option<AlignmentRecord>>;
    fn sum_points_since(&self, since: i64) -> RepoResult<u64>;
    fn count_records(&self) -> RepoResult<u64>;
}

pub struct SqliteAlignmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAlignmentRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AlignmentRepository for SqliteAlignmentRepository<'_> {
    fn insert_record(&self, record: &AlignmentRecord) -> RepoResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO alignment_scores (
                id,
                task_id,
                points_earned,
                base_points,
                task_priority_bonus,
                project_priority_bonus,
                area_importance_bonus,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                record.id.to_string(),
                record.task_id.to_string(),
                i64::from(record.points_earned),
                i64::from(record.base_points),
                i64::from(record.task_priority_bonus),
                i64::from(record.project_priority_bonus),
                i64::from(record.area_importance_bonus),
                record.created_at,
            ],
        )?;
        Ok(inserted == 1)
    }

    fn record_for_task(&self, task_id: TaskId) -> RepoResult<Option<AlignmentRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT
                    id,
                    points_earned,
                    base_points,
                    task_priority_bonus,
                    project_priority_bonus,
                    area_importance_bonus,
                    created_at
                 FROM alignment_scores
                 WHERE task_id = ?1;",
                [task_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, u32>(4)?,
                        row.get::<_, u32>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, points, base, task_bonus, project_bonus, area_bonus, created_at)) = row
        else {
            return Ok(None);
        };
        Ok(Some(AlignmentRecord {
            id: parse_uuid(&id, "alignment_scores.id")?,
            task_id,
            points_earned: points,
            base_points: base,
            task_priority_bonus: task_bonus,
            project_priority_bonus: project_bonus,
            area_importance_bonus: area_bonus,
            created_at,
        }))
    }

    fn sum_points_since(&self, since: i64) -> RepoResult<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(s.points_earned), 0)
             FROM alignment_scores s
             INNER JOIN tasks t ON t.id = s.task_id
             WHERE s.created_at >= ?1
               AND t.is_deleted = 0;",
            params![since],
            |row| row.get(0),
        )?;
        Ok(total.max(0) as u64)
    }

    fn count_records(&self) -> RepoResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM alignment_scores;", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}
