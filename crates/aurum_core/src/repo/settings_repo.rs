//! Single-row settings persistence.

use crate::model::settings::Settings;
use crate::repo::{bool_to_int, ensure_connection_ready, parse_bool, parse_u32, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

pub trait SettingsRepository {
    /// Returns stored settings, or defaults when nothing was saved yet.
    fn load_settings(&self) -> RepoResult<Settings>;
    fn save_settings(&self, settings: &Settings) -> RepoResult<()>;
}

pub struct SqliteSettingsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettingsRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn load_settings(&self) -> RepoResult<Settings> {
        let row = self
            .conn
            .query_row(
                "SELECT
                    display_name,
                    monthly_alignment_goal,
                    onboarding_completed,
                    updated_at
                 FROM user_settings
                 WHERE id = 1;",
                [],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((display_name, goal, onboarding, updated_at)) = row else {
            return Ok(Settings::default());
        };
        Ok(Settings {
            display_name,
            monthly_alignment_goal: goal
                .map(|value| parse_u32(value, "user_settings.monthly_alignment_goal"))
                .transpose()?,
            onboarding_completed: parse_bool(onboarding, "user_settings.onboarding_completed")?,
            updated_at,
        })
    }

    fn save_settings(&self, settings: &Settings) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO user_settings (
                id,
                display_name,
                monthly_alignment_goal,
                onboarding_completed,
                updated_at
            ) VALUES (1, ?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                monthly_alignment_goal = excluded.monthly_alignment_goal,
                onboarding_completed = excluded.onboarding_completed,
                updated_at = excluded.updated_at;",
            params![
                settings.display_name.as_deref(),
                settings.monthly_alignment_goal.map(i64::from),
                bool_to_int(settings.onboarding_completed),
                settings.updated_at,
            ],
        )?;
        Ok(())
    }
}
