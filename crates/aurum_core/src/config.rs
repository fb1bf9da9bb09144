//! Application configuration loaded from TOML.
//!
//! Lookup order: an explicit path, then `~/.config/aurum/config.toml`, then
//! the platform config dir. A missing file yields defaults; a malformed file
//! is an error. Relative `db_path`/`log_dir` values resolve against the
//! current working directory.

use crate::logging::default_log_level;
use directories::BaseDirs;
use serde::Deserialize;
use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "aurum";
const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "aurum.sqlite3";

pub const DEFAULT_TODAY_LIMIT: u32 = 50;
pub const DEFAULT_REMINDER_POLL_BATCH: u32 = 100;
pub const DEFAULT_EMAIL_COOLDOWN_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    /// Maximum tasks returned by the Today view.
    pub today_limit: u32,
    /// Maximum reminders handled per processing pass.
    pub reminder_poll_batch: u32,
    /// Cooldown after a failed email delivery.
    pub email_cooldown_secs: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    db_path: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    log_level: Option<String>,
    today_limit: Option<u32>,
    reminder_poll_batch: Option<u32>,
    email_cooldown_secs: Option<u64>,
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, message: String },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => write!(f, "reading {}: {source}", path.display()),
            Self::Parse { path, message } => write!(f, "parsing {}: {message}", path.display()),
            Self::Invalid(message) => write!(f, "invalid configuration: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            db_path: data_dir.join(DB_FILE_NAME),
            log_dir: data_dir.join("logs"),
            log_level: default_log_level().to_string(),
            today_limit: DEFAULT_TODAY_LIMIT,
            reminder_poll_batch: DEFAULT_REMINDER_POLL_BATCH,
            email_cooldown_secs: DEFAULT_EMAIL_COOLDOWN_SECS,
        }
    }
}

impl AppConfig {
    /// Loads from `explicit` when given, otherwise from the first existing
    /// default location.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                for path in config_file_paths() {
                    if path.exists() {
                        return Self::from_file(&path);
                    }
                }
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|err| match err {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parses TOML text and applies defaults for missing keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(text).map_err(|err| ConfigError::Parse {
            path: PathBuf::new(),
            message: err.to_string(),
        })?;
        let defaults = Self::default();
        let config = Self {
            db_path: match file.db_path {
                Some(path) => absolutize(path)?,
                None => defaults.db_path,
            },
            log_dir: match file.log_dir {
                Some(path) => absolutize(path)?,
                None => defaults.log_dir,
            },
            log_level: file.log_level.unwrap_or(defaults.log_level),
            today_limit: file.today_limit.unwrap_or(defaults.today_limit),
            reminder_poll_batch: file
                .reminder_poll_batch
                .unwrap_or(defaults.reminder_poll_batch),
            email_cooldown_secs: file
                .email_cooldown_secs
                .unwrap_or(defaults.email_cooldown_secs),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.today_limit == 0 {
            return Err(ConfigError::Invalid("today_limit must be positive".to_string()));
        }
        if self.reminder_poll_batch == 0 {
            return Err(ConfigError::Invalid(
                "reminder_poll_batch must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn email_cooldown_ms(&self) -> i64 {
        i64::try_from(self.email_cooldown_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

/// Candidate config files, most specific first.
pub fn config_file_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(base) = BaseDirs::new() {
        paths.push(
            base.home_dir()
                .join(".config")
                .join(APP_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        );
        let native = base.config_dir().join(APP_DIR_NAME).join(CONFIG_FILE_NAME);
        if !paths.contains(&native) {
            paths.push(native);
        }
    }
    paths
}

/// `{data_dir}/aurum`; without a home directory, `aurum` under the working
/// directory (or the temp dir when that is unknown).
fn default_data_dir() -> PathBuf {
    match BaseDirs::new() {
        Some(base) => base.data_dir().join(APP_DIR_NAME),
        None => env::current_dir()
            .unwrap_or_else(|_| env::temp_dir())
            .join(APP_DIR_NAME),
    }
}

fn absolutize(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = env::current_dir().map_err(|err| {
        ConfigError::Invalid(format!(
            "cannot resolve relative path `{}`: {err}",
            path.display()
        ))
    })?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.today_limit, 50);
        assert_eq!(config.reminder_poll_batch, 100);
        assert_eq!(config.email_cooldown_ms(), 300_000);
    }

    #[test]
    fn keys_override_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            db_path = "/tmp/aurum/test.sqlite3"
            log_level = "warn"
            today_limit = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/aurum/test.sqlite3"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.today_limit, 10);
        assert_eq!(config.reminder_poll_batch, DEFAULT_REMINDER_POLL_BATCH);
    }

    #[test]
    fn relative_paths_resolve_against_working_dir() {
        let config = AppConfig::from_toml_str(
            r#"
            db_path = "data/aurum.sqlite3"
            log_dir = "logs"
            "#,
        )
        .unwrap();
        let cwd = env::current_dir().unwrap();
        assert_eq!(config.db_path, cwd.join("data").join("aurum.sqlite3"));
        assert_eq!(config.log_dir, cwd.join("logs"));
        assert!(AppConfig::default().log_dir.is_absolute());
    }

    #[test]
    fn malformed_or_unknown_keys_fail() {
        assert!(matches!(
            AppConfig::from_toml_str("today_limit = \"many\""),
            Err(ConfigError::Parse { .. })
        ));
        assert!(AppConfig::from_toml_str("colour = \"red\"").is_err());
        assert!(matches!(
            AppConfig::from_toml_str("today_limit = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn candidates_prioritize_xdg_then_native() {
        if let Some(base) = BaseDirs::new() {
            let paths = config_file_paths();
            assert_eq!(
                paths.first(),
                Some(&base.home_dir().join(".config").join("aurum").join("config.toml"))
            );
        }
    }
}
