//! Process configuration for the diary core.
//!
//! Values come from defaults, optionally overridden by environment variables.
//! Blank overrides are ignored.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "DIARY_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "DIARY_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "DIARY_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "users.db";
const DEFAULT_LOG_DIR_NAME: &str = "diary-logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiaryConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
}

impl Default for DiaryConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME),
        }
    }
}

impl DiaryConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        Self {
            db_path: non_blank(DB_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            log_level: non_blank(LOG_LEVEL_ENV).unwrap_or(defaults.log_level),
            log_dir: non_blank(LOG_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
        }
    }
}
