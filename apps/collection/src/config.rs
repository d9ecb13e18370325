//! Store configuration.

use std::path::{Path, PathBuf};

/// Environment variable overriding the database location.
pub const DB_PATH_ENV: &str = "NOTE_EDITOR_DB";

/// Where the collection database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl StoreConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Read `NOTE_EDITOR_DB` (after loading `.env`), falling back to the
    /// platform data directory.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_value(std::env::var(DB_PATH_ENV).ok())
    }

    fn from_value(value: Option<String>) -> Self {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(path) => Self::new(path),
            None => Self::default(),
        }
    }

    /// Create the directory holding the database if it does not exist.
    pub fn ensure_parent_dir(&self) -> std::io::Result<()> {
        match self.db_path.parent() {
            Some(parent) if parent != Path::new("") => std::fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("note-editor")
        .join("collection.db")
}
