//! SQLite note collection and async host for the note editor.

pub mod config;
pub mod db;
pub mod host;
pub mod logging;

pub use config::StoreConfig;
pub use db::{
    CardInfo, CardRepository, DbError, NotetypeRepository, SettingsRepository, SqliteCollection,
    ToolbarRepository,
};
pub use host::{EditorHost, HostError};
pub use logging::init_tracing;
