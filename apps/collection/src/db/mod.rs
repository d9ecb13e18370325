//! Local SQLite note collection.

pub mod error;
pub mod repository;
pub mod schema;

pub use error::DbError;
pub use repository::{
    CardInfo, CardRepository, NotetypeRepository, SettingsRepository, SqliteCollection,
    ToolbarRepository,
};
