//! Database error types.

use note_editor_core::EditorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("notetype not found: {0}")]
    NotetypeNotFound(i64),

    #[error("note not found: {0}")]
    NoteNotFound(i64),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl From<DbError> for EditorError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotetypeNotFound(id) => EditorError::NotetypeNotFound(id),
            DbError::NoteNotFound(id) => EditorError::NoteNotFound(id),
            other => EditorError::Store(other.to_string()),
        }
    }
}
