//! Error types for note-editor-core.

use thiserror::Error;

use crate::session::SessionPhase;

/// Result type alias using EditorError.
pub type Result<T> = std::result::Result<T, EditorError>;

/// Errors raised by editing operations.
///
/// Pure helpers (formatting, cloze numbering, toolbar decoding) never return
/// these for malformed input they are meant to tolerate; only lookups and
/// caller contract violations fail.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("notetype not found: {0}")]
    NotetypeNotFound(i64),

    #[error("collection has no notetypes")]
    NoNotetypes,

    #[error("note not found: {0}")]
    NoteNotFound(i64),

    #[error("card not found: {0}")]
    CardNotFound(i64),

    #[error("field ordinal {ordinal} out of range (notetype has {len} fields)")]
    OrdinalOutOfRange { ordinal: usize, len: usize },

    #[error("toolbar button not found: {0}")]
    ToolbarButtonNotFound(usize),

    #[error("cannot {action} while session is {phase:?}")]
    InvalidPhase {
        action: &'static str,
        phase: SessionPhase,
    },

    #[error("no notetype change is awaiting confirmation")]
    NoPendingChange,

    #[error("session state error: {0}")]
    Session(#[from] serde_json::Error),

    #[error("collection error: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_found() {
        assert_eq!(
            EditorError::NotetypeNotFound(7).to_string(),
            "notetype not found: 7"
        );
        assert_eq!(EditorError::NoteNotFound(3).to_string(), "note not found: 3");
    }

    #[test]
    fn display_invalid_phase() {
        let error = EditorError::InvalidPhase {
            action: "edit field",
            phase: SessionPhase::Saving,
        };
        assert_eq!(error.to_string(), "cannot edit field while session is Saving");
    }

    #[test]
    fn display_ordinal_out_of_range() {
        let error = EditorError::OrdinalOutOfRange { ordinal: 4, len: 2 };
        assert_eq!(
            error.to_string(),
            "field ordinal 4 out of range (notetype has 2 fields)"
        );
    }
}
