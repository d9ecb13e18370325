//! Interface to the collection that stores notes and notetypes.
//!
//! The engine never touches storage directly. Everything it needs from the
//! outside world goes through [`CollectionStore`].

use serde::{Deserialize, Serialize};

use crate::cloze::cloze_numbers;
use crate::error::Result;
use crate::remap::RemapTable;
use crate::types::{CardId, Note, NoteId, Notetype, NotetypeId, NotetypeSummary};

/// Outcome of validating a note's fields before saving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum FieldsCheck {
    Ok,
    /// Bypassable: the caller may offer a forced save.
    FirstFieldEmpty,
    /// Bypassable, but the message must be shown verbatim.
    NotetypeSpecific(String),
}

impl FieldsCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Ok => None,
            Self::FirstFieldEmpty => Some("The first field is empty."),
            Self::NotetypeSpecific(message) => Some(message.as_str()),
        }
    }
}

/// Message reported for a cloze note without any cloze deletion.
pub const MISSING_CLOZE_MESSAGE: &str = "cloze note has no cloze deletions";

/// Checks that need nothing but the note and its notetype.
///
/// Stores with more context (duplicate detection) build on top of this.
pub fn check_note_fields(notetype: &Notetype, note: &Note) -> FieldsCheck {
    let first = note.fields.first().map(String::as_str).unwrap_or_default();
    if first.replace("&nbsp;", " ").trim().is_empty() {
        return FieldsCheck::FirstFieldEmpty;
    }
    if notetype.is_cloze && cloze_numbers(&note.fields).is_empty() {
        return FieldsCheck::NotetypeSpecific(MISSING_CLOZE_MESSAGE.to_string());
    }
    FieldsCheck::Ok
}

/// Storage collaborator used by the editor.
pub trait CollectionStore {
    fn get_notetype(&self, id: NotetypeId) -> Result<Option<Notetype>>;
    fn all_notetypes(&self) -> Result<Vec<NotetypeSummary>>;
    fn get_note(&self, id: NoteId) -> Result<Option<Note>>;
    fn note_for_card(&self, card_id: CardId) -> Result<Option<Note>>;
    fn fields_check(&self, note: &Note) -> Result<FieldsCheck>;
    /// Ordinals of the cards a stored note currently has, ascending.
    fn card_ordinals(&self, note_id: NoteId) -> Result<Vec<usize>>;

    /// Add a new note and generate its cards. Returns the assigned id.
    fn add_note(&mut self, note: &Note) -> Result<NoteId>;
    fn update_note(&mut self, note: &Note) -> Result<()>;

    /// Rewrite `note` from `old` to `new` using precomputed maps.
    fn apply_remap(
        &mut self,
        note: &Note,
        old: &Notetype,
        new: &Notetype,
        field_map: &RemapTable,
        card_map: &RemapTable,
    ) -> Result<()>;

    /// Persist the sticky flag of one field definition.
    fn set_field_sticky(
        &mut self,
        notetype_id: NotetypeId,
        ordinal: usize,
        sticky: bool,
    ) -> Result<()>;
}
