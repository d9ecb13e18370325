//! Test fixtures and factory functions for creating test data.

use note_editor_core::{FieldDef, Note, Notetype, NotetypeId, TemplateDef};

/// Build an unsaved notetype; the collection assigns the id.
pub fn notetype(name: &str, fields: &[&str], templates: &[&str]) -> Notetype {
    Notetype {
        id: 0,
        name: name.to_string(),
        is_cloze: false,
        fields: fields.iter().map(|f| FieldDef::new(*f)).collect(),
        templates: templates.iter().map(|t| TemplateDef::new(*t)).collect(),
    }
}

pub fn basic() -> Notetype {
    notetype("Basic", &["Front", "Back"], &["Card 1"])
}

pub fn reversed() -> Notetype {
    notetype("Basic (and reversed card)", &["Front", "Back"], &["Card 1", "Card 2"])
}

pub fn cloze() -> Notetype {
    let mut notetype = notetype("Cloze", &["Text", "Back Extra"], &["Cloze"]);
    notetype.is_cloze = true;
    notetype
}

pub fn single_field() -> Notetype {
    notetype("Single", &["Only"], &["Card 1"])
}

/// Unsaved note with the given field contents.
pub fn note(notetype_id: NotetypeId, fields: &[&str]) -> Note {
    Note {
        id: None,
        notetype_id,
        fields: fields.iter().map(|f| f.to_string()).collect(),
        tags: Default::default(),
        modified: None,
    }
}
