//! Core types for the note editor.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::formatting::Selection;

pub type NoteId = i64;
pub type NotetypeId = i64;
pub type CardId = i64;

/// Field definition within a notetype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(default)]
    pub sticky: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sticky: false,
        }
    }
}

/// Card template definition within a notetype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDef {
    pub name: String,
}

impl TemplateDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Notetype (schema) describing a note's fields and the cards generated from it.
///
/// Field and template order defines their ordinals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notetype {
    pub id: NotetypeId,
    pub name: String,
    #[serde(default)]
    pub is_cloze: bool,
    pub fields: Vec<FieldDef>,
    pub templates: Vec<TemplateDef>,
}

impl Notetype {
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Ordinals of fields currently marked sticky.
    pub fn sticky_ordinals(&self) -> impl Iterator<Item = usize> + '_ {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.sticky)
            .map(|(ord, _)| ord)
    }

    pub fn summary(&self) -> NotetypeSummary {
        NotetypeSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Notetype id and name, as enumerated by the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotetypeSummary {
    pub id: NotetypeId,
    pub name: String,
}

/// A note: ordered field contents plus tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Absent until the note has been added to the collection.
    pub id: Option<NoteId>,
    pub notetype_id: NotetypeId,
    pub fields: Vec<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl Note {
    /// Create a blank, unsaved note shaped for the given notetype.
    pub fn blank(notetype: &Notetype) -> Self {
        Self {
            id: None,
            notetype_id: notetype.id,
            fields: vec![String::new(); notetype.field_count()],
            tags: BTreeSet::new(),
            modified: None,
        }
    }

    /// Tags joined by single spaces, in sorted order.
    pub fn tag_string(&self) -> String {
        self.tags.iter().cloned().collect::<Vec<_>>().join(" ")
    }
}

/// Editable state of one field of the loaded notetype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditableField {
    pub ordinal: usize,
    pub label: String,
    pub content: String,
    pub selection: Selection,
    pub sticky: bool,
    pub focused: bool,
}

impl EditableField {
    /// Build the editable field list for a notetype from note contents.
    ///
    /// Missing contents become empty strings; extra contents are ignored.
    pub fn build_all(notetype: &Notetype, contents: &[String]) -> Vec<EditableField> {
        notetype
            .fields
            .iter()
            .enumerate()
            .map(|(ordinal, def)| {
                let content = contents.get(ordinal).cloned().unwrap_or_default();
                EditableField {
                    ordinal,
                    label: def.name.clone(),
                    selection: Selection::caret(content.chars().count()),
                    content,
                    sticky: def.sticky,
                    focused: false,
                }
            })
            .collect()
    }

    /// Replace the content and move the caret to its end.
    pub fn set_content(&mut self, content: String) {
        self.selection = Selection::caret(content.chars().count());
        self.content = content;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic() -> Notetype {
        Notetype {
            id: 1,
            name: "Basic".to_string(),
            is_cloze: false,
            fields: vec![FieldDef::new("Front"), FieldDef::new("Back")],
            templates: vec![TemplateDef::new("Card 1")],
        }
    }

    #[test]
    fn blank_note_matches_field_count() {
        let note = Note::blank(&basic());
        assert_eq!(note.fields, vec![String::new(), String::new()]);
        assert_eq!(note.id, None);
        assert_eq!(note.notetype_id, 1);
    }

    #[test]
    fn tag_string_is_sorted() {
        let mut note = Note::blank(&basic());
        note.tags.insert("verbs".to_string());
        note.tags.insert("spanish".to_string());
        assert_eq!(note.tag_string(), "spanish verbs");
    }

    #[test]
    fn sticky_ordinals_lists_flagged_fields() {
        let mut nt = basic();
        nt.fields[1].sticky = true;
        assert_eq!(nt.sticky_ordinals().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn build_all_pads_missing_contents() {
        let mut nt = basic();
        nt.fields[0].sticky = true;
        let fields = EditableField::build_all(&nt, &["héllo".to_string()]);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].label, "Front");
        assert!(fields[0].sticky);
        assert_eq!(fields[0].selection, Selection::caret(5));
        assert_eq!(fields[1].content, "");
    }
}
