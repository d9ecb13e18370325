//! Repository pattern for database access.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use note_editor_core::{
    check_note_fields, cloze_numbers, CardId, CollectionStore, EditorSettings, FieldDef,
    FieldsCheck, Note, NoteId, Notetype, NotetypeId, NotetypeSummary, RemapTable, TemplateDef,
    ToolbarButtons,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::db::error::DbError;

type Result<T> = std::result::Result<T, DbError>;

/// Message reported when another note of the notetype has the same first field.
pub const DUPLICATE_MESSAGE: &str = "duplicate note";

/// Repository for notetype definitions.
pub trait NotetypeRepository {
    /// Store a notetype with its fields and templates. A non-positive id lets
    /// the database assign one. Returns the stored id.
    fn add_notetype(&mut self, notetype: &Notetype) -> Result<NotetypeId>;
}

/// Repository for editor settings.
pub trait SettingsRepository {
    fn get_editor_settings(&self) -> Result<EditorSettings>;
    fn save_editor_settings(&self, settings: &EditorSettings) -> Result<()>;
}

/// Repository for custom toolbar buttons.
pub trait ToolbarRepository {
    fn load_toolbar_buttons(&self) -> Result<ToolbarButtons>;
    /// Replace the stored set with `encoded`.
    fn save_toolbar_buttons(&mut self, encoded: &BTreeSet<String>) -> Result<()>;
}

/// Repository for generated cards.
pub trait CardRepository {
    fn cards_of_note(&self, note_id: NoteId) -> Result<Vec<CardInfo>>;
}

/// A generated card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardInfo {
    pub id: CardId,
    pub note_id: NoteId,
    pub ord: usize,
}

/// SQLite implementation of the collection.
pub struct SqliteCollection {
    conn: Connection,
}

impl SqliteCollection {
    /// Open database at path, creating if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let collection = Self { conn };
        collection.initialize()?;
        Ok(collection)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let collection = Self { conn };
        collection.initialize()?;
        Ok(collection)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(super::schema::SCHEMA)?;
        self.conn.execute_batch(super::schema::INIT_EDITOR_SETTINGS)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            params![super::schema::SCHEMA_VERSION],
        )?;
        Ok(())
    }

    fn check_fields(&self, note: &Note) -> Result<FieldsCheck> {
        let notetype = read_notetype(&self.conn, note.notetype_id)?
            .ok_or(DbError::NotetypeNotFound(note.notetype_id))?;
        let check = check_note_fields(&notetype, note);
        if !check.is_ok() {
            return Ok(check);
        }

        let duplicate: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE notetype_id = ?1 AND sort_field = ?2 AND id IS NOT ?3)",
            params![note.notetype_id, sort_field(note), note.id],
            |row| row.get(0),
        )?;
        if duplicate {
            return Ok(FieldsCheck::NotetypeSpecific(DUPLICATE_MESSAGE.to_string()));
        }
        Ok(FieldsCheck::Ok)
    }

    fn insert_note(&mut self, note: &Note) -> Result<NoteId> {
        let notetype = read_notetype(&self.conn, note.notetype_id)?
            .ok_or(DbError::NotetypeNotFound(note.notetype_id))?;
        ensure_field_count(&notetype, note)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO notes (notetype_id, fields, tags, sort_field, modified_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                note.notetype_id,
                serde_json::to_string(&note.fields)?,
                note.tag_string(),
                sort_field(note),
                Utc::now().to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        let cards = generate_missing_cards(&tx, id, &notetype, &note.fields)?;
        tx.commit()?;

        tracing::debug!(note = id, cards, "inserted note");
        Ok(id)
    }

    fn write_note(&mut self, note: &Note) -> Result<()> {
        let id = note
            .id
            .ok_or_else(|| DbError::InvalidData("cannot update a note without id".into()))?;
        let notetype = read_notetype(&self.conn, note.notetype_id)?
            .ok_or(DbError::NotetypeNotFound(note.notetype_id))?;
        ensure_field_count(&notetype, note)?;

        let tx = self.conn.transaction()?;
        let stored: Option<NotetypeId> = tx
            .query_row(
                "SELECT notetype_id FROM notes WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match stored {
            None => return Err(DbError::NoteNotFound(id)),
            Some(stored) if stored != note.notetype_id => {
                return Err(DbError::InvalidData(format!(
                    "note {} belongs to notetype {}, not {}",
                    id, stored, note.notetype_id
                )));
            }
            Some(_) => {}
        }

        tx.execute(
            "UPDATE notes SET fields = ?1, tags = ?2, sort_field = ?3, modified_at = ?4 WHERE id = ?5",
            params![
                serde_json::to_string(&note.fields)?,
                note.tag_string(),
                sort_field(note),
                Utc::now().to_rfc3339(),
                id,
            ],
        )?;
        generate_missing_cards(&tx, id, &notetype, &note.fields)?;
        tx.commit()?;
        Ok(())
    }

    fn remap_note(
        &mut self,
        note: &Note,
        old: &Notetype,
        new: &Notetype,
        field_map: &RemapTable,
        card_map: &RemapTable,
    ) -> Result<()> {
        let id = note
            .id
            .ok_or_else(|| DbError::InvalidData("cannot remap a note without id".into()))?;
        let fields = field_map.remap_values(&note.fields, new.field_count());

        let tx = self.conn.transaction()?;
        let stored: Option<NotetypeId> = tx
            .query_row(
                "SELECT notetype_id FROM notes WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match stored {
            None => return Err(DbError::NoteNotFound(id)),
            Some(stored) if stored != old.id => {
                return Err(DbError::InvalidData(format!(
                    "note {} belongs to notetype {}, not {}",
                    id, stored, old.id
                )));
            }
            Some(_) => {}
        }

        tx.execute(
            "UPDATE notes SET notetype_id = ?1, fields = ?2, sort_field = ?3, modified_at = ?4 WHERE id = ?5",
            params![
                new.id,
                serde_json::to_string(&fields)?,
                fields.first().map(|f| normalize_sort_field(f)).unwrap_or_default(),
                Utc::now().to_rfc3339(),
                id,
            ],
        )?;

        // cloze cards are numbered by content, not by template
        if !(old.is_cloze && new.is_cloze) {
            let cards: Vec<(CardId, i64)> = {
                let mut stmt = tx.prepare("SELECT id, ord FROM cards WHERE note_id = ?1")?;
                let rows = stmt.query_map(params![id], |row| Ok((row.get(0)?, row.get(1)?)))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };
            let uncovered = cards
                .iter()
                .find(|(_, ord)| *ord as usize >= card_map.len());
            if let Some((_, ord)) = uncovered {
                return Err(DbError::InvalidData(format!(
                    "card ord {} of note {} is not covered by the card map",
                    ord, id
                )));
            }
            let mut removed = 0;
            for (card_id, ord) in cards {
                match card_map.get(ord as usize) {
                    // park at a negative ord so moves cannot collide
                    Some(new_ord) => tx.execute(
                        "UPDATE cards SET ord = ?1 WHERE id = ?2",
                        params![-1 - new_ord as i64, card_id],
                    )?,
                    None => {
                        removed += 1;
                        tx.execute("DELETE FROM cards WHERE id = ?1", params![card_id])?
                    }
                };
            }
            tx.execute(
                "UPDATE cards SET ord = -1 - ord WHERE note_id = ?1 AND ord < 0",
                params![id],
            )?;
            tracing::debug!(note = id, removed, "remapped cards");
        }

        let generated = generate_missing_cards(&tx, id, new, &fields)?;
        tx.commit()?;

        tracing::info!(
            note = id,
            from = old.id,
            to = new.id,
            generated,
            "applied notetype change"
        );
        Ok(())
    }

    fn set_sticky(&mut self, notetype_id: NotetypeId, ordinal: usize, sticky: bool) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE notetype_fields SET sticky = ?1 WHERE notetype_id = ?2 AND ord = ?3",
            params![sticky, notetype_id, ordinal as i64],
        )?;
        if changed == 0 {
            if read_notetype(&self.conn, notetype_id)?.is_none() {
                return Err(DbError::NotetypeNotFound(notetype_id));
            }
            return Err(DbError::InvalidData(format!(
                "notetype {} has no field {}",
                notetype_id, ordinal
            )));
        }
        Ok(())
    }
}

impl NotetypeRepository for SqliteCollection {
    fn add_notetype(&mut self, notetype: &Notetype) -> Result<NotetypeId> {
        if notetype.fields.is_empty() {
            return Err(DbError::InvalidData(format!(
                "notetype {} has no fields",
                notetype.name
            )));
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO notetypes (id, name, is_cloze) VALUES (?1, ?2, ?3)",
            params![
                (notetype.id > 0).then_some(notetype.id),
                notetype.name,
                notetype.is_cloze
            ],
        )?;
        let id = tx.last_insert_rowid();

        for (ord, field) in notetype.fields.iter().enumerate() {
            tx.execute(
                "INSERT INTO notetype_fields (notetype_id, ord, name, sticky) VALUES (?1, ?2, ?3, ?4)",
                params![id, ord as i64, field.name, field.sticky],
            )?;
        }
        for (ord, template) in notetype.templates.iter().enumerate() {
            tx.execute(
                "INSERT INTO notetype_templates (notetype_id, ord, name) VALUES (?1, ?2, ?3)",
                params![id, ord as i64, template.name],
            )?;
        }
        tx.commit()?;

        tracing::debug!(notetype = id, name = %notetype.name, "added notetype");
        Ok(id)
    }
}

impl SettingsRepository for SqliteCollection {
    fn get_editor_settings(&self) -> Result<EditorSettings> {
        self.conn
            .query_row(
                "SELECT replace_newlines, last_notetype_id FROM editor_settings WHERE id = 1",
                [],
                |row| {
                    Ok(EditorSettings {
                        replace_newlines: row.get(0)?,
                        last_notetype_id: row.get(1)?,
                    })
                },
            )
            .map_err(Into::into)
    }

    fn save_editor_settings(&self, settings: &EditorSettings) -> Result<()> {
        self.conn.execute(
            "UPDATE editor_settings SET replace_newlines = ?1, last_notetype_id = ?2 WHERE id = 1",
            params![settings.replace_newlines, settings.last_notetype_id],
        )?;
        Ok(())
    }
}

impl ToolbarRepository for SqliteCollection {
    fn load_toolbar_buttons(&self) -> Result<ToolbarButtons> {
        let mut stmt = self
            .conn
            .prepare("SELECT encoded FROM toolbar_buttons ORDER BY encoded")?;
        let encoded = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ToolbarButtons::from_encoded(encoded))
    }

    fn save_toolbar_buttons(&mut self, encoded: &BTreeSet<String>) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM toolbar_buttons", [])?;
        for button in encoded {
            tx.execute(
                "INSERT INTO toolbar_buttons (encoded) VALUES (?1)",
                params![button],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl CardRepository for SqliteCollection {
    fn cards_of_note(&self, note_id: NoteId) -> Result<Vec<CardInfo>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, note_id, ord FROM cards WHERE note_id = ?1 ORDER BY ord")?;
        let cards = stmt
            .query_map(params![note_id], |row| {
                Ok(CardInfo {
                    id: row.get(0)?,
                    note_id: row.get(1)?,
                    ord: row.get::<_, i64>(2)? as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }
}

impl CollectionStore for SqliteCollection {
    fn get_notetype(&self, id: NotetypeId) -> note_editor_core::Result<Option<Notetype>> {
        read_notetype(&self.conn, id).map_err(Into::into)
    }

    fn all_notetypes(&self) -> note_editor_core::Result<Vec<NotetypeSummary>> {
        list_notetypes(&self.conn).map_err(Into::into)
    }

    fn get_note(&self, id: NoteId) -> note_editor_core::Result<Option<Note>> {
        read_note(&self.conn, id).map_err(Into::into)
    }

    fn note_for_card(&self, card_id: CardId) -> note_editor_core::Result<Option<Note>> {
        let note_id: Option<NoteId> = self
            .conn
            .query_row(
                "SELECT note_id FROM cards WHERE id = ?1",
                params![card_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(DbError::from)?;
        match note_id {
            Some(note_id) => read_note(&self.conn, note_id).map_err(Into::into),
            None => Ok(None),
        }
    }

    fn fields_check(&self, note: &Note) -> note_editor_core::Result<FieldsCheck> {
        self.check_fields(note).map_err(Into::into)
    }

    fn card_ordinals(&self, note_id: NoteId) -> note_editor_core::Result<Vec<usize>> {
        let cards = self.cards_of_note(note_id)?;
        Ok(cards.into_iter().map(|card| card.ord).collect())
    }

    fn add_note(&mut self, note: &Note) -> note_editor_core::Result<NoteId> {
        self.insert_note(note).map_err(Into::into)
    }

    fn update_note(&mut self, note: &Note) -> note_editor_core::Result<()> {
        self.write_note(note).map_err(Into::into)
    }

    fn apply_remap(
        &mut self,
        note: &Note,
        old: &Notetype,
        new: &Notetype,
        field_map: &RemapTable,
        card_map: &RemapTable,
    ) -> note_editor_core::Result<()> {
        self.remap_note(note, old, new, field_map, card_map)
            .map_err(Into::into)
    }

    fn set_field_sticky(
        &mut self,
        notetype_id: NotetypeId,
        ordinal: usize,
        sticky: bool,
    ) -> note_editor_core::Result<()> {
        self.set_sticky(notetype_id, ordinal, sticky)
            .map_err(Into::into)
    }
}

fn read_notetype(conn: &Connection, id: NotetypeId) -> Result<Option<Notetype>> {
    let header: Option<(String, bool)> = conn
        .query_row(
            "SELECT name, is_cloze FROM notetypes WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((name, is_cloze)) = header else {
        return Ok(None);
    };

    let mut stmt =
        conn.prepare("SELECT name, sticky FROM notetype_fields WHERE notetype_id = ?1 ORDER BY ord")?;
    let fields = stmt
        .query_map(params![id], |row| {
            Ok(FieldDef {
                name: row.get(0)?,
                sticky: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt =
        conn.prepare("SELECT name FROM notetype_templates WHERE notetype_id = ?1 ORDER BY ord")?;
    let templates = stmt
        .query_map(params![id], |row| Ok(TemplateDef { name: row.get(0)? }))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Some(Notetype {
        id,
        name,
        is_cloze,
        fields,
        templates,
    }))
}

fn list_notetypes(conn: &Connection) -> Result<Vec<NotetypeSummary>> {
    let mut stmt = conn.prepare("SELECT id, name FROM notetypes ORDER BY id")?;
    let notetypes = stmt
        .query_map([], |row| {
            Ok(NotetypeSummary {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(notetypes)
}

fn read_note(conn: &Connection, id: NoteId) -> Result<Option<Note>> {
    let row: Option<(NotetypeId, String, String, String)> = conn
        .query_row(
            "SELECT notetype_id, fields, tags, modified_at FROM notes WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?;
    let Some((notetype_id, fields, tags, modified_at)) = row else {
        return Ok(None);
    };

    let modified = DateTime::parse_from_rfc3339(&modified_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::InvalidData(format!("note {} modified_at: {}", id, e)))?;

    Ok(Some(Note {
        id: Some(id),
        notetype_id,
        fields: serde_json::from_str(&fields)?,
        tags: tags.split_whitespace().map(str::to_string).collect(),
        modified: Some(modified),
    }))
}

fn ensure_field_count(notetype: &Notetype, note: &Note) -> Result<()> {
    if note.fields.len() != notetype.field_count() {
        return Err(DbError::InvalidData(format!(
            "notetype {} has {} fields, note has {}",
            notetype.id,
            notetype.field_count(),
            note.fields.len()
        )));
    }
    Ok(())
}

/// Insert cards the note should have but does not. Existing cards are kept.
fn generate_missing_cards(
    conn: &Connection,
    note_id: NoteId,
    notetype: &Notetype,
    fields: &[String],
) -> Result<usize> {
    let mut added = 0;
    for ord in required_card_ords(notetype, fields) {
        added += conn.execute(
            "INSERT OR IGNORE INTO cards (note_id, ord) VALUES (?1, ?2)",
            params![note_id, ord as i64],
        )?;
    }
    Ok(added)
}

/// Card ordinals a note needs: one per template, or one per cloze number.
/// Every note gets at least one card.
pub(crate) fn required_card_ords(notetype: &Notetype, fields: &[String]) -> Vec<usize> {
    if notetype.is_cloze {
        let ords: Vec<usize> = cloze_numbers(fields)
            .into_iter()
            .map(|n| n as usize - 1)
            .collect();
        if ords.is_empty() {
            vec![0]
        } else {
            ords
        }
    } else {
        (0..notetype.template_count().max(1)).collect()
    }
}

fn sort_field(note: &Note) -> String {
    note.fields
        .first()
        .map(|f| normalize_sort_field(f))
        .unwrap_or_default()
}

fn normalize_sort_field(field: &str) -> String {
    field.replace("&nbsp;", " ").trim().to_string()
}
