//! SQLite schema definitions.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema for the note collection.
pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- Notetypes and their ordered field/template definitions
CREATE TABLE IF NOT EXISTS notetypes (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    is_cloze INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS notetype_fields (
    notetype_id INTEGER NOT NULL REFERENCES notetypes(id) ON DELETE CASCADE,
    ord INTEGER NOT NULL,
    name TEXT NOT NULL,
    sticky INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (notetype_id, ord)
);

CREATE TABLE IF NOT EXISTS notetype_templates (
    notetype_id INTEGER NOT NULL REFERENCES notetypes(id) ON DELETE CASCADE,
    ord INTEGER NOT NULL,
    name TEXT NOT NULL,
    PRIMARY KEY (notetype_id, ord)
);

-- Notes; fields is a JSON array, sort_field the trimmed first field
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY,
    notetype_id INTEGER NOT NULL REFERENCES notetypes(id),
    fields TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT '',
    sort_field TEXT NOT NULL DEFAULT '',
    modified_at TEXT NOT NULL
);

-- One card per template ordinal (or per cloze number)
CREATE TABLE IF NOT EXISTS cards (
    id INTEGER PRIMARY KEY,
    note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    ord INTEGER NOT NULL,
    UNIQUE (note_id, ord)
);

-- Editor settings (single row)
CREATE TABLE IF NOT EXISTS editor_settings (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    replace_newlines INTEGER NOT NULL DEFAULT 1,
    last_notetype_id INTEGER
);

-- Custom toolbar buttons, one encoded button per row
CREATE TABLE IF NOT EXISTS toolbar_buttons (
    encoded TEXT PRIMARY KEY
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

CREATE INDEX IF NOT EXISTS idx_notes_sort_field ON notes(notetype_id, sort_field);
CREATE INDEX IF NOT EXISTS idx_cards_note ON cards(note_id);
"#;

/// Initialize default editor settings.
pub const INIT_EDITOR_SETTINGS: &str = r#"
INSERT OR IGNORE INTO editor_settings (id) VALUES (1);
"#;
