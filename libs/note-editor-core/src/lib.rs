//! Note editing engine shared by every front end.
//!
//! Provides:
//! - Editing sessions that keep fields, tags and selections in sync
//! - Text formatting and cloze deletion numbering
//! - Sticky field caching across added notes
//! - Notetype remapping with data-loss detection
//! - Custom toolbar button encoding
//! - The `CollectionStore` seam to whatever holds the notes

pub mod cloze;
pub mod collection;
pub mod error;
pub mod formatting;
pub mod remap;
pub mod session;
pub mod settings;
pub mod sticky;
pub mod toolbar;
pub mod types;

pub use cloze::{cloze_numbers, next_cloze_index, next_cloze_wrapper, ClozeMode};
pub use collection::{check_note_fields, CollectionStore, FieldsCheck, MISSING_CLOZE_MESSAGE};
pub use error::{EditorError, Result};
pub use formatting::{apply_formatting, Formatted, Formatter, Selection, TextWrapper};
pub use remap::{compute_note_remap, compute_remap, compute_remap_by_id, RemapPlan, RemapTable};
pub use session::{
    DirtyFlags, EditMode, LaunchReason, NoteEditor, NotetypeChangeOutcome, RemapRequest,
    SaveOutcome, SaveRequest, SaveStep, SessionPhase, SessionState,
};
pub use settings::EditorSettings;
pub use sticky::StickyCache;
pub use toolbar::{ToolbarButton, ToolbarButtons, FIELD_SEPARATOR};
pub use types::{
    CardId, EditableField, FieldDef, Note, NoteId, Notetype, NotetypeId, NotetypeSummary,
    TemplateDef,
};
