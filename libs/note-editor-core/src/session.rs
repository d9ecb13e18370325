//! Editing session: keeps the editable field list, tags and caches in sync
//! with user actions.
//!
//! A [`NoteEditor`] is created for one editing session and owns all of its
//! mutable state. Its lifecycle:
//!
//! ```text
//! Loading -> Editing -> Saving -> Saved | Cancelled
//!            Editing -> ConfirmingRemap -> ApplyingRemap -> Editing
//! ```
//!
//! In add mode a successful save loops back to `Editing` with a fresh note.
//! Only `Editing` accepts edits, which keeps at most one structural write
//! (save or notetype apply) in flight.
//!
//! Structural writes come in two forms: a one-call form taking a
//! `&mut CollectionStore`, and a `begin_*`/`finish_*` pair returning an owned
//! request, for hosts that run the write elsewhere and resume later.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::cloze::{next_cloze_index, ClozeMode};
use crate::collection::{CollectionStore, FieldsCheck};
use crate::error::{EditorError, Result};
use crate::formatting::{apply_formatting, Formatter, Selection, TextWrapper};
use crate::remap::{compute_note_remap, compute_remap, RemapPlan};
use crate::settings::EditorSettings;
use crate::sticky::StickyCache;
use crate::toolbar::ToolbarButtons;
use crate::types::{CardId, EditableField, Note, NoteId, Notetype, NotetypeId};

/// Why the editor was opened. Each case carries exactly what it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchReason {
    /// New blank note. Without a notetype the last used one is preselected.
    AddNote { notetype_id: Option<NotetypeId> },
    /// New note whose first field is prefilled with shared text.
    AddFromSharedText {
        notetype_id: Option<NotetypeId>,
        text: String,
    },
    /// New note copied from existing content.
    AddFromCopy {
        notetype_id: NotetypeId,
        fields: Vec<String>,
        tags: BTreeSet<String>,
    },
    EditExistingNote(NoteId),
    EditExistingCard(CardId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    Add,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Loading,
    Editing,
    ConfirmingRemap,
    ApplyingRemap,
    Saving,
    Saved,
    Cancelled,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Saved | Self::Cancelled)
    }
}

/// Which parts of the session differ from what the collection holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyFlags {
    pub fields: bool,
    pub tags: bool,
    pub notetype: bool,
}

impl DirtyFlags {
    pub fn any(&self) -> bool {
        self.fields || self.tags || self.notetype
    }
}

/// Result of asking for a different notetype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotetypeChangeOutcome {
    /// Requested notetype is already loaded.
    Unchanged,
    /// Switched; the field list has been rebuilt.
    Applied(RemapPlan),
    /// Lossless change of a stored note, waiting to be applied.
    ReadyToApply(RemapPlan),
    /// Content or cards would be lost; the user must confirm first.
    NeedsConfirmation(RemapPlan),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Added(NoteId),
    Updated(NoteId),
    /// Fields check failed; nothing was written. Retry with `force` to bypass.
    Blocked(FieldsCheck),
}

/// First half of a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStep {
    Ready(SaveRequest),
    Blocked(FieldsCheck),
}

/// Owned save to run against the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub mode: EditMode,
    pub note: Note,
}

impl SaveRequest {
    pub fn execute<C: CollectionStore + ?Sized>(&self, store: &mut C) -> Result<NoteId> {
        match self.mode {
            EditMode::Add => store.add_note(&self.note),
            EditMode::Edit => {
                let id = self
                    .note
                    .id
                    .ok_or_else(|| EditorError::Store("edited note has no id".to_string()))?;
                store.update_note(&self.note)?;
                Ok(id)
            }
        }
    }
}

/// Owned notetype change to run against the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapRequest {
    pub note: Note,
    pub old: Notetype,
    pub new: Notetype,
    pub plan: RemapPlan,
}

impl RemapRequest {
    pub fn execute<C: CollectionStore + ?Sized>(&self, store: &mut C) -> Result<()> {
        store.apply_remap(
            &self.note,
            &self.old,
            &self.new,
            &self.plan.field_map,
            &self.plan.card_map,
        )
    }
}

#[derive(Debug, Clone)]
struct PendingChange {
    new: Notetype,
    plan: RemapPlan,
}

/// Serializable snapshot of a session, for surviving process teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub mode: EditMode,
    /// Working note with raw (unprepared) field contents.
    pub note: Note,
    pub selections: Vec<Selection>,
    #[serde(default)]
    pub focused: Option<usize>,
    #[serde(default)]
    pub sticky: StickyCache,
    #[serde(default)]
    pub toolbar: ToolbarButtons,
    #[serde(default)]
    pub dirty: DirtyFlags,
    #[serde(default)]
    pub notes_added: usize,
}

impl SessionState {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Editing session for one note (or a series of added notes).
#[derive(Debug, Clone)]
pub struct NoteEditor {
    mode: EditMode,
    phase: SessionPhase,
    note: Note,
    notetype: Notetype,
    fields: Vec<EditableField>,
    sticky: StickyCache,
    toolbar: ToolbarButtons,
    settings: EditorSettings,
    pending: Option<PendingChange>,
    in_flight: Option<Note>,
    dirty: DirtyFlags,
    notes_added: usize,
}

impl NoteEditor {
    /// Start a session for `reason`.
    pub fn open<C: CollectionStore + ?Sized>(
        store: &C,
        reason: LaunchReason,
        settings: EditorSettings,
    ) -> Result<Self> {
        let (mode, mut note, notetype) = match reason {
            LaunchReason::AddNote { notetype_id } => {
                let notetype = resolve_add_notetype(store, notetype_id, &settings)?;
                (EditMode::Add, Note::blank(&notetype), notetype)
            }
            LaunchReason::AddFromSharedText { notetype_id, text } => {
                let notetype = resolve_add_notetype(store, notetype_id, &settings)?;
                let mut note = Note::blank(&notetype);
                if let Some(first) = note.fields.first_mut() {
                    *first = text;
                }
                (EditMode::Add, note, notetype)
            }
            LaunchReason::AddFromCopy {
                notetype_id,
                fields,
                tags,
            } => {
                let notetype = store
                    .get_notetype(notetype_id)?
                    .ok_or(EditorError::NotetypeNotFound(notetype_id))?;
                let mut note = Note::blank(&notetype);
                for (slot, content) in note.fields.iter_mut().zip(fields) {
                    *slot = content;
                }
                note.tags = tags;
                (EditMode::Add, note, notetype)
            }
            LaunchReason::EditExistingNote(note_id) => {
                let note = store
                    .get_note(note_id)?
                    .ok_or(EditorError::NoteNotFound(note_id))?;
                let notetype = store
                    .get_notetype(note.notetype_id)?
                    .ok_or(EditorError::NotetypeNotFound(note.notetype_id))?;
                (EditMode::Edit, note, notetype)
            }
            LaunchReason::EditExistingCard(card_id) => {
                let note = store
                    .note_for_card(card_id)?
                    .ok_or(EditorError::CardNotFound(card_id))?;
                let notetype = store
                    .get_notetype(note.notetype_id)?
                    .ok_or(EditorError::NotetypeNotFound(note.notetype_id))?;
                (EditMode::Edit, note, notetype)
            }
        };

        let fields = EditableField::build_all(&notetype, &note.fields);
        note.fields = fields.iter().map(|f| f.content.clone()).collect();

        let mut editor = Self {
            mode,
            phase: SessionPhase::Loading,
            note,
            notetype,
            fields,
            sticky: StickyCache::new(),
            toolbar: ToolbarButtons::new(),
            settings,
            pending: None,
            in_flight: None,
            dirty: DirtyFlags::default(),
            notes_added: 0,
        };
        editor.phase = SessionPhase::Editing;

        tracing::info!(
            mode = ?editor.mode,
            notetype = editor.notetype.id,
            note = ?editor.note.id,
            "opened note editor"
        );
        Ok(editor)
    }

    /// Rebuild a session from a snapshot taken with [`NoteEditor::session_state`].
    ///
    /// A change awaiting confirmation or a write in flight is not part of the
    /// snapshot; the restored session is always `Editing`.
    pub fn restore<C: CollectionStore + ?Sized>(
        store: &C,
        state: SessionState,
        settings: EditorSettings,
    ) -> Result<Self> {
        let notetype = store
            .get_notetype(state.note.notetype_id)?
            .ok_or(EditorError::NotetypeNotFound(state.note.notetype_id))?;
        let mut fields = EditableField::build_all(&notetype, &state.note.fields);
        for (field, selection) in fields.iter_mut().zip(&state.selections) {
            let len = field.content.chars().count();
            field.selection = Selection::new(selection.start.min(len), selection.end.min(len));
        }
        if let Some(field) = state.focused.and_then(|ord| fields.get_mut(ord)) {
            field.focused = true;
        }

        let mut note = state.note;
        note.fields = fields.iter().map(|f| f.content.clone()).collect();

        Ok(Self {
            mode: state.mode,
            phase: SessionPhase::Editing,
            note,
            notetype,
            fields,
            sticky: state.sticky,
            toolbar: state.toolbar,
            settings,
            pending: None,
            in_flight: None,
            dirty: state.dirty,
            notes_added: state.notes_added,
        })
    }

    pub fn session_state(&self) -> SessionState {
        SessionState {
            mode: self.mode,
            note: self.note(),
            selections: self.fields.iter().map(|f| f.selection).collect(),
            focused: self.fields.iter().position(|f| f.focused),
            sticky: self.sticky.clone(),
            toolbar: self.toolbar.clone(),
            dirty: self.dirty,
            notes_added: self.notes_added,
        }
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn notetype(&self) -> &Notetype {
        &self.notetype
    }

    /// Working note with the current (unprepared) field contents.
    pub fn note(&self) -> Note {
        let mut note = self.note.clone();
        note.fields = self.field_contents();
        note
    }

    pub fn fields(&self) -> &[EditableField] {
        &self.fields
    }

    pub fn field(&self, ordinal: usize) -> Result<&EditableField> {
        self.fields.get(ordinal).ok_or(EditorError::OrdinalOutOfRange {
            ordinal,
            len: self.fields.len(),
        })
    }

    pub fn field_contents(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.content.clone()).collect()
    }

    pub fn sticky_cache(&self) -> &StickyCache {
        &self.sticky
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty.any()
    }

    /// Number of notes added so far in this session.
    pub fn notes_added(&self) -> usize {
        self.notes_added
    }

    fn ensure_editing(&self, action: &'static str) -> Result<()> {
        if self.phase == SessionPhase::Editing {
            Ok(())
        } else {
            Err(EditorError::InvalidPhase {
                action,
                phase: self.phase,
            })
        }
    }

    fn field_mut(&mut self, ordinal: usize) -> Result<&mut EditableField> {
        let len = self.fields.len();
        self.fields
            .get_mut(ordinal)
            .ok_or(EditorError::OrdinalOutOfRange { ordinal, len })
    }

    // === Field editing ===

    /// Replace a field's text; the caret moves to the end.
    pub fn set_field_text(&mut self, ordinal: usize, text: impl Into<String>) -> Result<()> {
        self.ensure_editing("edit field")?;
        let text = text.into();
        let field = self.field_mut(ordinal)?;
        if field.content != text {
            field.set_content(text);
            self.dirty.fields = true;
        }
        Ok(())
    }

    pub fn set_selection(&mut self, ordinal: usize, selection: Selection) -> Result<()> {
        self.ensure_editing("select")?;
        let field = self.field_mut(ordinal)?;
        let len = field.content.chars().count();
        field.selection = Selection::new(selection.start.min(len), selection.end.min(len));
        Ok(())
    }

    /// Give `ordinal` focus, removing it from every other field.
    pub fn focus(&mut self, ordinal: usize) -> Result<()> {
        self.ensure_editing("focus")?;
        self.field(ordinal)?;
        for field in &mut self.fields {
            field.focused = field.ordinal == ordinal;
        }
        Ok(())
    }

    /// Apply a formatter to the field's current selection.
    pub fn apply_formatting(
        &mut self,
        ordinal: usize,
        formatter: &dyn Formatter,
    ) -> Result<&EditableField> {
        self.ensure_editing("format")?;
        let field = self.field_mut(ordinal)?;
        let (text, selection) = apply_formatting(&field.content, field.selection, formatter);
        field.content = text;
        field.selection = selection;
        self.dirty.fields = true;
        self.field(ordinal)
    }

    /// Wrap the selection in a cloze deletion numbered from all fields.
    /// Returns the cloze number used.
    pub fn insert_cloze(&mut self, ordinal: usize, mode: ClozeMode) -> Result<u32> {
        self.ensure_editing("insert cloze")?;
        let index = next_cloze_index(&self.field_contents(), mode);
        self.apply_formatting(ordinal, &TextWrapper::cloze(index))?;
        Ok(index)
    }

    /// Apply the user toolbar button at `index`.
    pub fn apply_toolbar_button(&mut self, ordinal: usize, index: usize) -> Result<&EditableField> {
        let wrapper = self
            .toolbar
            .get(index)
            .map(|b| b.wrapper())
            .ok_or(EditorError::ToolbarButtonNotFound(index))?;
        self.apply_formatting(ordinal, &wrapper)
    }

    // === Tags ===

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.note.tags
    }

    pub fn tag_string(&self) -> String {
        self.note.tag_string()
    }

    /// Replace all tags with the whitespace-separated tags in `input`.
    pub fn set_tags_from_str(&mut self, input: &str) -> Result<()> {
        self.ensure_editing("edit tags")?;
        let tags: BTreeSet<String> = input.split_whitespace().map(str::to_string).collect();
        if tags != self.note.tags {
            self.note.tags = tags;
            self.dirty.tags = true;
        }
        Ok(())
    }

    pub fn add_tag(&mut self, tag: &str) -> Result<bool> {
        self.ensure_editing("edit tags")?;
        let tag = tag.trim();
        if tag.is_empty() || tag.contains(char::is_whitespace) {
            return Ok(false);
        }
        let added = self.note.tags.insert(tag.to_string());
        self.dirty.tags |= added;
        Ok(added)
    }

    pub fn remove_tag(&mut self, tag: &str) -> Result<bool> {
        self.ensure_editing("edit tags")?;
        let removed = self.note.tags.remove(tag.trim());
        self.dirty.tags |= removed;
        Ok(removed)
    }

    // === Sticky fields ===

    /// Flip the sticky flag of a field, persisting it on the notetype.
    /// Returns the new flag.
    pub fn toggle_sticky<C: CollectionStore + ?Sized>(
        &mut self,
        store: &mut C,
        ordinal: usize,
    ) -> Result<bool> {
        self.ensure_editing("toggle sticky")?;
        let sticky = !self.field(ordinal)?.sticky;
        store.set_field_sticky(self.notetype.id, ordinal, sticky)?;

        self.notetype.fields[ordinal].sticky = sticky;
        let field = self.field_mut(ordinal)?;
        field.sticky = sticky;
        let content = field.content.clone();
        self.sticky.toggle_sticky(ordinal, sticky, &content);

        tracing::debug!(ordinal, sticky, "toggled sticky field");
        Ok(sticky)
    }

    // === Notetype change ===

    /// Ask to switch the note to another notetype.
    ///
    /// New notes switch immediately in memory. Stored notes get a pending
    /// change that must be applied, after confirmation if data would be lost.
    pub fn request_notetype_change<C: CollectionStore + ?Sized>(
        &mut self,
        store: &C,
        notetype_id: NotetypeId,
    ) -> Result<NotetypeChangeOutcome> {
        self.ensure_editing("change notetype")?;
        if notetype_id == self.notetype.id {
            return Ok(NotetypeChangeOutcome::Unchanged);
        }

        let new = store
            .get_notetype(notetype_id)?
            .ok_or(EditorError::NotetypeNotFound(notetype_id))?;
        match self.mode {
            EditMode::Add => {
                let plan = compute_remap(&self.notetype, &new);
                self.switch_notetype(new, &plan);
                Ok(NotetypeChangeOutcome::Applied(plan))
            }
            EditMode::Edit => {
                let card_ords = match self.note.id {
                    Some(id) => store.card_ordinals(id)?,
                    None => Vec::new(),
                };
                let plan = compute_note_remap(&self.notetype, &new, &card_ords);
                let needs_confirmation = plan.data_loss;
                self.pending = Some(PendingChange {
                    new,
                    plan: plan.clone(),
                });
                if needs_confirmation {
                    self.phase = SessionPhase::ConfirmingRemap;
                    Ok(NotetypeChangeOutcome::NeedsConfirmation(plan))
                } else {
                    Ok(NotetypeChangeOutcome::ReadyToApply(plan))
                }
            }
        }
    }

    /// Request a change and apply it right away unless it needs confirmation.
    pub fn change_notetype<C: CollectionStore + ?Sized>(
        &mut self,
        store: &mut C,
        notetype_id: NotetypeId,
    ) -> Result<NotetypeChangeOutcome> {
        match self.request_notetype_change(store, notetype_id)? {
            NotetypeChangeOutcome::ReadyToApply(_) => {
                let plan = self.confirm_notetype_change(store)?;
                Ok(NotetypeChangeOutcome::Applied(plan))
            }
            outcome => Ok(outcome),
        }
    }

    /// The change waiting for confirmation or application, if any.
    pub fn pending_change(&self) -> Option<&RemapPlan> {
        self.pending.as_ref().map(|p| &p.plan)
    }

    /// Apply the pending change through the collection.
    pub fn confirm_notetype_change<C: CollectionStore + ?Sized>(
        &mut self,
        store: &mut C,
    ) -> Result<RemapPlan> {
        let request = self.begin_notetype_apply()?;
        let result = request.execute(store);
        self.finish_notetype_apply(result)
    }

    /// Decline the pending change. Nothing has been written.
    pub fn cancel_notetype_change(&mut self) -> Result<()> {
        if self.pending.take().is_none() {
            return Err(EditorError::NoPendingChange);
        }
        if self.phase == SessionPhase::ConfirmingRemap {
            self.phase = SessionPhase::Editing;
        }
        Ok(())
    }

    pub fn begin_notetype_apply(&mut self) -> Result<RemapRequest> {
        if !matches!(
            self.phase,
            SessionPhase::Editing | SessionPhase::ConfirmingRemap
        ) {
            return Err(EditorError::InvalidPhase {
                action: "apply notetype change",
                phase: self.phase,
            });
        }
        let pending = self.pending.clone().ok_or(EditorError::NoPendingChange)?;
        self.phase = SessionPhase::ApplyingRemap;
        Ok(RemapRequest {
            note: self.prepared_note(),
            old: self.notetype.clone(),
            new: pending.new,
            plan: pending.plan,
        })
    }

    /// Complete an apply started with [`NoteEditor::begin_notetype_apply`].
    /// On failure the session returns to `Editing` unchanged.
    pub fn finish_notetype_apply(&mut self, result: Result<()>) -> Result<RemapPlan> {
        if self.phase != SessionPhase::ApplyingRemap {
            return Err(EditorError::InvalidPhase {
                action: "finish notetype change",
                phase: self.phase,
            });
        }
        self.phase = SessionPhase::Editing;
        let pending = self.pending.take().ok_or(EditorError::NoPendingChange)?;
        result?;

        self.switch_notetype(pending.new, &pending.plan);
        self.dirty.fields = false;
        self.dirty.notetype = false;
        Ok(pending.plan)
    }

    fn switch_notetype(&mut self, new: Notetype, plan: &RemapPlan) {
        self.sticky.save_sticky_map(&self.fields);
        let contents = plan
            .field_map
            .remap_values(&self.field_contents(), new.field_count());
        self.fields = EditableField::build_all(&new, &contents);
        self.sticky.restore_sticky_fields(&mut self.fields);
        // keep only what the new notetype marks sticky
        self.sticky.save_sticky_map(&self.fields);

        tracing::info!(
            from = self.notetype.id,
            to = new.id,
            data_loss = plan.data_loss,
            "switched notetype"
        );
        self.note.notetype_id = new.id;
        self.note.fields = self.field_contents();
        self.notetype = new;
        self.dirty.notetype = true;
    }

    // === Saving ===

    /// Ask the collection whether the note may be saved as is.
    pub fn check_fields<C: CollectionStore + ?Sized>(&self, store: &C) -> Result<FieldsCheck> {
        store.fields_check(&self.prepared_note())
    }

    /// Validate and save. `force` skips the fields check.
    pub fn save<C: CollectionStore + ?Sized>(
        &mut self,
        store: &mut C,
        force: bool,
    ) -> Result<SaveOutcome> {
        match self.begin_save(store, force)? {
            SaveStep::Blocked(check) => Ok(SaveOutcome::Blocked(check)),
            SaveStep::Ready(request) => {
                let result = request.execute(store);
                self.finish_save(result)
            }
        }
    }

    pub fn begin_save<C: CollectionStore + ?Sized>(
        &mut self,
        store: &C,
        force: bool,
    ) -> Result<SaveStep> {
        self.ensure_editing("save")?;
        let note = self.prepared_note();
        if !force {
            let check = store.fields_check(&note)?;
            if !check.is_ok() {
                return Ok(SaveStep::Blocked(check));
            }
        }
        self.phase = SessionPhase::Saving;
        self.in_flight = Some(note.clone());
        Ok(SaveStep::Ready(SaveRequest {
            mode: self.mode,
            note,
        }))
    }

    /// Complete a save started with [`NoteEditor::begin_save`]. On failure the
    /// session returns to `Editing` with its content intact.
    pub fn finish_save(&mut self, result: Result<NoteId>) -> Result<SaveOutcome> {
        if self.phase != SessionPhase::Saving {
            return Err(EditorError::InvalidPhase {
                action: "finish save",
                phase: self.phase,
            });
        }
        let saved = self.in_flight.take();
        let note_id = match result {
            Ok(id) => id,
            Err(e) => {
                self.phase = SessionPhase::Editing;
                return Err(e);
            }
        };

        match self.mode {
            EditMode::Add => {
                self.notes_added += 1;
                self.settings.last_notetype_id = Some(self.notetype.id);
                self.start_next_note();
                tracing::info!(note = note_id, "added note");
                Ok(SaveOutcome::Added(note_id))
            }
            EditMode::Edit => {
                if let Some(mut saved) = saved {
                    saved.id = Some(note_id);
                    self.note = saved;
                }
                self.dirty = DirtyFlags::default();
                self.phase = SessionPhase::Saved;
                tracing::info!(note = note_id, "updated note");
                Ok(SaveOutcome::Updated(note_id))
            }
        }
    }

    /// Reset to a blank note of the same notetype, keeping tags and sticky
    /// contents.
    fn start_next_note(&mut self) {
        self.sticky.save_sticky_map(&self.fields);
        let tags = std::mem::take(&mut self.note.tags);
        self.note = Note::blank(&self.notetype);
        self.note.tags = tags;
        self.fields = EditableField::build_all(&self.notetype, &[]);
        self.sticky.restore_sticky_fields(&mut self.fields);
        self.note.fields = self.field_contents();
        self.dirty = DirtyFlags::default();
        self.phase = SessionPhase::Editing;
    }

    /// Note as it will be written: contents passed through the editor settings.
    fn prepared_note(&self) -> Note {
        let mut note = self.note.clone();
        note.fields = self
            .fields
            .iter()
            .map(|f| self.settings.prepare_field(&f.content))
            .collect();
        note
    }

    /// End the session without saving. In-memory caches are discarded with
    /// the session; a write already handed to the collection is not undone.
    pub fn cancel(&mut self) -> Result<()> {
        if self.phase.is_terminal() {
            return Err(EditorError::InvalidPhase {
                action: "cancel",
                phase: self.phase,
            });
        }
        self.pending = None;
        self.in_flight = None;
        self.phase = SessionPhase::Cancelled;
        Ok(())
    }

    // === Toolbar ===

    pub fn toolbar(&self) -> &ToolbarButtons {
        &self.toolbar
    }

    pub fn set_toolbar(&mut self, toolbar: ToolbarButtons) {
        self.toolbar = toolbar;
    }

    /// Add a button; returns the encoded set to persist.
    pub fn add_toolbar_button(
        &mut self,
        text: &str,
        prefix: &str,
        suffix: &str,
    ) -> BTreeSet<String> {
        self.toolbar.add(text, prefix, suffix);
        self.toolbar.to_encoded_set()
    }

    pub fn edit_toolbar_button(
        &mut self,
        index: usize,
        text: &str,
        prefix: &str,
        suffix: &str,
    ) -> Result<BTreeSet<String>> {
        self.toolbar
            .edit(index, text, prefix, suffix)
            .ok_or(EditorError::ToolbarButtonNotFound(index))?;
        Ok(self.toolbar.to_encoded_set())
    }

    pub fn remove_toolbar_button(&mut self, index: usize) -> Result<BTreeSet<String>> {
        self.toolbar
            .remove(index)
            .ok_or(EditorError::ToolbarButtonNotFound(index))?;
        Ok(self.toolbar.to_encoded_set())
    }
}

fn resolve_add_notetype<C: CollectionStore + ?Sized>(
    store: &C,
    requested: Option<NotetypeId>,
    settings: &EditorSettings,
) -> Result<Notetype> {
    if let Some(id) = requested {
        return store
            .get_notetype(id)?
            .ok_or(EditorError::NotetypeNotFound(id));
    }
    if let Some(id) = settings.last_notetype_id {
        if let Some(notetype) = store.get_notetype(id)? {
            return Ok(notetype);
        }
        tracing::debug!(notetype = id, "last used notetype no longer exists");
    }
    let first = store
        .all_notetypes()?
        .into_iter()
        .next()
        .ok_or(EditorError::NoNotetypes)?;
    store
        .get_notetype(first.id)?
        .ok_or(EditorError::NotetypeNotFound(first.id))
}
