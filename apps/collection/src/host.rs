//! Async host for editing sessions.
//!
//! Holds the collection behind a mutex the way a desktop command layer holds
//! its repository. Reads run inline; structural writes (save, notetype
//! change) run on the blocking pool while the session sits in its in-flight
//! phase, so a second structural operation cannot start meanwhile.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use note_editor_core::{
    EditorError, LaunchReason, NoteEditor, NotetypeChangeOutcome, NotetypeId, RemapPlan,
    SaveOutcome, SaveStep,
};
use thiserror::Error;
use tokio::task::JoinError;

use crate::config::StoreConfig;
use crate::db::{DbError, SettingsRepository, SqliteCollection, ToolbarRepository};

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("background task failed: {0}")]
    Task(#[from] JoinError),

    #[error("collection lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, HostError>;

/// Shared entry point for front ends driving editing sessions.
#[derive(Clone)]
pub struct EditorHost {
    collection: Arc<Mutex<SqliteCollection>>,
}

impl EditorHost {
    pub fn new(collection: SqliteCollection) -> Self {
        Self {
            collection: Arc::new(Mutex::new(collection)),
        }
    }

    /// Open the collection configured by the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = StoreConfig::from_env();
        Self::from_config(&config)
    }

    pub fn from_config(config: &StoreConfig) -> anyhow::Result<Self> {
        config
            .ensure_parent_dir()
            .with_context(|| format!("creating directory for {}", config.db_path.display()))?;
        let collection = SqliteCollection::open(&config.db_path)
            .with_context(|| format!("opening collection at {}", config.db_path.display()))?;
        tracing::info!(path = %config.db_path.display(), "opened collection");
        Ok(Self::new(collection))
    }

    /// Shared handle to the underlying collection.
    pub fn collection(&self) -> Arc<Mutex<SqliteCollection>> {
        Arc::clone(&self.collection)
    }

    fn lock(&self) -> Result<MutexGuard<'_, SqliteCollection>> {
        self.collection.lock().map_err(|_| HostError::LockPoisoned)
    }

    /// Start a session with the stored editor settings and toolbar.
    pub fn open_editor(&self, reason: LaunchReason) -> Result<NoteEditor> {
        let collection = self.lock()?;
        let settings = collection.get_editor_settings()?;
        let toolbar = collection.load_toolbar_buttons()?;
        let mut editor = NoteEditor::open(&*collection, reason, settings)?;
        editor.set_toolbar(toolbar);
        Ok(editor)
    }

    /// Save the session's note. Remembers the notetype after an add.
    ///
    /// Dropping the returned future before it completes leaves the session
    /// in `Saving`; call [`NoteEditor::cancel`] to release it.
    pub async fn save(&self, editor: &mut NoteEditor, force: bool) -> Result<SaveOutcome> {
        let step = {
            let collection = self.lock()?;
            editor.begin_save(&*collection, force)?
        };
        let request = match step {
            SaveStep::Blocked(check) => return Ok(SaveOutcome::Blocked(check)),
            SaveStep::Ready(request) => request,
        };

        let result = match self
            .run_blocking(move |collection| request.execute(collection))
            .await
        {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(error = %err, "save task failed");
                // only the reset to Editing matters, the error is echoed back
                editor
                    .finish_save(Err(EditorError::Store(err.to_string())))
                    .ok();
                return Err(err.into());
            }
        };

        let outcome = editor.finish_save(result)?;
        if matches!(outcome, SaveOutcome::Added(_)) {
            self.lock()?.save_editor_settings(editor.settings())?;
        }
        Ok(outcome)
    }

    /// Request a notetype change, applying it right away when nothing would
    /// be lost.
    pub async fn change_notetype(
        &self,
        editor: &mut NoteEditor,
        notetype_id: NotetypeId,
    ) -> Result<NotetypeChangeOutcome> {
        let outcome = {
            let collection = self.lock()?;
            editor.request_notetype_change(&*collection, notetype_id)?
        };
        match outcome {
            NotetypeChangeOutcome::ReadyToApply(_) => {
                let plan = self.confirm_notetype_change(editor).await?;
                Ok(NotetypeChangeOutcome::Applied(plan))
            }
            other => Ok(other),
        }
    }

    /// Apply the session's pending notetype change.
    ///
    /// Dropping the returned future before it completes leaves the session
    /// in `ApplyingRemap`; call [`NoteEditor::cancel`] to release it.
    pub async fn confirm_notetype_change(&self, editor: &mut NoteEditor) -> Result<RemapPlan> {
        let request = editor.begin_notetype_apply()?;
        let result = match self
            .run_blocking(move |collection| request.execute(collection))
            .await
        {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(error = %err, "notetype change task failed");
                editor
                    .finish_notetype_apply(Err(EditorError::Store(err.to_string())))
                    .ok();
                return Err(err.into());
            }
        };
        Ok(editor.finish_notetype_apply(result)?)
    }

    pub fn toggle_sticky(&self, editor: &mut NoteEditor, ordinal: usize) -> Result<bool> {
        let mut collection = self.lock()?;
        Ok(editor.toggle_sticky(&mut *collection, ordinal)?)
    }

    pub fn add_toolbar_button(
        &self,
        editor: &mut NoteEditor,
        text: &str,
        prefix: &str,
        suffix: &str,
    ) -> Result<()> {
        let encoded = editor.add_toolbar_button(text, prefix, suffix);
        self.lock()?.save_toolbar_buttons(&encoded)?;
        Ok(())
    }

    pub fn edit_toolbar_button(
        &self,
        editor: &mut NoteEditor,
        index: usize,
        text: &str,
        prefix: &str,
        suffix: &str,
    ) -> Result<()> {
        let encoded = editor.edit_toolbar_button(index, text, prefix, suffix)?;
        self.lock()?.save_toolbar_buttons(&encoded)?;
        Ok(())
    }

    pub fn remove_toolbar_button(&self, editor: &mut NoteEditor, index: usize) -> Result<()> {
        let encoded = editor.remove_toolbar_button(index)?;
        self.lock()?.save_toolbar_buttons(&encoded)?;
        Ok(())
    }

    async fn run_blocking<T, F>(
        &self,
        task: F,
    ) -> std::result::Result<note_editor_core::Result<T>, JoinError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteCollection) -> note_editor_core::Result<T> + Send + 'static,
    {
        let collection = Arc::clone(&self.collection);
        tokio::task::spawn_blocking(move || {
            let mut collection = collection
                .lock()
                .map_err(|_| EditorError::Store("collection lock poisoned".to_string()))?;
            task(&mut *collection)
        })
        .await
    }
}
