//! Sticky field cache.
//!
//! Fields flagged sticky keep their content when the editor moves on to the
//! next note in an add session. The cache is keyed by field ordinal, so it
//! follows position rather than field name: appending or removing trailing
//! fields is safe, reordering fields is not.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::EditableField;

/// Cached contents of sticky fields, keyed by ordinal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickyCache {
    entries: BTreeMap<usize, String>,
}

impl StickyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ordinal: usize) -> Option<&str> {
        self.entries.get(&ordinal).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Cache the content of every sticky field and forget ordinals that no
    /// longer exist or are no longer sticky. Call before rebuilding the
    /// field list.
    pub fn save_sticky_map(&mut self, fields: &[EditableField]) {
        for field in fields.iter().filter(|f| f.sticky) {
            self.entries.insert(field.ordinal, field.content.clone());
        }
        self.entries
            .retain(|ordinal, _| fields.get(*ordinal).is_some_and(|f| f.sticky));
        tracing::debug!(cached = self.entries.len(), "saved sticky fields");
    }

    /// Overwrite fields that have a cached value. Ordinals beyond the end of
    /// `fields` are skipped.
    pub fn restore_sticky_fields(&self, fields: &mut [EditableField]) {
        for (ordinal, content) in &self.entries {
            if let Some(field) = fields.get_mut(*ordinal) {
                field.set_content(content.clone());
            }
        }
    }

    /// Record a sticky flag change for `ordinal`: turning on seeds the cache
    /// with `current`, turning off drops the entry.
    pub fn toggle_sticky(&mut self, ordinal: usize, now_sticky: bool, current: &str) {
        if now_sticky {
            self.entries.insert(ordinal, current.to_string());
        } else {
            self.entries.remove(&ordinal);
        }
    }
}
