//! Editor configuration.

use serde::{Deserialize, Serialize};

use crate::types::NotetypeId;

/// User preferences that change how the editor behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorSettings {
    /// Convert `\n` to `<br>` in field contents when saving.
    #[serde(default = "default_replace_newlines")]
    pub replace_newlines: bool,
    /// Notetype used by the most recent add, preselected for the next one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_notetype_id: Option<NotetypeId>,
}

fn default_replace_newlines() -> bool {
    true
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            replace_newlines: default_replace_newlines(),
            last_notetype_id: None,
        }
    }
}

impl EditorSettings {
    /// Field content as it should be written to the collection.
    pub fn prepare_field(&self, content: &str) -> String {
        if self.replace_newlines {
            content.replace("\r\n", "<br>").replace('\n', "<br>")
        } else {
            content.to_string()
        }
    }
}
