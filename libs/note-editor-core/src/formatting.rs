//! Selection-aware text wrapping.
//!
//! Every formatting action in the editor (bold, italic, MathJax, cloze,
//! user toolbar buttons) inserts a prefix and suffix around the current
//! selection. [`apply_formatting`] splices the result into the field text and
//! computes where the selection lands afterwards.
//!
//! Offsets are counted in `char`s, not bytes.

use serde::{Deserialize, Serialize};

/// A selection range within a field. `start` may be greater than `end` when
/// the user selected backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Empty selection at `pos`.
    pub fn caret(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Ordered `(low, high)` bounds, clamped to `len`.
    pub fn normalized(&self, len: usize) -> (usize, usize) {
        let low = self.start.min(self.end).min(len);
        let high = self.start.max(self.end).min(len);
        (low, high)
    }
}

/// Output of a formatter applied to a selected substring.
///
/// `sel_start`/`sel_end` are relative to the start of `result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    pub result: String,
    pub sel_start: usize,
    pub sel_end: usize,
}

/// Transforms the selected substring of a field.
pub trait Formatter {
    fn format(&self, selected: &str) -> Formatted;
}

/// Wraps the selection in a fixed prefix and suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWrapper {
    prefix: String,
    suffix: String,
}

impl TextWrapper {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn bold() -> Self {
        Self::new("<b>", "</b>")
    }

    pub fn italic() -> Self {
        Self::new("<i>", "</i>")
    }

    pub fn underline() -> Self {
        Self::new("<u>", "</u>")
    }

    pub fn heading() -> Self {
        Self::new("<h1>", "</h1>")
    }

    pub fn font_size(px: u32) -> Self {
        Self::new(format!("<span style=\"font-size:{}px\">", px), "</span>")
    }

    pub fn mathjax_inline() -> Self {
        Self::new("\\(", "\\)")
    }

    pub fn mathjax_block() -> Self {
        Self::new("\\[", "\\]")
    }

    pub fn horizontal_rule() -> Self {
        Self::new("<hr>", "")
    }

    /// Cloze wrapper for the given group number. Numbers below 1 are raised to 1.
    pub fn cloze(index: u32) -> Self {
        Self::new(format!("{{{{c{}::", index.max(1)), "}}")
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl Formatter for TextWrapper {
    fn format(&self, selected: &str) -> Formatted {
        let result = format!("{}{}{}", self.prefix, selected, self.suffix);
        if selected.is_empty() {
            // caret between the inserted tags
            let caret = self.prefix.chars().count();
            Formatted {
                result,
                sel_start: caret,
                sel_end: caret,
            }
        } else {
            let sel_end = result.chars().count();
            Formatted {
                result,
                sel_start: 0,
                sel_end,
            }
        }
    }
}

/// Apply a formatter to `text` at `selection`, returning the new text and
/// the new selection. Works with either selection direction.
pub fn apply_formatting(
    text: &str,
    selection: Selection,
    formatter: &dyn Formatter,
) -> (String, Selection) {
    let len = text.chars().count();
    let (low, high) = selection.normalized(len);
    let low_byte = byte_offset(text, low);
    let high_byte = byte_offset(text, high);

    let formatted = formatter.format(&text[low_byte..high_byte]);

    let mut spliced =
        String::with_capacity(text.len() - (high_byte - low_byte) + formatted.result.len());
    spliced.push_str(&text[..low_byte]);
    spliced.push_str(&formatted.result);
    spliced.push_str(&text[high_byte..]);

    let new_selection = Selection::new(low + formatted.sel_start, low + formatted.sel_end);
    (spliced, new_selection)
}

fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}
