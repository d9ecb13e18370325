//! User-defined toolbar buttons and their persisted string form.
//!
//! # Format
//! Each button is stored as one string:
//! ```text
//! index <US> text <US> prefix <US> suffix
//! ```
//! where `<US>` is [`FIELD_SEPARATOR`]. The persisted collection is an
//! unordered set of such strings; [`decode_collection`] restores a
//! deterministic, gap-free order.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::formatting::TextWrapper;

/// Reserved separator. It is stripped from every value on encode.
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// A formatting shortcut defined by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolbarButton {
    pub index: i32,
    pub text: String,
    pub prefix: String,
    pub suffix: String,
}

impl ToolbarButton {
    pub fn new(
        index: i32,
        text: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            index,
            text: text.into(),
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Formatter inserting this button's prefix and suffix.
    pub fn wrapper(&self) -> TextWrapper {
        TextWrapper::new(self.prefix.clone(), self.suffix.clone())
    }
}

fn strip_separator(value: &str) -> String {
    value.chars().filter(|c| *c != FIELD_SEPARATOR).collect()
}

/// Encode a button. Separator characters inside values are dropped.
pub fn encode(button: &ToolbarButton) -> String {
    [
        button.index.to_string(),
        strip_separator(&button.text),
        strip_separator(&button.prefix),
        strip_separator(&button.suffix),
    ]
    .join(&FIELD_SEPARATOR.to_string())
}

/// Decode one persisted button; `None` if malformed.
pub fn decode(encoded: &str) -> Option<ToolbarButton> {
    let parts: Vec<&str> = encoded.split(FIELD_SEPARATOR).collect();
    let [index, text, prefix, suffix] = parts.as_slice() else {
        return None;
    };
    let index = index.parse::<i32>().ok()?;
    Some(ToolbarButton::new(index, *text, *prefix, *suffix))
}

/// Decode an unordered collection of persisted buttons.
///
/// Malformed entries are dropped. Survivors are stable-sorted by their stored
/// index and then renumbered `0..n`, so buttons with equal stored indices keep
/// the order in which `encoded` yielded them.
pub fn decode_collection<I, S>(encoded: I) -> Vec<ToolbarButton>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut buttons: Vec<ToolbarButton> = encoded
        .into_iter()
        .filter_map(|entry| {
            let decoded = decode(entry.as_ref());
            if decoded.is_none() {
                tracing::warn!("dropping malformed toolbar button entry");
            }
            decoded
        })
        .collect();

    buttons.sort_by_key(|b| b.index);
    reindex(&mut buttons);
    buttons
}

fn reindex(buttons: &mut [ToolbarButton]) {
    for (position, button) in buttons.iter_mut().enumerate() {
        button.index = position as i32;
    }
}

/// Ordered, index-contiguous list of toolbar buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolbarButtons {
    buttons: Vec<ToolbarButton>,
}

impl ToolbarButtons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the persisted string set.
    pub fn from_encoded<I, S>(encoded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            buttons: decode_collection(encoded),
        }
    }

    /// Persistable form: one encoded string per button.
    pub fn to_encoded_set(&self) -> BTreeSet<String> {
        self.buttons.iter().map(encode).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolbarButton> {
        self.buttons.iter()
    }

    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ToolbarButton> {
        self.buttons.get(index)
    }

    /// Append a button and return its index.
    pub fn add(
        &mut self,
        text: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> usize {
        let index = self.buttons.len();
        self.buttons
            .push(ToolbarButton::new(index as i32, text, prefix, suffix));
        index
    }

    /// Replace the text, prefix and suffix of the button at `index`.
    pub fn edit(
        &mut self,
        index: usize,
        text: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Option<&ToolbarButton> {
        let button = self.buttons.get_mut(index)?;
        button.text = text.into();
        button.prefix = prefix.into();
        button.suffix = suffix.into();
        Some(button)
    }

    /// Remove the button at `index`, closing the gap.
    pub fn remove(&mut self, index: usize) -> Option<ToolbarButton> {
        if index >= self.buttons.len() {
            return None;
        }
        let removed = self.buttons.remove(index);
        reindex(&mut self.buttons);
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn joined(parts: &[&str]) -> String {
        parts.join(&FIELD_SEPARATOR.to_string())
    }

    #[test]
    fn decode_inverts_encode() {
        let button = ToolbarButton::new(3, "Red", "<span style=\"color:red\">", "</span>");
        assert_eq!(decode(&encode(&button)), Some(button));
    }

    #[test]
    fn encode_strips_separator() {
        let button = ToolbarButton::new(0, "a\u{1f}b", "<\u{1f}x>", "");
        let encoded = encode(&button);
        assert_eq!(encoded, joined(&["0", "ab", "<x>", ""]));
        assert_eq!(decode(&encoded).map(|b| b.text), Some("ab".to_string()));
    }

    #[test]
    fn wrong_arity_is_absent() {
        assert_eq!(decode(&joined(&["a", "b", "c"])), None);
        assert_eq!(decode(&joined(&["1", "b", "c", "d", "e"])), None);
        assert_eq!(decode(""), None);
    }

    #[test]
    fn non_integer_index_is_absent() {
        assert_eq!(decode(&joined(&["x", "b", "c", "d"])), None);
        assert_eq!(decode(&joined(&["", "b", "c", "d"])), None);
    }

    #[test]
    fn collection_is_sorted_and_reindexed() {
        let set = vec![
            joined(&["5", "five", "<5>", "</5>"]),
            joined(&["2", "two", "<2>", "</2>"]),
            joined(&["9", "nine", "<9>", "</9>"]),
        ];
        let buttons = decode_collection(&set);
        let summary: Vec<(i32, &str)> = buttons.iter().map(|b| (b.index, b.text.as_str())).collect();
        assert_eq!(summary, vec![(0, "two"), (1, "five"), (2, "nine")]);
    }

    #[test]
    fn collection_drops_malformed_entries() {
        let set = vec![
            joined(&["1", "ok", "<b>", "</b>"]),
            "garbage".to_string(),
            joined(&["NaN", "bad", "", ""]),
        ];
        let buttons = decode_collection(set);
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].index, 0);
        assert_eq!(buttons[0].text, "ok");
    }

    #[test]
    fn equal_indices_keep_input_order() {
        let set = vec![
            joined(&["1", "first", "", ""]),
            joined(&["1", "second", "", ""]),
            joined(&["0", "zero", "", ""]),
        ];
        let texts: Vec<String> = decode_collection(set).into_iter().map(|b| b.text).collect();
        assert_eq!(texts, vec!["zero", "first", "second"]);
    }

    #[test]
    fn remove_closes_gaps() {
        let mut buttons = ToolbarButtons::new();
        buttons.add("A", "<a>", "</a>");
        buttons.add("B", "<b>", "</b>");
        buttons.add("C", "<c>", "</c>");

        let removed = buttons.remove(1).map(|b| b.text);
        assert_eq!(removed, Some("B".to_string()));
        let indices: Vec<i32> = buttons.iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(buttons.get(1).map(|b| b.text.as_str()), Some("C"));
        assert!(buttons.remove(5).is_none());
    }

    #[test]
    fn encoded_set_reloads_identically() {
        let mut buttons = ToolbarButtons::new();
        buttons.add("Sup", "<sup>", "</sup>");
        buttons.add("Sub", "<sub>", "</sub>");
        buttons.edit(0, "Superscript", "<sup>", "</sup>");

        let reloaded = ToolbarButtons::from_encoded(buttons.to_encoded_set());
        assert_eq!(reloaded, buttons);
    }
}
