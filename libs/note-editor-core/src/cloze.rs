//! Cloze deletion numbering.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::formatting::TextWrapper;

static CLOZE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{\{c(\d+)::.*?\}\}").expect("cloze pattern is valid"));

/// How the next cloze number is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClozeMode {
    /// Start a new cloze group after the highest existing one.
    #[default]
    Increment,
    /// Add another blank to the highest existing group.
    Same,
}

/// All cloze numbers used across the given fields.
pub fn cloze_numbers<S: AsRef<str>>(fields: &[S]) -> BTreeSet<u32> {
    fields
        .iter()
        .flat_map(|field| {
            CLOZE_MARKER
                .captures_iter(field.as_ref())
                .filter_map(|caps| caps[1].parse::<u32>().ok())
                .filter(|n| *n > 0)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Next cloze number to insert. Returns 1 when no marker exists.
pub fn next_cloze_index<S: AsRef<str>>(fields: &[S], mode: ClozeMode) -> u32 {
    match cloze_numbers(fields).last() {
        None => 1,
        Some(&max) => match mode {
            ClozeMode::Increment => max.saturating_add(1),
            ClozeMode::Same => max,
        },
    }
}

/// Wrapper that inserts the next cloze for `fields`.
pub fn next_cloze_wrapper<S: AsRef<str>>(fields: &[S], mode: ClozeMode) -> TextWrapper {
    TextWrapper::cloze(next_cloze_index(fields, mode))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_after_highest() {
        let fields = ["{{c1::Paris}} is in {{c2::France}}", ""];
        assert_eq!(next_cloze_index(&fields, ClozeMode::Increment), 3);
    }

    #[test]
    fn same_reuses_highest() {
        let fields = ["{{c1::Paris}} is in {{c2::France}}", ""];
        assert_eq!(next_cloze_index(&fields, ClozeMode::Same), 2);
    }

    #[test]
    fn no_markers_starts_at_one() {
        let fields = ["plain text", "more {{text}}"];
        assert_eq!(next_cloze_index(&fields, ClozeMode::Increment), 1);
        assert_eq!(next_cloze_index(&fields, ClozeMode::Same), 1);
        let empty: [&str; 0] = [];
        assert_eq!(next_cloze_index(&empty, ClozeMode::Same), 1);
    }

    #[test]
    fn scans_every_field() {
        let fields = vec![
            "{{c1::a}}".to_string(),
            "x {{c5::b::hint}} y".to_string(),
            "{{c3::c}}".to_string(),
        ];
        assert_eq!(next_cloze_index(&fields, ClozeMode::Increment), 6);
        assert_eq!(
            cloze_numbers(&fields).into_iter().collect::<Vec<_>>(),
            vec![1, 3, 5]
        );
    }

    #[test]
    fn ignores_zero_and_unclosed_markers() {
        let fields = ["{{c0::zero}} {{c7::never closed"];
        assert!(cloze_numbers(&fields).is_empty());
    }

    #[test]
    fn marker_may_span_lines() {
        let fields = ["{{c2::line one\nline two}}"];
        assert_eq!(next_cloze_index(&fields, ClozeMode::Same), 2);
    }

    #[test]
    fn wrapper_uses_computed_index() {
        let fields = ["{{c1::a}}"];
        assert_eq!(next_cloze_wrapper(&fields, ClozeMode::Increment).prefix(), "{{c2::");
    }
}
