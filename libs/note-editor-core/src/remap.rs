//! Ordinal remapping when a note switches notetype.
//!
//! Mapping is positional: old field/template ordinal `i` goes to new ordinal
//! `i` when the new notetype has one, and is discarded otherwise. The plan is
//! computed before anything is applied so the caller can ask for
//! confirmation when content or cards would be lost.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::collection::CollectionStore;
use crate::error::{EditorError, Result};
use crate::types::{Notetype, NotetypeId};

/// Old ordinal → new ordinal, `None` meaning discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapTable {
    entries: Vec<Option<usize>>,
}

impl RemapTable {
    /// Every ordinal maps to itself.
    pub fn identity(count: usize) -> Self {
        Self {
            entries: (0..count).map(Some).collect(),
        }
    }

    /// Identity over the shared prefix, old ordinals `>= new_count` discarded.
    pub fn positional(old_count: usize, new_count: usize) -> Self {
        Self {
            entries: (0..old_count)
                .map(|ord| (ord < new_count).then_some(ord))
                .collect(),
        }
    }

    /// Number of old ordinals covered.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// New ordinal for `old`. `None` if discarded or not covered by the table.
    pub fn get(&self, old: usize) -> Option<usize> {
        self.entries.get(old).copied().flatten()
    }

    pub fn is_discarded(&self, old: usize) -> bool {
        matches!(self.entries.get(old), Some(None))
    }

    pub fn has_discarded(&self) -> bool {
        self.entries.iter().any(Option::is_none)
    }

    /// Old ordinals that map to nothing.
    pub fn discarded(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, target)| target.is_none())
            .map(|(old, _)| old)
    }

    /// `(old, new)` pairs for every surviving ordinal.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(old, target)| target.map(|new| (old, new)))
    }

    /// Rearrange `old_values` into a list of `new_len` values. Slots nothing
    /// maps to are filled with `T::default()`.
    pub fn remap_values<T: Clone + Default>(&self, old_values: &[T], new_len: usize) -> Vec<T> {
        let mut out = vec![T::default(); new_len];
        for (old, new) in self.pairs() {
            if let (Some(value), Some(slot)) = (old_values.get(old), out.get_mut(new)) {
                *slot = value.clone();
            }
        }
        out
    }
}

/// Result of planning a notetype change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapPlan {
    pub old_notetype_id: NotetypeId,
    pub new_notetype_id: NotetypeId,
    pub field_map: RemapTable,
    pub card_map: RemapTable,
    /// Fields or cards would be removed, or new empty cards generated.
    pub data_loss: bool,
}

impl RemapPlan {
    pub fn is_same_notetype(&self) -> bool {
        self.old_notetype_id == self.new_notetype_id
    }

    /// Names of old fields whose content would be dropped.
    pub fn discarded_field_names<'a>(&'a self, old: &'a Notetype) -> Vec<&'a str> {
        self.field_map
            .discarded()
            .filter_map(|ord| old.fields.get(ord).map(|f| f.name.as_str()))
            .collect()
    }

    /// Names of old templates whose cards would be deleted.
    pub fn discarded_template_names<'a>(&'a self, old: &'a Notetype) -> Vec<&'a str> {
        self.card_map
            .discarded()
            .filter_map(|ord| old.templates.get(ord).map(|t| t.name.as_str()))
            .collect()
    }
}

/// Plan switching a note from `old` to `new`.
pub fn compute_remap(old: &Notetype, new: &Notetype) -> RemapPlan {
    if old.id == new.id {
        return RemapPlan {
            old_notetype_id: old.id,
            new_notetype_id: new.id,
            field_map: RemapTable::identity(old.field_count()),
            card_map: RemapTable::identity(old.template_count()),
            data_loss: false,
        };
    }

    let field_map = RemapTable::positional(old.field_count(), new.field_count());
    let card_map = RemapTable::positional(old.template_count(), new.template_count());
    let data_loss = field_map.has_discarded()
        || card_map.has_discarded()
        || new.template_count() > old.template_count();

    tracing::debug!(
        old = old.id,
        new = new.id,
        data_loss,
        "computed notetype remap"
    );

    RemapPlan {
        old_notetype_id: old.id,
        new_notetype_id: new.id,
        field_map,
        card_map,
        data_loss,
    }
}

/// Plan switching a stored note whose cards have ordinals `card_ords`.
///
/// Cloze cards are numbered by deletion (`ord = N - 1`), so the card map
/// covers every ordinal the note actually has rather than the template
/// count. Any existing card without a target, and any card that would be
/// generated for an uncovered template, counts as data loss.
pub fn compute_note_remap(old: &Notetype, new: &Notetype, card_ords: &[usize]) -> RemapPlan {
    if old.id == new.id || card_ords.is_empty() {
        return compute_remap(old, new);
    }

    let old_card_count = card_ords
        .iter()
        .max()
        .map_or(0, |max| max + 1)
        .max(old.template_count());
    let field_map = RemapTable::positional(old.field_count(), new.field_count());
    let card_map = if old.is_cloze && new.is_cloze {
        RemapTable::identity(old_card_count)
    } else {
        RemapTable::positional(old_card_count, new.template_count())
    };

    let cards_lost = card_ords.iter().any(|ord| card_map.get(*ord).is_none());
    let kept: BTreeSet<usize> = card_ords.iter().filter_map(|ord| card_map.get(*ord)).collect();
    let cards_generated = !new.is_cloze && new.template_count() > kept.len();
    let data_loss = field_map.has_discarded() || cards_lost || cards_generated;

    tracing::debug!(
        old = old.id,
        new = new.id,
        cards = card_ords.len(),
        data_loss,
        "computed note remap"
    );

    RemapPlan {
        old_notetype_id: old.id,
        new_notetype_id: new.id,
        field_map,
        card_map,
        data_loss,
    }
}

/// Resolve both notetypes through the collection, then plan the change.
pub fn compute_remap_by_id<C: CollectionStore + ?Sized>(
    store: &C,
    old_id: NotetypeId,
    new_id: NotetypeId,
) -> Result<RemapPlan> {
    let old = store
        .get_notetype(old_id)?
        .ok_or(EditorError::NotetypeNotFound(old_id))?;
    let new = store
        .get_notetype(new_id)?
        .ok_or(EditorError::NotetypeNotFound(new_id))?;
    Ok(compute_remap(&old, &new))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::testing::MemoryCollection;
    use crate::types::{FieldDef, TemplateDef};
    use pretty_assertions::assert_eq;

    fn notetype(id: i64, fields: usize, templates: usize) -> Notetype {
        Notetype {
            id,
            name: format!("Type {}", id),
            is_cloze: false,
            fields: (0..fields).map(|i| FieldDef::new(format!("F{}", i))).collect(),
            templates: (0..templates)
                .map(|i| TemplateDef::new(format!("T{}", i)))
                .collect(),
        }
    }

    #[test]
    fn fewer_fields_discards_trailing() {
        let plan = compute_remap(&notetype(1, 3, 1), &notetype(2, 2, 1));
        assert_eq!(plan.field_map.get(0), Some(0));
        assert_eq!(plan.field_map.get(1), Some(1));
        assert!(plan.field_map.is_discarded(2));
        assert_eq!(plan.card_map, RemapTable::identity(1));
        assert!(plan.data_loss);
    }

    #[test]
    fn same_notetype_is_identity() {
        let a = notetype(1, 3, 2);
        let plan = compute_remap(&a, &a);
        assert_eq!(plan.field_map, RemapTable::identity(3));
        assert_eq!(plan.card_map, RemapTable::identity(2));
        assert!(!plan.data_loss);
        assert!(plan.is_same_notetype());
    }

    #[test]
    fn more_fields_same_templates_is_lossless() {
        let plan = compute_remap(&notetype(1, 2, 1), &notetype(2, 4, 1));
        assert_eq!(plan.field_map.pairs().collect::<Vec<_>>(), vec![(0, 0), (1, 1)]);
        assert!(!plan.data_loss);
    }

    #[test]
    fn extra_templates_flag_data_loss() {
        let plan = compute_remap(&notetype(1, 2, 1), &notetype(2, 2, 2));
        assert!(!plan.card_map.has_discarded());
        assert!(plan.data_loss);
    }

    #[test]
    fn dropped_template_flags_data_loss() {
        let old = notetype(1, 2, 2);
        let plan = compute_remap(&old, &notetype(2, 2, 1));
        assert!(plan.card_map.is_discarded(1));
        assert!(plan.data_loss);
        assert_eq!(plan.discarded_template_names(&old), vec!["T1"]);
        assert!(plan.discarded_field_names(&old).is_empty());
    }

    fn cloze_type(id: i64) -> Notetype {
        Notetype {
            is_cloze: true,
            ..notetype(id, 2, 1)
        }
    }

    #[test]
    fn cloze_cards_beyond_templates_are_discarded() {
        let old = cloze_type(1);
        let plan = compute_note_remap(&old, &notetype(2, 2, 1), &[0, 1, 2]);
        assert_eq!(plan.card_map.len(), 3);
        assert_eq!(plan.card_map.get(0), Some(0));
        assert!(plan.card_map.is_discarded(1));
        assert!(plan.card_map.is_discarded(2));
        assert!(plan.data_loss);

        // template-count plans never see the extra cloze cards
        assert!(!compute_remap(&old, &notetype(2, 2, 1)).data_loss);
    }

    #[test]
    fn cloze_to_cloze_keeps_every_card() {
        let plan = compute_note_remap(&cloze_type(1), &cloze_type(2), &[0, 2]);
        assert_eq!(plan.card_map, RemapTable::identity(3));
        assert!(!plan.data_loss);
    }

    #[test]
    fn note_remap_counts_cards_to_generate() {
        let old = notetype(1, 2, 1);
        assert!(!compute_note_remap(&old, &notetype(2, 2, 1), &[0]).data_loss);
        assert!(compute_note_remap(&old, &notetype(2, 2, 2), &[0]).data_loss);
        // into cloze, cards follow content rather than templates
        assert!(!compute_note_remap(&old, &cloze_type(2), &[0]).data_loss);
    }

    #[test]
    fn remap_values_moves_content() {
        let table = RemapTable::positional(3, 2);
        let old = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(table.remap_values(&old, 2), vec!["a", "b"]);

        let grow = RemapTable::positional(2, 3);
        assert_eq!(grow.remap_values(&old[..2], 3), vec!["a", "b", ""]);
    }

    #[test]
    fn unknown_notetype_fails_without_plan() {
        let store = MemoryCollection::with_notetypes(vec![notetype(1, 2, 1)]);
        let result = compute_remap_by_id(&store, 1, 99);
        assert!(matches!(result, Err(EditorError::NotetypeNotFound(99))));

        let plan = compute_remap_by_id(&store, 1, 1).unwrap();
        assert!(!plan.data_loss);
    }
}
