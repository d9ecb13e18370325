//! Common test utilities and fixtures for integration tests.
//!
//! Every test gets a fresh in-memory collection seeded with the stock
//! notetypes from [`fixtures`].

#![allow(dead_code)]

pub mod fixtures;

use note_collection::{EditorHost, NotetypeRepository, SqliteCollection};
use note_editor_core::{CollectionStore, Note, NoteId, NotetypeId};

/// Seeded collection plus the ids of its notetypes.
pub struct TestContext {
    pub collection: SqliteCollection,
    pub basic: NotetypeId,
    pub reversed: NotetypeId,
    pub cloze: NotetypeId,
    pub single: NotetypeId,
}

impl TestContext {
    pub fn new() -> Self {
        note_collection::init_tracing();

        let mut collection =
            SqliteCollection::open_in_memory().expect("Failed to open in-memory collection");
        let basic = collection.add_notetype(&fixtures::basic()).unwrap();
        let reversed = collection.add_notetype(&fixtures::reversed()).unwrap();
        let cloze = collection.add_notetype(&fixtures::cloze()).unwrap();
        let single = collection.add_notetype(&fixtures::single_field()).unwrap();

        Self {
            collection,
            basic,
            reversed,
            cloze,
            single,
        }
    }

    /// Store a note and return it as loaded back from the collection.
    pub fn add_note(&mut self, notetype_id: NotetypeId, fields: &[&str]) -> Note {
        let id: NoteId = self
            .collection
            .add_note(&fixtures::note(notetype_id, fields))
            .expect("Failed to add note");
        self.collection.get_note(id).unwrap().unwrap()
    }

    /// Move the collection into a host.
    pub fn into_host(self) -> (EditorHost, Ids) {
        let ids = Ids {
            basic: self.basic,
            reversed: self.reversed,
            cloze: self.cloze,
            single: self.single,
        };
        (EditorHost::new(self.collection), ids)
    }
}

/// Notetype ids once the collection has moved into a host.
#[derive(Debug, Clone, Copy)]
pub struct Ids {
    pub basic: NotetypeId,
    pub reversed: NotetypeId,
    pub cloze: NotetypeId,
    pub single: NotetypeId,
}
