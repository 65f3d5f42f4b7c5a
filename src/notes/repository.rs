use std::sync::Arc;

use crate::errors::TimelineResult;
use crate::query::NoteFilter;

use super::note::{Note, NoteDraft, NoteId, PropertyChanges};
use super::property::{NoteProperty, PropertyKind};

pub trait NoteRepository {
    fn list_all(&self) -> Vec<Arc<Note>>;

    fn note(&self, id: &NoteId) -> Option<Arc<Note>>;

    fn list_all_matching_filter(&self, filter: &NoteFilter) -> Vec<Arc<Note>> {
        self.list_all()
            .into_iter()
            .filter(|note| filter.matches(note))
            .collect()
    }

    /// Empty query matches every note.
    fn inclusive_filter(&self, query: &str) -> NoteFilter {
        NoteFilter::inclusive(query)
    }
}

pub trait MutableNoteRepository: NoteRepository {
    fn create_note(&mut self, draft: NoteDraft) -> TimelineResult<Arc<Note>>;

    fn modify_note(&mut self, id: &NoteId, changes: &PropertyChanges) -> TimelineResult<Arc<Note>>;
}

pub trait NotePropertyRepository {
    fn list_properties_of_types(&self, kinds: &[PropertyKind]) -> Vec<NoteProperty>;

    fn property_by_name(&self, name: &str) -> Option<NoteProperty>;
}
