use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::groups::GroupId;
use crate::notes::{Note, NoteId, NoteRepository, ValueSelector, VaultChanges};
use crate::query::NoteFilter;

/// A note placed on the timeline. The axis value is memoised until invalidated.
#[derive(Debug)]
pub struct TimelineItem {
    note: Arc<Note>,
    selector: Arc<ValueSelector>,
    end_selector: Option<Arc<ValueSelector>>,
    value: Cell<Option<f64>>,
    length: Cell<Option<f64>>,
    group: Option<GroupId>,
}

impl TimelineItem {
    pub fn new(
        note: Arc<Note>,
        selector: Arc<ValueSelector>,
        end_selector: Option<Arc<ValueSelector>>,
    ) -> Self {
        Self {
            note,
            selector,
            end_selector,
            value: Cell::new(None),
            length: Cell::new(None),
            group: None,
        }
    }

    pub fn id(&self) -> &NoteId {
        &self.note.id
    }

    pub fn note(&self) -> &Arc<Note> {
        &self.note
    }

    pub fn value(&self) -> f64 {
        if let Some(value) = self.value.get() {
            return value;
        }
        let value = self.selector.select_or_zero(&self.note);
        self.value.set(Some(value));
        value
    }

    /// Distance from the value to the end property, zero when absent or not after the value.
    pub fn length(&self) -> f64 {
        if let Some(length) = self.length.get() {
            return length;
        }
        let length = self
            .end_selector
            .as_ref()
            .and_then(|selector| selector.select(&self.note))
            .map(|end| end - self.value())
            .filter(|length| *length > 0.0)
            .unwrap_or(0.0);
        self.length.set(Some(length));
        length
    }

    pub fn invalidate(&self) {
        self.value.set(None);
        self.length.set(None);
    }

    pub fn set_note(&mut self, note: Arc<Note>) {
        self.note = note;
        self.invalidate();
    }

    pub fn set_selector(&mut self, selector: Arc<ValueSelector>) {
        self.selector = selector;
        self.invalidate();
    }

    pub fn set_end_selector(&mut self, end_selector: Option<Arc<ValueSelector>>) {
        self.end_selector = end_selector;
        self.length.set(None);
    }

    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    pub fn set_group(&mut self, group: Option<GroupId>) {
        self.group = group;
    }
}

/// The filtered item set, kept in value order.
#[derive(Debug)]
pub struct TimelineItems {
    selector: Arc<ValueSelector>,
    end_selector: Option<Arc<ValueSelector>>,
    items: Vec<TimelineItem>,
    index_by_id: HashMap<NoteId, usize>,
    sorted: bool,
    revision: u64,
}

impl TimelineItems {
    pub fn new(selector: ValueSelector, end_selector: Option<ValueSelector>) -> Self {
        Self {
            selector: Arc::new(selector),
            end_selector: end_selector.map(Arc::new),
            items: Vec::new(),
            index_by_id: HashMap::new(),
            sorted: true,
            revision: 0,
        }
    }

    pub fn selector(&self) -> &ValueSelector {
        &self.selector
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Bumped whenever membership, order or values change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn items(&self) -> &[TimelineItem] {
        &self.items
    }

    pub fn get(&self, id: &NoteId) -> Option<&TimelineItem> {
        self.index_by_id.get(id).map(|&index| &self.items[index])
    }

    /// Index of the item in value order, valid until the next mutation.
    pub fn position(&self, id: &NoteId) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn get_mut(&mut self, id: &NoteId) -> Option<&mut TimelineItem> {
        self.index_by_id
            .get(id)
            .copied()
            .map(move |index| &mut self.items[index])
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TimelineItem> {
        self.items.iter_mut()
    }

    /// Replaces the membership with `notes`, reusing items that already exist.
    pub fn replace_all(&mut self, notes: impl IntoIterator<Item = Arc<Note>>) -> Vec<NoteId> {
        let mut previous = std::mem::take(&mut self.items)
            .into_iter()
            .map(|item| (item.id().clone(), item))
            .collect::<HashMap<_, _>>();
        let mut entered = Vec::new();

        for note in notes {
            let item = match previous.remove(&note.id) {
                Some(mut item) => {
                    if !Arc::ptr_eq(item.note(), &note) {
                        item.set_note(note);
                    }
                    item
                }
                None => {
                    entered.push(note.id.clone());
                    self.make_item(note)
                }
            };
            self.items.push(item);
        }

        self.mark_unsorted();
        entered
    }

    /// Adds a note, or refreshes it when already present. Returns true for new items.
    pub fn upsert(&mut self, note: Arc<Note>) -> bool {
        if let Some(item) = self.get_mut(&note.id) {
            item.set_note(note);
            self.mark_unsorted();
            return false;
        }

        let index = self.items.len();
        self.index_by_id.insert(note.id.clone(), index);
        let item = self.make_item(note);
        self.items.push(item);
        self.mark_unsorted();
        true
    }

    pub fn remove(&mut self, id: &NoteId) -> Option<TimelineItem> {
        let index = self.index_by_id.remove(id)?;
        let item = self.items.remove(index);
        self.reindex();
        self.revision = self.revision.wrapping_add(1);
        Some(item)
    }

    /// Applies a vault diff. Returns the ids of notes that entered the set.
    pub fn apply_changes(
        &mut self,
        repository: &impl NoteRepository,
        filter: &NoteFilter,
        changes: &VaultChanges,
    ) -> Vec<NoteId> {
        let mut entered = Vec::new();

        for id in &changes.deleted {
            self.remove(id);
        }

        for id in changes.created.iter().chain(&changes.modified) {
            match repository.note(id) {
                Some(note) if filter.matches(&note) => {
                    if self.upsert(note) {
                        entered.push(id.clone());
                    }
                }
                _ => {
                    self.remove(id);
                }
            }
        }

        entered
    }

    pub fn set_selector(&mut self, selector: ValueSelector) {
        if *self.selector == selector {
            return;
        }
        self.selector = Arc::new(selector);
        for item in &mut self.items {
            item.set_selector(Arc::clone(&self.selector));
        }
        self.mark_unsorted();
    }

    pub fn set_end_selector(&mut self, end_selector: Option<ValueSelector>) {
        if self.end_selector.as_deref() == end_selector.as_ref() {
            return;
        }
        self.end_selector = end_selector.map(Arc::new);
        for item in &mut self.items {
            item.set_end_selector(self.end_selector.clone());
        }
        self.revision = self.revision.wrapping_add(1);
    }

    /// Stable sort by value, only when membership or values changed since the last sort.
    pub fn ensure_sorted(&mut self) {
        if self.sorted {
            return;
        }
        self.items.sort_by(|a, b| a.value().total_cmp(&b.value()));
        self.reindex();
        self.sorted = true;
    }

    /// Smallest value and largest `value + length` across items.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.items.iter().fold(None, |bounds, item| {
            let start = item.value();
            let end = start + item.length();
            Some(match bounds {
                Some((min, max)) => (f64::min(min, start), f64::max(max, end)),
                None => (start, end),
            })
        })
    }

    fn make_item(&self, note: Arc<Note>) -> TimelineItem {
        TimelineItem::new(note, Arc::clone(&self.selector), self.end_selector.clone())
    }

    fn mark_unsorted(&mut self) {
        self.sorted = false;
        self.revision = self.revision.wrapping_add(1);
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index_by_id.clear();
        for (index, item) in self.items.iter().enumerate() {
            self.index_by_id.insert(item.id().clone(), index);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::{TimelineItem, TimelineItems};
    use crate::notes::{Note, NoteId, NoteRepository, ValueSelector, VaultChanges, test_note};
    use crate::query::NoteFilter;

    fn rank_items(ranks: &[(&str, i64)]) -> TimelineItems {
        let mut items = TimelineItems::new(ValueSelector::Number("rank".into()), None);
        items.replace_all(
            ranks
                .iter()
                .map(|(path, rank)| Arc::new(test_note(path, json!({ "rank": rank })))),
        );
        items.ensure_sorted();
        items
    }

    fn order(items: &TimelineItems) -> Vec<String> {
        items.items().iter().map(|item| item.id().to_string()).collect()
    }

    #[test]
    fn value_is_cached_until_invalidated() {
        let note = Arc::new(test_note("a.md", json!({ "rank": 4 })));
        let selector = Arc::new(ValueSelector::Number("rank".into()));
        let mut item = TimelineItem::new(note, selector, None);
        assert_eq!(item.value(), 4.0);

        item.set_note(Arc::new(test_note("a.md", json!({ "rank": 9 }))));
        assert_eq!(item.value(), 9.0);

        item.set_selector(Arc::new(ValueSelector::Created));
        assert_eq!(item.value(), 1_000.0);
    }

    #[test]
    fn length_uses_end_property() {
        let note = Arc::new(test_note("a.md", json!({ "start": 10, "end": 25 })));
        let item = TimelineItem::new(
            Arc::clone(&note),
            Arc::new(ValueSelector::Number("start".into())),
            Some(Arc::new(ValueSelector::Number("end".into()))),
        );
        assert_eq!(item.length(), 15.0);

        let reversed = TimelineItem::new(
            note,
            Arc::new(ValueSelector::Number("end".into())),
            Some(Arc::new(ValueSelector::Number("start".into()))),
        );
        assert_eq!(reversed.length(), 0.0);
    }

    #[test]
    fn keeps_items_sorted_by_value() {
        let items = rank_items(&[("c.md", 3), ("a.md", 1), ("b.md", 2)]);
        assert_eq!(order(&items), vec!["a.md", "b.md", "c.md"]);
        assert_eq!(items.bounds(), Some((1.0, 3.0)));
    }

    #[test]
    fn upsert_refreshes_and_resorts() {
        let mut items = rank_items(&[("a.md", 1), ("b.md", 2)]);

        assert!(!items.upsert(Arc::new(test_note("a.md", json!({ "rank": 5 })))));
        items.ensure_sorted();
        assert_eq!(order(&items), vec!["b.md", "a.md"]);
        assert_eq!(items.get(&NoteId::new("a.md")).map(|item| item.value()), Some(5.0));

        assert!(items.upsert(Arc::new(test_note("c.md", json!({ "rank": 0 })))));
        items.ensure_sorted();
        assert_eq!(order(&items), vec!["c.md", "b.md", "a.md"]);
    }

    #[test]
    fn remove_and_replace_all_report_membership() {
        let mut items = rank_items(&[("a.md", 1), ("b.md", 2)]);
        assert!(items.remove(&NoteId::new("a.md")).is_some());
        assert!(items.remove(&NoteId::new("a.md")).is_none());
        assert_eq!(order(&items), vec!["b.md"]);

        let entered = items.replace_all(vec![
            Arc::new(test_note("b.md", json!({ "rank": 2 }))),
            Arc::new(test_note("d.md", json!({ "rank": 4 }))),
        ]);
        assert_eq!(entered, vec![NoteId::new("d.md")]);
    }

    struct Notes(Vec<Arc<Note>>);

    impl NoteRepository for Notes {
        fn list_all(&self) -> Vec<Arc<Note>> {
            self.0.clone()
        }

        fn note(&self, id: &NoteId) -> Option<Arc<Note>> {
            self.0.iter().find(|note| &note.id == id).cloned()
        }
    }

    #[test]
    fn applies_vault_changes_through_the_filter() {
        let mut items = rank_items(&[("work/a.md", 1), ("work/b.md", 2)]);
        let repository = Notes(vec![
            Arc::new(test_note("work/a.md", json!({ "rank": 9 }))),
            Arc::new(test_note("work/c.md", json!({ "rank": 3 }))),
            Arc::new(test_note("home/d.md", json!({ "rank": 4 }))),
        ]);
        let changes = VaultChanges {
            created: vec![NoteId::new("work/c.md"), NoteId::new("home/d.md")],
            modified: vec![NoteId::new("work/a.md")],
            deleted: vec![NoteId::new("work/b.md")],
        };

        let entered = items.apply_changes(&repository, &NoteFilter::inclusive("work"), &changes);
        items.ensure_sorted();
        assert_eq!(entered, vec![NoteId::new("work/c.md")]);
        assert_eq!(order(&items), vec!["work/c.md", "work/a.md"]);
    }

    #[test]
    fn changing_selector_invalidates_every_item() {
        let mut items = rank_items(&[("a.md", 2), ("b.md", 1)]);
        items.set_selector(ValueSelector::Created);
        items.ensure_sorted();
        assert!(items.items().iter().all(|item| item.value() == 1_000.0));
        assert_eq!(order(&items), vec!["b.md", "a.md"]);
    }
}
