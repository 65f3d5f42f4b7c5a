use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::fmt;
use std::task::Poll;
use std::time::Duration;

use crate::notes::{Note, NoteId};
use crate::process::{BatchMode, LongProcess, ProcessError, ProcessIds};
use crate::query::NoteFilter;
use crate::settings::GroupSetting;
use crate::timeline::TimelineItems;

use super::palette::next_default_color;

const BATCH_SIZE: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group-{}", self.0)
    }
}

/// A coloured query. Empty queries match nothing.
#[derive(Clone, Debug)]
pub struct ItemGroup {
    id: GroupId,
    filter: NoteFilter,
    color: String,
}

impl ItemGroup {
    fn new(id: GroupId, query: &str, color: impl Into<String>) -> Self {
        Self {
            id,
            filter: NoteFilter::exclusive(query),
            color: color.into(),
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn query(&self) -> &str {
        self.filter.query()
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn matches(&self, note: &Note) -> bool {
        self.filter.matches(note)
    }
}

/// Ordered colour groups and the single in-flight re-evaluation over the item set.
///
/// Later groups win over earlier ones. Every mutation stops the running
/// process and folds its unprocessed items into the next run.
#[derive(Default)]
pub struct GroupEngine {
    groups: HashMap<GroupId, ItemGroup>,
    order: Vec<GroupId>,
    next_group: u64,
    process_ids: ProcessIds,
    process: Option<LongProcess<NoteId, Infallible>>,
}

impl GroupEngine {
    pub fn from_settings(settings: &[GroupSetting]) -> Self {
        let mut engine = Self::default();
        for setting in settings {
            let id = engine.allocate_id();
            engine
                .groups
                .insert(id, ItemGroup::new(id, &setting.query, setting.color.clone()));
            engine.order.push(id);
        }
        engine
    }

    pub fn to_settings(&self) -> Vec<GroupSetting> {
        self.groups()
            .map(|group| GroupSetting {
                query: group.query().to_owned(),
                color: group.color.clone(),
            })
            .collect()
    }

    pub fn groups(&self) -> impl Iterator<Item = &ItemGroup> {
        self.order.iter().filter_map(|id| self.groups.get(id))
    }

    pub fn group(&self, id: GroupId) -> Option<&ItemGroup> {
        self.groups.get(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_busy(&self) -> bool {
        self.process.is_some()
    }

    pub fn pending(&self) -> usize {
        self.process
            .as_ref()
            .map(|process| process.remaining().len())
            .unwrap_or(0)
    }

    pub fn color_of(&self, group: Option<GroupId>) -> Option<&str> {
        group
            .and_then(|id| self.groups.get(&id))
            .map(|group| group.color())
    }

    /// Appends a group with an empty query and the next unused palette colour.
    pub fn create_new_group(&mut self) -> GroupId {
        let color = next_default_color(self.groups().map(|group| group.color()));
        let id = self.allocate_id();
        self.groups.insert(id, ItemGroup::new(id, "", color));
        self.order.push(id);
        tracing::debug!(group = %id, color, "created group");
        self.restart(Vec::new());
        id
    }

    pub fn apply_query_to_group(&mut self, id: GroupId, query: &str, items: &mut TimelineItems) {
        let Some(position) = self.position(id) else {
            return;
        };
        if let Some(group) = self.groups.get_mut(&id) {
            group.filter = NoteFilter::exclusive(query);
        }

        // Items won by a later group keep their colour.
        let later = self.order[position + 1..].iter().copied().collect::<HashSet<_>>();
        let affected = take_matching(items, |group| {
            group.is_none_or(|group| !later.contains(&group))
        });
        tracing::debug!(group = %id, query, affected = affected.len(), "group query changed");
        self.restart(affected);
    }

    pub fn recolor_group(&mut self, id: GroupId, color: &str) {
        let Some(group) = self.groups.get_mut(&id) else {
            return;
        };
        group.color = color.to_owned();
        tracing::debug!(group = %id, color, "group recoloured");
        self.restart(Vec::new());
    }

    pub fn remove_group(&mut self, id: GroupId, items: &mut TimelineItems) {
        let Some(position) = self.position(id) else {
            return;
        };
        self.order.remove(position);
        self.groups.remove(&id);

        // Removal can only reveal matches for items that had this group or none.
        let affected = take_matching(items, |group| group.is_none() || group == Some(id));
        tracing::debug!(group = %id, affected = affected.len(), "group removed");
        self.restart(affected);
    }

    pub fn reorder_group(&mut self, id: GroupId, to_index: usize, items: &mut TimelineItems) {
        let Some(position) = self.position(id) else {
            return;
        };
        let to_index = to_index.min(self.order.len() - 1);
        if to_index == position {
            return;
        }
        let moved = self.order.remove(position);
        self.order.insert(to_index, moved);

        let affected = take_matching(items, |_| true);
        tracing::debug!(group = %id, to_index, affected = affected.len(), "group reordered");
        self.restart(affected);
    }

    /// Queues items that just entered the timeline for group selection.
    pub fn assign_new_items(&mut self, ids: Vec<NoteId>) {
        if ids.is_empty() && self.process.is_none() {
            return;
        }
        self.restart(ids);
    }

    /// Advances the running re-evaluation by one frame budget. Returns true while work remains.
    pub fn step(&mut self, items: &mut TimelineItems, budget: Duration) -> bool {
        let Some(mut process) = self.process.take() else {
            return false;
        };

        let groups = &self.groups;
        let order = &self.order;
        let poll = process.step(budget, |id| {
            if let Some(item) = items.get_mut(&id) {
                item.set_group(resolve(groups, order, item.note()));
            }
            Ok(())
        });

        match poll {
            Poll::Pending => {
                self.process = Some(process);
                true
            }
            Poll::Ready(Ok(())) | Poll::Ready(Err(ProcessError::Cancelled)) => {
                tracing::debug!(
                    process = %process.id(),
                    state = ?process.state(),
                    processed = process.processed(),
                    "group assignment finished"
                );
                false
            }
            Poll::Ready(Err(ProcessError::Failed(never))) => match never {},
        }
    }

    fn restart(&mut self, affected: Vec<NoteId>) {
        let mut queued = match self.process.take() {
            Some(mut previous) => {
                previous.stop();
                previous.into_remaining()
            }
            None => Vec::new(),
        };
        let mut seen = queued.iter().cloned().collect::<HashSet<_>>();
        for id in affected {
            if seen.insert(id.clone()) {
                queued.push(id);
            }
        }

        if queued.is_empty() {
            return;
        }
        let mode = if queued.len() < BATCH_SIZE {
            BatchMode::Sequential
        } else {
            BatchMode::Batched(BATCH_SIZE)
        };
        let id = self.process_ids.next_id();
        self.process = Some(LongProcess::new(id, queued, mode));
    }

    fn position(&self, id: GroupId) -> Option<usize> {
        self.order.iter().position(|candidate| *candidate == id)
    }

    fn allocate_id(&mut self) -> GroupId {
        self.next_group += 1;
        GroupId(self.next_group)
    }
}

fn resolve(
    groups: &HashMap<GroupId, ItemGroup>,
    order: &[GroupId],
    note: &Note,
) -> Option<GroupId> {
    order
        .iter()
        .rev()
        .filter_map(|id| groups.get(id))
        .find(|group| group.matches(note))
        .map(|group| group.id)
}

/// Ungroups items whose current group satisfies `affected` and returns their ids.
fn take_matching(
    items: &mut TimelineItems,
    affected: impl Fn(Option<GroupId>) -> bool,
) -> Vec<NoteId> {
    items
        .iter_mut()
        .filter(|item| affected(item.group()))
        .map(|item| {
            item.set_group(None);
            item.id().clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::{GroupEngine, GroupId};
    use crate::notes::{NoteId, ValueSelector, test_note};
    use crate::settings::GroupSetting;
    use crate::timeline::TimelineItems;

    const PATHS: [&str; 5] = [
        "work.md",
        "work/meeting.md",
        "personal/meeting.md",
        "complaints/work.md",
        "math/workings.md",
    ];

    fn items() -> TimelineItems {
        let mut items = TimelineItems::new(ValueSelector::Created, None);
        items.replace_all(PATHS.iter().map(|path| Arc::new(test_note(path, json!({})))));
        items.ensure_sorted();
        items
    }

    fn setting(query: &str, color: &str) -> GroupSetting {
        GroupSetting {
            query: query.into(),
            color: color.into(),
        }
    }

    fn assign_everything(engine: &mut GroupEngine, items: &TimelineItems) {
        engine.assign_new_items(items.items().iter().map(|item| item.id().clone()).collect());
    }

    fn settle(engine: &mut GroupEngine, items: &mut TimelineItems) {
        while engine.step(items, Duration::from_secs(60)) {}
    }

    fn colors(engine: &GroupEngine, items: &TimelineItems) -> Vec<Option<String>> {
        PATHS
            .iter()
            .map(|path| {
                let group = items.get(&NoteId::new(*path)).and_then(|item| item.group());
                engine.color_of(group).map(str::to_owned)
            })
            .collect()
    }

    fn ids(engine: &GroupEngine) -> Vec<GroupId> {
        engine.groups().map(|group| group.id()).collect()
    }

    #[test]
    fn last_matching_group_wins() {
        let mut items = items();
        let settings = [setting("meeting", "red"), setting("work", "blue")];
        let mut engine = GroupEngine::from_settings(&settings);
        assign_everything(&mut engine, &items);
        settle(&mut engine, &mut items);

        let red = Some("red".to_owned());
        let blue = Some("blue".to_owned());
        assert_eq!(
            colors(&engine, &items),
            vec![blue.clone(), blue.clone(), red, blue.clone(), blue]
        );
    }

    #[test]
    fn new_groups_match_nothing_and_take_the_next_colour() {
        let mut items = items();
        let mut engine = GroupEngine::default();
        let id = engine.create_new_group();
        assign_everything(&mut engine, &items);
        settle(&mut engine, &mut items);

        assert_eq!(engine.group(id).map(|group| group.color()), Some("#e05252"));
        assert!(colors(&engine, &items).iter().all(Option::is_none));

        let second = engine.create_new_group();
        assert_eq!(engine.group(second).map(|group| group.color()), Some("#e08a3c"));
    }

    #[test]
    fn requery_only_touches_earlier_and_ungrouped_items() {
        let mut items = items();
        let mut engine = GroupEngine::from_settings(&[setting("", "red"), setting("work", "blue")]);
        assign_everything(&mut engine, &items);
        settle(&mut engine, &mut items);
        let first = ids(&engine)[0];

        engine.apply_query_to_group(first, "meeting", &mut items);
        assert_eq!(engine.pending(), 1);
        settle(&mut engine, &mut items);

        let red = Some("red".to_owned());
        let blue = Some("blue".to_owned());
        assert_eq!(
            colors(&engine, &items),
            vec![blue.clone(), blue.clone(), red, blue.clone(), blue]
        );
    }

    #[test]
    fn requery_takes_over_items_from_earlier_groups() {
        let mut items = items();
        let mut engine = GroupEngine::from_settings(&[
            setting("meeting", "red"),
            setting("", "green"),
            setting("work", "blue"),
        ]);
        assign_everything(&mut engine, &items);
        settle(&mut engine, &mut items);
        let middle = ids(&engine)[1];

        engine.apply_query_to_group(middle, "personal OR work", &mut items);
        assert_eq!(engine.pending(), 1);
        settle(&mut engine, &mut items);

        let green = Some("green".to_owned());
        let blue = Some("blue".to_owned());
        assert_eq!(
            colors(&engine, &items),
            vec![blue.clone(), blue.clone(), green, blue.clone(), blue]
        );
    }

    #[test]
    fn recolor_keeps_assignments() {
        let mut items = items();
        let mut engine = GroupEngine::from_settings(&[setting("personal", "red")]);
        assign_everything(&mut engine, &items);
        settle(&mut engine, &mut items);

        let id = ids(&engine)[0];
        engine.recolor_group(id, "green");
        assert!(!engine.is_busy());
        assert_eq!(colors(&engine, &items)[2], Some("green".to_owned()));
    }

    #[test]
    fn removing_a_group_reveals_earlier_matches() {
        let mut items = items();
        let settings = [setting("meeting", "red"), setting("work", "blue")];
        let mut engine = GroupEngine::from_settings(&settings);
        assign_everything(&mut engine, &items);
        settle(&mut engine, &mut items);

        let blue = ids(&engine)[1];
        engine.remove_group(blue, &mut items);
        settle(&mut engine, &mut items);

        let red = Some("red".to_owned());
        assert_eq!(
            colors(&engine, &items),
            vec![None, red.clone(), red, None, None]
        );
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn reordering_re_evaluates_everything() {
        let mut items = items();
        let settings = [setting("meeting", "red"), setting("work", "blue")];
        let mut engine = GroupEngine::from_settings(&settings);
        assign_everything(&mut engine, &items);
        settle(&mut engine, &mut items);

        let blue = ids(&engine)[1];
        engine.reorder_group(blue, 0, &mut items);
        settle(&mut engine, &mut items);

        let red = Some("red".to_owned());
        let blue = Some("blue".to_owned());
        assert_eq!(
            colors(&engine, &items),
            vec![blue.clone(), red.clone(), red, blue.clone(), blue]
        );
        assert_eq!(
            engine.to_settings(),
            vec![setting("work", "blue"), setting("meeting", "red")]
        );
    }

    #[test]
    fn small_queues_yield_after_every_item() {
        let mut items = items();
        let mut engine = GroupEngine::from_settings(&[setting("work", "blue")]);
        assign_everything(&mut engine, &items);

        assert!(engine.step(&mut items, Duration::ZERO));
        assert_eq!(engine.pending(), 4);
    }

    #[test]
    fn mutations_carry_unfinished_work_forward() {
        let mut items = items();
        let mut engine = GroupEngine::from_settings(&[setting("work", "blue")]);
        assign_everything(&mut engine, &items);
        assert_eq!(engine.pending(), 5);

        engine.create_new_group();
        assert_eq!(engine.pending(), 5);

        engine.assign_new_items(vec![NoteId::new("work.md"), NoteId::new("late.md")]);
        assert_eq!(engine.pending(), 6);

        settle(&mut engine, &mut items);
        assert!(!engine.is_busy());
        assert_eq!(colors(&engine, &items)[0], Some("blue".to_owned()));
    }
}
