use std::time::{Duration, Instant};

use crate::notes::{
    NoteId, NoteProperty, NotePropertyRepository, NoteRepository, PropertyKind, ValueSelector,
    Vault,
};
use crate::process::FRAME_BUDGET;
use crate::settings::save_document;
use crate::timeline::ruler::{DisplayType, Ruler};
use crate::timeline::LayoutParams;

use super::super::{LayoutKey, ViewModel};

const SAVE_INTERVAL: Duration = Duration::from_secs(1);

pub(in crate::app) const AXIS_PROPERTY_KINDS: [PropertyKind; 3] =
    [PropertyKind::Number, PropertyKind::Date, PropertyKind::DateTime];

/// Resolves the sort property restored from the view state, falling back to `created`
/// when the vault no longer has it.
pub(in crate::app) fn resolve_saved_property(vault: &Vault, name: &str) -> NoteProperty {
    vault.property_by_name(name).unwrap_or_else(|| {
        tracing::warn!(property = name, "saved sort property not found; using created");
        NoteProperty::created()
    })
}

pub(in crate::app) fn ruler_for(selector: &ValueSelector) -> Ruler {
    Ruler::for_display(if selector.is_temporal() {
        DisplayType::Date
    } else {
        DisplayType::Numeric
    })
}

impl ViewModel {
    pub(in crate::app) fn select_property(&mut self, name: &str) {
        let Some(property) = self.vault.property_by_name(name) else {
            return;
        };
        let selector = ValueSelector::for_property(&property);
        if *self.items.selector() == selector {
            return;
        }

        tracing::info!(property = %property.name, kind = property.kind.label(), "sorting by property");
        self.ruler = ruler_for(&selector);
        self.items.set_selector(selector);
        self.view.property = property.name;
        self.drag = None;
        self.fit_pending = true;
    }

    pub(in crate::app) fn select_end_property(&mut self, name: Option<String>) {
        let selector = name
            .as_deref()
            .and_then(|name| self.vault.property_by_name(name))
            .map(|property| ValueSelector::for_property(&property));
        self.items.set_end_selector(selector);
        self.view.display.end_property = name;
    }

    pub(in crate::app) fn apply_query(&mut self) {
        self.filter = self.vault.inclusive_filter(&self.view.query);
        let notes = self.vault.list_all_matching_filter(&self.filter);
        let entered = self.items.replace_all(notes);
        tracing::debug!(
            query = %self.filter.normalized_query(),
            items = self.items.len(),
            entered = entered.len(),
            "timeline filter applied"
        );
        self.groups.assign_new_items(entered);
        if self.selected.as_ref().is_some_and(|id| self.items.get(id).is_none()) {
            self.selected = None;
        }
    }

    /// Rescans once the watcher has settled.
    pub(in crate::app) fn poll_vault(&mut self) {
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };
        if watcher.poll() {
            self.rescan_vault();
        }
    }

    /// Folds the on-disk diff into the item set and queues changed items for grouping.
    pub(in crate::app) fn rescan_vault(&mut self) {
        let changes = match self.vault.rescan() {
            Ok(changes) => changes,
            Err(error) => {
                tracing::warn!(error = %format!("{error:#}"), "vault rescan failed");
                return;
            }
        };
        if changes.is_empty() {
            return;
        }

        let mut queued = self.items.apply_changes(&self.vault, &self.filter, &changes);
        queued.extend(
            changes
                .modified
                .iter()
                .filter(|id| self.items.get(id).is_some())
                .cloned(),
        );
        tracing::debug!(
            created = changes.created.len(),
            modified = changes.modified.len(),
            deleted = changes.deleted.len(),
            "vault changed on disk"
        );
        self.groups.assign_new_items(queued);
        self.properties = self.vault.list_properties_of_types(&AXIS_PROPERTY_KINDS);
        if self.selected.as_ref().is_some_and(|id| self.items.get(id).is_none()) {
            self.selected = None;
        }
    }

    /// Re-evaluates group membership for one note after it was edited in place.
    pub(in crate::app) fn refresh_note(&mut self, id: &NoteId) {
        let Some(note) = self.vault.note(id) else {
            self.items.remove(id);
            return;
        };
        if self.filter.matches(&note) {
            self.items.upsert(note);
            self.groups.assign_new_items(vec![id.clone()]);
        } else {
            self.items.remove(id);
        }
    }

    pub(in crate::app) fn step_groups(&mut self) -> bool {
        self.groups.step(&mut self.items, FRAME_BUDGET)
    }

    /// Brings the layout up to date with items, scale and point size.
    pub(in crate::app) fn ensure_layout(&mut self) {
        self.items.ensure_sorted();

        let key = LayoutKey {
            items_revision: self.items.revision(),
            value_per_pixel: self.navigator.scale().value_per_pixel(),
            point_size: self.view.display.point_size,
        };
        if self.layout_key == Some(key) {
            return;
        }

        if self.layout.params().point_diameter != key.point_size {
            self.layout.set_params(LayoutParams {
                point_diameter: key.point_size,
                ..self.layout.params()
            });
        }
        self.layout.update(self.items.items(), self.navigator.scale());
        self.layout_key = Some(key);
    }

    pub(in crate::app) fn zoom_to_fit(&mut self) {
        if self.canvas_width <= 0.0 {
            return;
        }
        self.navigator.zoom_to_fit(self.items.items(), self.canvas_width);
        self.navigator.set_v_scroll(0.0);
        self.fit_pending = false;
    }

    /// Copies live state into the document and writes it when something changed.
    pub(in crate::app) fn persist(&mut self, force: bool) {
        self.view.focal_value = self.navigator.focal_value();
        self.view.v_scroll = self.navigator.v_scroll();
        self.view.scale = self.navigator.scale().value_per_pixel();
        self.view.groups = self.groups.to_settings();
        self.view.write(&self.store);

        if !self.store.is_dirty() {
            return;
        }
        if !force && self.last_save.elapsed() < SAVE_INTERVAL {
            return;
        }

        self.store.take_dirty();
        self.last_save = Instant::now();
        if let Err(error) = save_document(&self.state_path, &self.store.snapshot()) {
            tracing::warn!(path = %self.state_path.display(), error = %format!("{error:#}"), "failed to save view state");
        }
    }
}
