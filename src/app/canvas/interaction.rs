use eframe::egui::{self, Pos2, Rect, Ui};
use serde_json::Map;

use crate::errors::TimelineError;
use crate::notes::{MutableNoteRepository, NoteDraft, PropertyChanges};
use crate::settings::ViewMode;
use crate::timeline::ZoomAnchor;

use super::super::{ItemDrag, ViewModel};

impl ViewModel {
    pub(in crate::app) fn handle_timeline_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let (scroll, shift) = ui.input(|input| (input.raw_scroll_delta.y, input.modifiers.shift));
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        if shift {
            let max = self.max_v_scroll(rect);
            self.navigator.scroll_vertically(-f64::from(scroll), max);
            return;
        }

        let width = f64::from(rect.width());
        let anchor = ui.input(|input| input.pointer.hover_pos()).map(|pointer| {
            let at = f64::from(pointer.x - rect.left());
            ZoomAnchor {
                keep_value: self.navigator.value_at_offset(at, width),
                at,
                within: Some(width),
            }
        });

        if scroll > 0.0 {
            self.navigator.zoom_in(anchor);
        } else {
            self.navigator.zoom_out(anchor);
        }
    }

    /// Primary drag pans the view, or moves an item when one was grabbed in edit mode.
    pub(in crate::app) fn handle_timeline_drag(
        &mut self,
        rect: Rect,
        response: &egui::Response,
        hovered: Option<usize>,
    ) {
        if response.drag_started_by(egui::PointerButton::Primary)
            && self.view.mode == ViewMode::Edit
            && let Some(item) = hovered.and_then(|index| self.items.items().get(index))
            && self.value_is_editable(item.value())
        {
            self.drag = Some(ItemDrag {
                id: item.id().clone(),
                value: item.value(),
            });
        }

        if response.dragged() {
            let delta = response.drag_delta();
            let scale = self.navigator.scale();
            match self.drag.as_mut() {
                Some(drag) => drag.value += scale.to_value(f64::from(delta.x)),
                None => {
                    let max = self.max_v_scroll(rect);
                    self.navigator.pan_by_pixels(f64::from(delta.x));
                    self.navigator.scroll_vertically(-f64::from(delta.y), max);
                }
            }
        }

        if response.drag_stopped()
            && let Some(drag) = self.drag.take()
        {
            self.commit_drag(drag);
        }
    }

    /// Index into the item slice of the topmost item under the pointer.
    pub(in crate::app) fn hovered_item(&self, ui: &Ui, rect: Rect) -> Option<usize> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        if !rect.contains(pointer) {
            return None;
        }
        let (x, y) = self.to_layout_space(rect, pointer);
        self.layout.hit_test(x, y).map(|entry| entry.index)
    }

    pub(in crate::app) fn to_layout_space(&self, rect: Rect, pointer: Pos2) -> (f64, f64) {
        let width = f64::from(rect.width());
        let offset = f64::from(pointer.x - rect.left());
        let x = offset - (width / 2.0).floor()
            + self.navigator.scale().to_pixels(self.navigator.focal_value()) as f64;
        let y = f64::from(pointer.y - rect.top()) + self.navigator.v_scroll();
        (x, y)
    }

    pub(in crate::app) fn max_v_scroll(&self, rect: Rect) -> f64 {
        (self.layout.content_height() - f64::from(rect.height())).max(0.0)
    }

    fn value_is_editable(&self, value: f64) -> bool {
        self.items.selector().to_property_value(value, false).is_some()
    }

    fn commit_drag(&mut self, drag: ItemDrag) {
        let selector = self.items.selector().clone();
        let whole = self.view.uses_whole_numbers(selector.property_name());
        let Some(value) = selector.to_property_value(drag.value, whole) else {
            return;
        };

        let changes = PropertyChanges::default().with(selector.property_name(), value);
        match self.vault.modify_note(&drag.id, &changes) {
            Ok(_) => {
                self.status = None;
                self.refresh_note(&drag.id);
            }
            Err(TimelineError::NoteNotFound(_)) => {
                tracing::warn!(note = %drag.id, "dragged note disappeared before the edit was saved");
                self.refresh_note(&drag.id);
            }
            Err(error) => {
                tracing::warn!(note = %drag.id, error = %error, "failed to save dragged value");
                self.status = Some(format!("Could not update {}: {error}", drag.id));
            }
        }
    }

    /// Creates a note whose sort property sits at the pointer's value.
    pub(in crate::app) fn create_note_at(&mut self, rect: Rect, pointer: Pos2) {
        let width = f64::from(rect.width());
        let value = self
            .navigator
            .value_at_offset(f64::from(pointer.x - rect.left()), width);

        let selector = self.items.selector().clone();
        let whole = self.view.uses_whole_numbers(selector.property_name());
        let mut properties = Map::new();
        if let Some(property_value) = selector.to_property_value(value, whole) {
            properties.insert(selector.property_name().to_owned(), property_value);
        }

        match self.vault.create_note(NoteDraft {
            folder: String::new(),
            name: None,
            properties,
        }) {
            Ok(note) => {
                tracing::info!(note = %note.id, value, "created note from timeline");
                self.status = None;
                self.refresh_note(&note.id);
                if self.items.get(&note.id).is_some() {
                    self.selected = Some(note.id.clone());
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "failed to create note");
                self.status = Some(format!("Could not create a note: {error}"));
            }
        }
    }
}
