use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{
    self, Align2, Color32, CornerRadius, FontId, Pos2, Rect, Sense, Stroke, Ui, vec2,
};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::groups::palette::UNGROUPED_COLOR;
use crate::notes::NoteId;
use crate::settings::ViewMode;

use super::super::render_utils::{dim_color, draw_background, draw_ruler, span_visible};
use super::super::{FindCache, ViewModel};

const HOVER_TINT: Color32 = Color32::from_rgb(255, 255, 255);
const SELECTED_TINT: Color32 = Color32::from_rgb(245, 206, 93);

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

impl ViewModel {
    /// Ids of items whose name fuzzy-matches the find box, cached per query and item revision.
    pub(in crate::app) fn cached_find_matches(&mut self) -> Option<Arc<HashSet<NoteId>>> {
        let query = self.find.trim();
        if query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.find_cache
            && cached.items_revision == self.items.revision()
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matcher = SkimMatcherV2::default();
        let matches = self
            .items
            .items()
            .iter()
            .filter(|item| fuzzy_match_score(&matcher, &item.note().name, query).is_some())
            .map(|item| item.id().clone())
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.find_cache = Some(FindCache {
            query: query.to_owned(),
            items_revision: self.items.revision(),
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }

    pub(in crate::app) fn draw_timeline(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        self.canvas_width = f64::from(rect.width());
        if self.fit_pending {
            self.zoom_to_fit();
        }

        draw_background(&painter, rect);

        self.handle_timeline_zoom(ui, rect, &response);
        self.ensure_layout();
        let hovered = self.hovered_item(ui, rect);
        self.handle_timeline_drag(rect, &response, hovered);
        self.ensure_layout();

        let max_scroll = self.max_v_scroll(rect);
        if self.navigator.v_scroll() > max_scroll {
            self.navigator.set_v_scroll(max_scroll);
        }

        if self.drag.is_some() || response.dragged() {
            ui.ctx().request_repaint();
        }
        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = if self.view.mode == ViewMode::Edit {
                    egui::CursorIcon::Grab
                } else {
                    egui::CursorIcon::PointingHand
                };
            });
        }

        let find_matches = self.cached_find_matches();
        let find_active = find_matches.as_ref().is_some_and(|matches| !matches.is_empty());
        let hovered_id = hovered
            .and_then(|index| self.items.items().get(index))
            .map(|item| item.id().clone());

        let width = self.canvas_width;
        let focal_pixels = self.navigator.scale().to_pixels(self.navigator.focal_value()) as f64;
        let origin_x = f64::from(rect.left()) + (width / 2.0).floor() - focal_pixels;
        let origin_y = f64::from(rect.top()) - self.navigator.v_scroll();
        let mut visible = 0usize;

        for entry in self.layout.entries() {
            let Some(item) = self.items.items().get(entry.index) else {
                continue;
            };
            let left = (origin_x + entry.left()) as f32;
            let right = (origin_x + entry.right()) as f32;
            let center_y = (origin_y + entry.center_y) as f32;
            let radius = entry.radius as f32;
            if !span_visible(rect, left, right, center_y, radius) {
                continue;
            }
            visible += 1;

            let group_color = match self.groups.color_of(item.group()) {
                Some(text) => self.colors.color(text),
                None => UNGROUPED_COLOR,
            };
            let is_selected = self.selected.as_ref() == Some(item.id());
            let is_hovered = hovered_id.as_ref() == Some(item.id());
            let is_match = find_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(item.id()));

            let color = if is_selected {
                self.colors.blend(group_color, SELECTED_TINT, 0.6)
            } else if is_hovered {
                self.colors.blend(group_color, HOVER_TINT, 0.35)
            } else if find_active && !is_match {
                dim_color(group_color, 0.38)
            } else {
                group_color
            };

            if entry.width > entry.height {
                let shape = Rect::from_min_max(
                    Pos2::new(left, center_y - radius),
                    Pos2::new(right, center_y + radius),
                );
                painter.rect_filled(shape, CornerRadius::same(radius.min(255.0) as u8), color);
            } else {
                painter.circle_filled(Pos2::new(left + radius, center_y), radius, color);
            }

            if is_match || is_selected {
                painter.circle_stroke(
                    Pos2::new(left + radius, center_y),
                    radius + 2.0,
                    Stroke::new(1.5, Color32::from_rgb(103, 196, 255)),
                );
            }
        }
        self.visible_item_count = visible;

        if let Some(drag) = &self.drag {
            let x = f64::from(rect.left()) + self.navigator.offset_of_value(drag.value, width);
            let y = self
                .items
                .position(&drag.id)
                .and_then(|index| self.layout.entries().get(index))
                .map(|entry| (origin_y + entry.center_y) as f32);
            if let Some(y) = y {
                let radius = (self.view.display.point_size / 2.0) as f32;
                painter.circle_stroke(
                    Pos2::new(x as f32, y),
                    radius,
                    Stroke::new(1.5, SELECTED_TINT),
                );
                painter.text(
                    Pos2::new(x as f32 + radius + 5.0, y),
                    Align2::LEFT_CENTER,
                    self.ruler.format_value(drag.value, self.navigator.scale()),
                    FontId::proportional(12.0),
                    Color32::from_gray(240),
                );
            }
        }

        if self.view.display.show_ruler {
            let first_value = self.navigator.value_at_offset(0.0, width);
            let labels = self
                .ruler
                .visible_labels(self.navigator.scale(), first_value, width);
            let positioned = labels
                .iter()
                .map(|label| {
                    let x = f64::from(rect.left())
                        + self.navigator.offset_of_value(label.value, width);
                    (x as f32, label)
                })
                .collect::<Vec<_>>();
            draw_ruler(&painter, rect, &positioned);
        }

        if let Some(item) = hovered_id.as_ref().and_then(|id| self.items.get(id)) {
            let panel_text = format!(
                "{}  |  {}",
                item.note().name,
                self.ruler.format_value(item.value(), self.navigator.scale())
            );
            painter.text(
                rect.left_bottom() + vec2(10.0, -10.0),
                Align2::LEFT_BOTTOM,
                panel_text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if response.double_clicked_by(egui::PointerButton::Primary)
            && hovered.is_none()
            && self.view.mode == ViewMode::Edit
            && let Some(pointer) = response.interact_pointer_pos()
        {
            self.create_note_at(rect, pointer);
        } else if response.clicked_by(egui::PointerButton::Primary) {
            self.selected = hovered_id;
        }
    }
}
