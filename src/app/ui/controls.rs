use std::sync::Arc;

use eframe::egui::{self, Align, Layout, RichText, Ui};
use eframe::egui::color_picker::{Alpha, color_edit_button_srgba};

use crate::groups::GroupId;
use crate::groups::palette::to_hex;
use crate::notes::{Note, ValueSelector, sort_by_selected_value};

use super::super::ViewModel;

const FIND_RESULT_ROWS: usize = 50;

enum GroupAction {
    Query(GroupId, String),
    Recolor(GroupId, String),
    Move(GroupId, usize),
    Remove(GroupId),
    Add,
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Timeline");
        ui.separator();
        ui.add_space(4.0);

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                self.draw_property_controls(ui);
                ui.separator();
                self.draw_display_controls(ui);
                ui.separator();
                self.draw_filter_controls(ui);
                ui.separator();
                self.draw_group_controls(ui);
                ui.separator();
                self.draw_find_controls(ui);
            });
    }

    fn draw_property_controls(&mut self, ui: &mut Ui) {
        let current = self.view.property.clone();
        let mut chosen = None;
        egui::ComboBox::from_label("Sort by")
            .selected_text(current.as_str())
            .show_ui(ui, |ui| {
                for property in &self.properties {
                    let label = format!("{}  ({})", property.name, property.kind.label());
                    if ui
                        .selectable_label(property.name == current, label)
                        .clicked()
                    {
                        chosen = Some(property.name.clone());
                    }
                }
            })
            .response
            .on_hover_text("Property whose value places each note on the axis.");
        if let Some(name) = chosen {
            self.select_property(&name);
        }

        if matches!(self.items.selector(), ValueSelector::Number(_)) {
            let mut whole = self.view.uses_whole_numbers(&current);
            if ui
                .checkbox(&mut whole, "Use whole numbers")
                .on_hover_text("Round values written by dragging or creating notes.")
                .changed()
            {
                self.view.whole_numbers.insert(current.clone(), whole);
            }
        }

        let temporal = self.items.selector().is_temporal();
        let current_end = self.view.display.end_property.clone();
        let mut chosen_end = None;
        egui::ComboBox::from_label("Ends at")
            .selected_text(current_end.as_deref().unwrap_or("none"))
            .show_ui(ui, |ui| {
                if ui.selectable_label(current_end.is_none(), "none").clicked() {
                    chosen_end = Some(None);
                }
                for property in self.properties.iter().filter(|property| {
                    property.name != current && property.kind.is_temporal() == temporal
                }) {
                    let selected = current_end.as_deref() == Some(property.name.as_str());
                    if ui.selectable_label(selected, property.name.as_str()).clicked() {
                        chosen_end = Some(Some(property.name.clone()));
                    }
                }
            })
            .response
            .on_hover_text("Optional property that turns items into ranges.");
        if let Some(end) = chosen_end {
            self.select_end_property(end);
        }
    }

    fn draw_display_controls(&mut self, ui: &mut Ui) {
        ui.add(
            egui::Slider::new(&mut self.view.display.point_size, 6.0..=32.0)
                .step_by(1.0)
                .text("Point size"),
        )
        .on_hover_text("Diameter of each item in pixels.");
        ui.checkbox(&mut self.view.display.show_ruler, "Show ruler");
        ui.checkbox(&mut self.show_fps_bar, "FPS display")
            .on_hover_text("Show a live FPS readout in the header.");
    }

    fn draw_filter_controls(&mut self, ui: &mut Ui) {
        ui.label("Filter")
            .on_hover_text("Path query, e.g. `work -draft` or `(meeting OR call) notes/`.");
        let response = ui.text_edit_singleline(&mut self.view.query);
        if response.changed() {
            self.apply_query();
        }
        let normalized = self.filter.normalized_query();
        if !normalized.is_empty() && normalized != self.view.query.trim() {
            ui.small(format!("read as: {normalized}"));
        }
        ui.small(format!("{} of {} notes shown", self.items.len(), self.vault.note_count()));
    }

    fn draw_group_controls(&mut self, ui: &mut Ui) {
        let mut actions = Vec::new();
        let count = self.groups.len();

        egui::CollapsingHeader::new("Groups")
            .default_open(true)
            .show(ui, |ui| {
                if self.groups.is_empty() {
                    ui.small("No groups yet. Add one to colour matching notes.");
                } else {
                    ui.small("Later groups win when a note matches several.");
                }
                for (position, group) in self.groups.groups().enumerate() {
                    let id = group.id();
                    ui.horizontal(|ui| {
                        let mut color = self.colors.color(group.color());
                        if color_edit_button_srgba(ui, &mut color, Alpha::Opaque).changed() {
                            actions.push(GroupAction::Recolor(id, to_hex(color)));
                        }

                        let query = self
                            .group_queries
                            .entry(id)
                            .or_insert_with(|| group.query().to_owned());
                        let response = ui.add(
                            egui::TextEdit::singleline(&mut *query)
                                .hint_text("query")
                                .desired_width(150.0),
                        );
                        if response.changed() {
                            actions.push(GroupAction::Query(id, query.clone()));
                        }

                        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                            if ui.small_button("x").on_hover_text("Remove group").clicked() {
                                actions.push(GroupAction::Remove(id));
                            }
                            if ui
                                .add_enabled(position + 1 < count, egui::Button::new("v").small())
                                .clicked()
                            {
                                actions.push(GroupAction::Move(id, position + 1));
                            }
                            if ui
                                .add_enabled(position > 0, egui::Button::new("^").small())
                                .clicked()
                            {
                                actions.push(GroupAction::Move(id, position.saturating_sub(1)));
                            }
                        });
                    });
                }

                if ui.button("Add group").clicked() {
                    actions.push(GroupAction::Add);
                }
            });

        for action in actions {
            match action {
                GroupAction::Query(id, query) => {
                    self.groups.apply_query_to_group(id, &query, &mut self.items);
                }
                GroupAction::Recolor(id, color) => self.groups.recolor_group(id, &color),
                GroupAction::Move(id, to_index) => {
                    self.groups.reorder_group(id, to_index, &mut self.items);
                }
                GroupAction::Remove(id) => {
                    self.groups.remove_group(id, &mut self.items);
                    self.group_queries.remove(&id);
                }
                GroupAction::Add => {
                    let id = self.groups.create_new_group();
                    self.group_queries.insert(id, String::new());
                }
            }
        }
    }

    fn draw_find_controls(&mut self, ui: &mut Ui) {
        ui.label("Find note")
            .on_hover_text("Fuzzy-highlight items by name; click a result to jump to it.");
        ui.text_edit_singleline(&mut self.find);

        let Some(matches) = self.cached_find_matches() else {
            return;
        };

        let mut notes = matches
            .iter()
            .filter_map(|id| self.items.get(id))
            .map(|item| Arc::clone(item.note()))
            .collect::<Vec<Arc<Note>>>();
        sort_by_selected_value(&mut notes, self.items.selector(), |note| note.as_ref());

        ui.small(format!("{} matches", notes.len()));
        let mut jump_to = None;
        egui::ScrollArea::vertical()
            .id_salt("find_results_scroll")
            .max_height(220.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for note in notes.iter().take(FIND_RESULT_ROWS) {
                    let is_selected = self.selected.as_ref() == Some(&note.id);
                    let text = if is_selected {
                        RichText::new(note.name.as_str()).strong()
                    } else {
                        RichText::new(note.name.as_str())
                    };
                    if ui
                        .selectable_label(is_selected, text)
                        .on_hover_text(note.path())
                        .clicked()
                    {
                        jump_to = Some(note.id.clone());
                    }
                }
            });

        if let Some(id) = jump_to
            && let Some(item) = self.items.get(&id)
        {
            self.navigator.scroll_to_value(item.value());
            self.selected = Some(id);
        }
    }
}
