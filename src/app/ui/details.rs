use chrono::DateTime;
use eframe::egui::{self, RichText, Ui};
use serde_json::Value;

use super::super::ViewModel;

fn format_millis(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|date| date.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn format_property(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(entries) => entries
            .iter()
            .map(format_property)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let Some(selected_id) = self.selected.clone() else {
            ui.label("Select an item on the timeline or from the find results.");
            return;
        };

        let Some(item) = self.items.get(&selected_id) else {
            ui.label("Selected note is no longer on the timeline.");
            return;
        };

        let note = item.note();
        let scale = self.navigator.scale();
        ui.label(RichText::new(note.name.as_str()).strong());
        ui.small(note.path());
        ui.add_space(6.0);

        ui.label(format!("Created: {}", format_millis(note.created)));
        ui.label(format!("Modified: {}", format_millis(note.modified)));
        ui.label(format!(
            "{}: {}",
            self.items.selector().property_name(),
            self.ruler.format_value(item.value(), scale)
        ));
        if item.length() > 0.0 {
            ui.label(format!(
                "Ends: {}",
                self.ruler.format_value(item.value() + item.length(), scale)
            ));
        }

        let group = item.group().and_then(|id| self.groups.group(id));
        match group {
            Some(group) => {
                ui.label(format!("Group: {} ({})", group.query(), group.color()));
            }
            None => {
                ui.label("Group: none");
            }
        }

        ui.separator();
        ui.label(RichText::new("Frontmatter").strong());
        if note.properties.is_empty() {
            ui.label("No properties.");
            return;
        }

        egui::Grid::new("frontmatter_grid")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                for (name, value) in &note.properties {
                    ui.label(name.as_str());
                    ui.label(format_property(value));
                    ui.end_row();
                }
            });

        ui.add_space(8.0);
        if ui.button("Center on timeline").clicked() {
            let value = item.value();
            self.navigator.scroll_to_value(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{format_millis, format_property};

    #[test]
    fn formats_dates_and_properties_for_display() {
        assert_eq!(format_millis(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_property(&json!("text")), "text");
        assert_eq!(format_property(&json!(["a", 2])), "a, 2");
        assert_eq!(format_property(&json!(true)), "true");
    }
}
