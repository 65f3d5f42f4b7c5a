use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use eframe::egui::{self, Align, Context, Layout};

use crate::groups::GroupEngine;
use crate::groups::palette::ColorCache;
use crate::notes::{
    NotePropertyRepository, NoteRepository, ValueSelector, Vault, VaultSnapshot, VaultWatcher,
};
use crate::settings::{SettingsStore, ViewMode, ViewState, load_document};
use crate::timeline::ruler::DisplayType;
use crate::timeline::{LayoutParams, Navigator, Scale, TimelineItems, TimelineLayout};

use super::super::canvas::{AXIS_PROPERTY_KINDS, resolve_saved_property, ruler_for};
use super::super::{LaunchConfig, ViewModel};

impl ViewModel {
    pub(in crate::app) fn new(
        ctx: &Context,
        config: &LaunchConfig,
        snapshot: VaultSnapshot,
    ) -> Self {
        let vault = Vault::from_snapshot(config.vault.clone(), snapshot);
        let fit_pending = !config.state_path.exists();
        let store = SettingsStore::new(load_document(&config.state_path));
        store.on_change(|namespace| tracing::trace!(namespace, "view state changed"));
        let mut view = ViewState::read(&store);

        let watcher = if config.watch {
            let repaint = ctx.clone();
            match VaultWatcher::start(vault.root(), move || repaint.request_repaint()) {
                Ok(watcher) => Some(watcher),
                Err(error) => {
                    tracing::warn!(error = %format!("{error:#}"), "vault watcher unavailable; changes on disk need a manual rescan");
                    None
                }
            }
        } else {
            None
        };

        let property = resolve_saved_property(&vault, &view.property);
        view.property = property.name.clone();
        let selector = ValueSelector::for_property(&property);
        let end_selector = view
            .display
            .end_property
            .as_deref()
            .and_then(|name| vault.property_by_name(name))
            .map(|property| ValueSelector::for_property(&property));
        let ruler = ruler_for(&selector);

        let filter = vault.inclusive_filter(&view.query);
        let mut items = TimelineItems::new(selector, end_selector);
        let entered = items.replace_all(vault.list_all_matching_filter(&filter));

        let mut groups = GroupEngine::from_settings(&view.groups);
        groups.assign_new_items(entered);
        let group_queries = groups
            .groups()
            .map(|group| (group.id(), group.query().to_owned()))
            .collect::<HashMap<_, _>>();

        let mut navigator = Navigator::new(Scale::or_unit(view.scale), view.focal_value);
        navigator.set_v_scroll(view.v_scroll);

        let layout = TimelineLayout::new(LayoutParams {
            point_diameter: view.display.point_size,
            ..LayoutParams::default()
        });
        let properties = vault.list_properties_of_types(&AXIS_PROPERTY_KINDS);

        tracing::info!(
            vault = %vault.root().display(),
            notes = vault.note_count(),
            items = items.len(),
            groups = groups.len(),
            property = %view.property,
            "timeline ready"
        );

        Self {
            vault,
            watcher,
            store,
            state_path: config.state_path.clone(),
            view,
            filter,
            properties,
            items,
            layout,
            layout_key: None,
            navigator,
            ruler,
            groups,
            group_queries,
            colors: ColorCache::default(),
            find: String::new(),
            find_cache: None,
            selected: None,
            drag: None,
            fit_pending,
            canvas_width: 0.0,
            last_save: Instant::now(),
            status: None,
            show_fps_bar: true,
            fps_current: 0.0,
            fps_samples: VecDeque::new(),
            visible_item_count: 0,
        }
    }

    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        self.update_fps_counter(ctx);
        self.poll_vault();
        if self.step_groups() {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| self.draw_top_bar(ui));

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_timeline(ui));

        self.persist(false);
    }

    fn draw_top_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("note-timeline");
            ui.separator();
            ui.label(format!("vault: {}", self.vault.root().display()));
            ui.label(format!("notes: {}", self.vault.note_count()));
            let axis = match self.ruler.display_type() {
                DisplayType::Date => "dates",
                DisplayType::Numeric => "numbers",
            };
            ui.label(format!("axis: {axis}"));
            if let Some((min, max)) = self.items.bounds() {
                let scale = self.navigator.scale();
                ui.label(format!(
                    "range: {} to {}",
                    self.ruler.format_value(min, scale),
                    self.ruler.format_value(max, scale)
                ));
            }
            ui.separator();

            if ui.button("Zoom in").clicked() {
                self.navigator.zoom_in(None);
            }
            if ui.button("Zoom out").clicked() {
                self.navigator.zoom_out(None);
            }
            if ui
                .button("Fit")
                .on_hover_text("Zoom so every item fits the canvas.")
                .clicked()
            {
                self.zoom_to_fit();
            }
            if ui.button("First").clicked() {
                self.items.ensure_sorted();
                self.navigator.scroll_to_first(self.items.items());
            }

            let mode_label = match self.view.mode {
                ViewMode::Edit => "Mode: edit",
                ViewMode::View => "Mode: view",
            };
            if ui
                .button(mode_label)
                .on_hover_text("Edit mode allows dragging items and double-click to create notes.")
                .clicked()
            {
                self.view.mode = self.view.mode.toggled();
                self.drag = None;
            }
            if self.watcher.is_none() && ui.button("Rescan").clicked() {
                self.rescan_vault();
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                if let Some(items_text) = self.visible_items_text() {
                    ui.label(items_text);
                }
                if let Some(fps_text) = self.fps_display_text() {
                    ui.label(fps_text);
                }
                if self.groups.is_busy() {
                    ui.spinner();
                    ui.label(format!("grouping {} items", self.groups.pending()));
                }
            });
        });

        if let Some(status) = &self.status {
            ui.colored_label(egui::Color32::from_rgb(240, 140, 110), status.as_str());
        }
    }
}
