use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Instant;

use eframe::egui::{self, Context};

use crate::groups::palette::ColorCache;
use crate::groups::{GroupEngine, GroupId};
use crate::notes::{NoteId, NoteProperty, Vault, VaultSnapshot, VaultWatcher};
use crate::query::NoteFilter;
use crate::settings::{SettingsStore, ViewState};
use crate::timeline::ruler::Ruler;
use crate::timeline::{Navigator, TimelineItems, TimelineLayout};

mod canvas;
mod render_utils;
mod ui;

/// Where to load notes from and where to keep the view state.
#[derive(Clone, Debug)]
pub struct LaunchConfig {
    pub vault: PathBuf,
    pub state_path: PathBuf,
    pub watch: bool,
}

pub struct TimelineApp {
    config: LaunchConfig,
    state: AppState,
}

enum AppState {
    Loading {
        rx: Receiver<Result<VaultSnapshot, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    vault: Vault,
    watcher: Option<VaultWatcher>,
    store: SettingsStore,
    state_path: PathBuf,
    view: ViewState,
    filter: NoteFilter,
    properties: Vec<NoteProperty>,
    items: TimelineItems,
    layout: TimelineLayout,
    layout_key: Option<LayoutKey>,
    navigator: Navigator,
    ruler: Ruler,
    groups: GroupEngine,
    group_queries: HashMap<GroupId, String>,
    colors: ColorCache,
    find: String,
    find_cache: Option<FindCache>,
    selected: Option<NoteId>,
    drag: Option<ItemDrag>,
    fit_pending: bool,
    canvas_width: f64,
    last_save: Instant,
    status: Option<String>,
    show_fps_bar: bool,
    fps_current: f32,
    fps_samples: VecDeque<f32>,
    visible_item_count: usize,
}

/// Inputs the current layout was computed from.
#[derive(Clone, Copy, Debug, PartialEq)]
struct LayoutKey {
    items_revision: u64,
    value_per_pixel: f64,
    point_size: f64,
}

struct FindCache {
    query: String,
    items_revision: u64,
    matches: Arc<HashSet<NoteId>>,
}

/// An item being dragged to a new value in edit mode.
#[derive(Clone, Debug)]
struct ItemDrag {
    id: NoteId,
    value: f64,
}

impl TimelineApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: LaunchConfig) -> Self {
        let state = Self::start_load(&config);
        Self { config, state }
    }

    fn spawn_load(vault: PathBuf) -> Receiver<Result<VaultSnapshot, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = VaultSnapshot::scan(&vault).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(config: &LaunchConfig) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(config.vault.clone()),
        }
    }
}

impl eframe::App for TimelineApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(snapshot)) => {
                        transition = Some(AppState::Ready(Box::new(ViewModel::new(
                            ctx,
                            &self.config,
                            snapshot,
                        ))));
                    }
                    Ok(Err(error)) => transition = Some(AppState::Error(error)),
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition =
                            Some(AppState::Error("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Reading notes...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the vault");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(&self.config));
                    }
                });
            }
            AppState::Ready(model) => model.show(ctx),
        }

        if let Some(next_state) = transition {
            if let AppState::Error(error) = &next_state {
                tracing::warn!(vault = %self.config.vault.display(), error = %error, "vault load failed");
            }
            self.state = next_state;
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let AppState::Ready(model) = &mut self.state {
            model.persist(true);
        }
    }
}
