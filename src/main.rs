mod app;
mod errors;
mod groups;
mod notes;
mod process;
mod query;
mod settings;
mod timeline;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

const STATE_FILE: &str = ".note-timeline/view.json";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Folder of markdown notes to place on the timeline.
    #[arg(default_value = ".")]
    vault: PathBuf,

    /// View state file. Defaults to `.note-timeline/view.json` inside the vault.
    #[arg(long)]
    state: Option<PathBuf>,

    /// Tracing filter, e.g. `info` or `note_timeline=debug`. Overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,

    /// Do not watch the vault for changes made by other programs.
    #[arg(long)]
    no_watch: bool,
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    let state_path = args
        .state
        .clone()
        .unwrap_or_else(|| args.vault.join(STATE_FILE));
    let config = app::LaunchConfig {
        vault: args.vault,
        state_path,
        watch: !args.no_watch,
    };

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "note-timeline",
        options,
        Box::new(move |cc| Ok(Box::new(app::TimelineApp::new(cc, config)))),
    )
}
