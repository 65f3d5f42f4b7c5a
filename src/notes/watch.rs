use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};

const DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches a vault for markdown changes and reports when a rescan is due.
pub struct VaultWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    rx: Receiver<()>,
}

impl VaultWatcher {
    /// `on_change` runs on the watcher thread after each settled burst of note events.
    pub fn start(root: &Path, on_change: impl Fn() + Send + 'static) -> Result<Self> {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let (tx, rx) = mpsc::channel();
        let watched_root = root.clone();

        let mut debouncer = new_debouncer(DEBOUNCE, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    if touches_note(&watched_root, events.iter().map(|event| &event.path)) {
                        let _ = tx.send(());
                        on_change();
                    }
                }
                Err(error) => tracing::warn!(error = %error, "vault watcher error"),
            }
        })
        .context("failed to create file watcher")?;

        debouncer
            .watcher()
            .watch(&root, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", root.display()))?;

        Ok(Self {
            _debouncer: debouncer,
            rx,
        })
    }

    /// Drains settled change notifications. Returns true when a rescan is due.
    pub fn poll(&mut self) -> bool {
        self.rx.try_iter().count() > 0
    }
}

fn touches_note<'a>(root: &Path, mut paths: impl Iterator<Item = &'a PathBuf>) -> bool {
    paths.any(|path| is_note_path(path.strip_prefix(root).unwrap_or(path)))
}

fn is_note_path(path: &Path) -> bool {
    let hidden = path
        .components()
        .any(|component| component.as_os_str().to_string_lossy().starts_with('.'));
    !hidden && path.extension().is_some_and(|ext| ext == "md")
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::mpsc;
    use std::time::Duration;

    use super::{VaultWatcher, is_note_path, touches_note};

    #[test]
    fn only_visible_markdown_counts() {
        assert!(is_note_path(Path::new("work/a.md")));
        assert!(!is_note_path(Path::new(".obsidian/a.md")));
        assert!(!is_note_path(Path::new("a.txt")));
    }

    #[test]
    fn paths_are_judged_relative_to_the_vault() {
        let root = Path::new("/vault/.hidden-parent");
        let inside = [PathBuf::from("/vault/.hidden-parent/notes/a.md")];
        assert!(touches_note(root, inside.iter()));

        let config = [PathBuf::from("/vault/.hidden-parent/.obsidian/types.md")];
        assert!(!touches_note(root, config.iter()));
    }

    #[test]
    fn settled_note_changes_wake_the_caller() {
        let dir = tempfile::tempdir().expect("temp vault");
        let (woke_tx, woke_rx) = mpsc::channel();
        let mut watcher = VaultWatcher::start(dir.path(), move || {
            let _ = woke_tx.send(());
        })
        .expect("start watcher");
        assert!(!watcher.poll());

        fs::write(dir.path().join("new.md"), "---\nrank: 1\n---\n").expect("write note");

        woke_rx
            .recv_timeout(Duration::from_secs(10))
            .expect("watcher callback after the debounce window");
        assert!(watcher.poll());
        assert!(!watcher.poll());
    }
}
