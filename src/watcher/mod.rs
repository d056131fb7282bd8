pub mod event;
pub mod incremental;

use std::path::Path;
use std::time::Duration;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use tokio::sync::mpsc as tokio_mpsc;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::config::CONFIG_FILE;
use crate::parser::languages::SOURCE_EXTENSIONS;

use event::WatchEvent;

/// Handle to a running watcher. Keeps the debouncer alive (dropping stops watching).
pub struct WatcherHandle {
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    /// Forwards events from the notify thread into the tokio channel.
    _bridge_task: JoinHandle<()>,
}

/// File basenames whose change re-registers every project.
const CONFIG_FILES: &[&str] = &[
    CONFIG_FILE,
    "package.json",
    "pnpm-workspace.yaml",
    "tsconfig.json",
];

const DEBOUNCE: Duration = Duration::from_millis(75);

/// Gitignore matcher for the workspace root's `.gitignore`; empty when there is none.
fn build_gitignore_matcher(root: &Path) -> Gitignore {
    let mut builder = GitignoreBuilder::new(root);
    let gitignore_path = root.join(".gitignore");
    if gitignore_path.exists()
        && let Some(err) = builder.add(&gitignore_path)
    {
        warn!(path = %gitignore_path.display(), %err, "cannot read .gitignore");
    }
    builder.build().unwrap_or_else(|err| {
        warn!(%err, "invalid .gitignore; watching everything");
        Gitignore::empty()
    })
}

/// Start a debounced, recursive watcher on `watch_root`.
///
/// Returns a `WatcherHandle` (must be kept alive) and a receiver of classified
/// events. Paths inside `node_modules` or ignored by the root `.gitignore` never
/// reach the receiver.
pub fn start_watcher(
    watch_root: &Path,
) -> anyhow::Result<(WatcherHandle, tokio_mpsc::Receiver<WatchEvent>)> {
    let (std_tx, std_rx) = std::sync::mpsc::channel::<DebounceEventResult>();

    let mut debouncer = new_debouncer(DEBOUNCE, move |res| {
        let _ = std_tx.send(res);
    })?;
    debouncer
        .watcher()
        .watch(watch_root, RecursiveMode::Recursive)?;

    let gitignore = build_gitignore_matcher(watch_root);
    let (tokio_tx, tokio_rx) = tokio_mpsc::channel::<WatchEvent>(256);

    let bridge_task = tokio::task::spawn_blocking(move || {
        while let Ok(result) = std_rx.recv() {
            match result {
                Ok(events) => {
                    for debounced_event in events {
                        let Some(event) = classify_event(&debounced_event.path, &gitignore) else {
                            continue;
                        };
                        if tokio_tx.blocking_send(event).is_err() {
                            // receiver dropped
                            return;
                        }
                    }
                }
                Err(err) => warn!(?err, "watch error"),
            }
        }
    });

    Ok((
        WatcherHandle {
            _debouncer: debouncer,
            _bridge_task: bridge_task,
        },
        tokio_rx,
    ))
}

/// Classify a changed path, or `None` if it is irrelevant.
///
/// Order: `node_modules`, `.gitignore`, config files, source extensions, then
/// existence decides between modified and deleted.
pub(crate) fn classify_event(path: &Path, gitignore: &Gitignore) -> Option<WatchEvent> {
    if path.components().any(|c| c.as_os_str() == "node_modules") {
        return None;
    }
    if path.starts_with(gitignore.path())
        && gitignore
            .matched_path_or_any_parents(path, path.is_dir())
            .is_ignore()
    {
        trace!(path = %path.display(), "ignored change");
        return None;
    }

    if let Some(file_name) = path.file_name().and_then(|n| n.to_str())
        && CONFIG_FILES.contains(&file_name)
    {
        return Some(WatchEvent::ConfigChanged);
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !SOURCE_EXTENSIONS.contains(&ext) {
        return None;
    }

    if path.exists() {
        Some(WatchEvent::Modified(path.to_path_buf()))
    } else {
        Some(WatchEvent::Deleted(path.to_path_buf()))
    }
}
