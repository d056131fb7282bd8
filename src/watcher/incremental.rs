use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::debug;

use crate::graph::DependencyGraph;
use crate::paths::normalize_path;
use crate::query::affected::affected_tests;

use super::event::WatchEvent;

/// What one debounced batch of events did to the graph.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchOutcome {
    /// Existing test files affected by the batch.
    pub affected_tests: BTreeSet<PathBuf>,
    /// A config or manifest changed: the caller must re-register every project.
    pub reload: bool,
    pub removed: usize,
    pub refreshed: usize,
}

/// Apply a batch of watch events to `graph` and compute the tests they affect.
///
/// Deleted files are queried before they are torn down, since afterwards nothing
/// points at them. Modified files are refreshed in place, then queried. A config
/// change short-circuits: the caller reloads the workspace instead.
pub fn handle_batch(graph: &mut DependencyGraph, events: &[WatchEvent]) -> BatchOutcome {
    if events.iter().any(|e| matches!(e, WatchEvent::ConfigChanged)) {
        debug!("config changed; reload requested");
        return BatchOutcome {
            reload: true,
            ..BatchOutcome::default()
        };
    }

    // last event per path wins
    let mut latest: BTreeMap<PathBuf, bool> = BTreeMap::new();
    for event in events {
        match event {
            WatchEvent::Modified(path) => {
                latest.insert(normalize_path(path), true);
            }
            WatchEvent::Deleted(path) => {
                latest.insert(normalize_path(path), false);
            }
            WatchEvent::ConfigChanged => {}
        }
    }
    let (modified, deleted): (Vec<_>, Vec<_>) = latest.into_iter().partition(|(_, exists)| *exists);
    let modified: Vec<PathBuf> = modified.into_iter().map(|(p, _)| p).collect();
    let deleted: Vec<PathBuf> = deleted.into_iter().map(|(p, _)| p).collect();

    graph.build_graph();
    let mut outcome = BatchOutcome::default();

    if !deleted.is_empty() {
        outcome.affected_tests.extend(affected_tests(graph, &deleted));
        outcome.removed = graph.invalidate_files(&deleted);
    }

    if !modified.is_empty() {
        outcome.refreshed = graph.refresh_files(&modified);
        // new files leave the graph stale
        outcome
            .affected_tests
            .extend(graph.find_affected_tests(&modified));
    }

    for path in &deleted {
        outcome.affected_tests.remove(path);
    }
    debug!(
        removed = outcome.removed,
        refreshed = outcome.refreshed,
        affected = outcome.affected_tests.len(),
        "applied watch batch"
    );
    outcome
}
