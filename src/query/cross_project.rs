use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use petgraph::Direction;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::DependencyGraph;
use crate::graph::edge::EdgeKind;
use crate::paths::normalize_path;
use crate::project::ResolveOptions;

/// How [`DependencyGraph::find_files_in_project_depending_on_changed_paths`] picks
/// the target files it re-resolves. Both strategies return the same set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrossProjectStrategy {
    /// Re-resolve only the files the reverse index (or the graph) names for a
    /// changed path owned by another named project; scan everything otherwise.
    #[default]
    Indexed,
    /// Re-resolve every file of the target project for every changed path.
    FullScan,
}

impl DependencyGraph {
    /// Files of the project at `target_root` that directly depend on any of `changed`.
    ///
    /// Each candidate's raw specifiers are re-resolved through the target project's
    /// resolver; a candidate also counts when the graph already holds an edge from it
    /// to a changed file. Uses the strategy from [`GraphOptions`](crate::GraphOptions).
    pub fn find_files_in_project_depending_on_changed_paths<I, P>(
        &mut self,
        target_root: &Path,
        changed: I,
    ) -> BTreeSet<PathBuf>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let strategy = self.options.cross_project_strategy;
        self.find_files_depending_with(target_root, changed, strategy)
    }

    /// [`find_files_in_project_depending_on_changed_paths`](Self::find_files_in_project_depending_on_changed_paths)
    /// with an explicit strategy.
    pub fn find_files_depending_with<I, P>(
        &mut self,
        target_root: &Path,
        changed: I,
        strategy: CrossProjectStrategy,
    ) -> BTreeSet<PathBuf>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.build_graph();
        if strategy == CrossProjectStrategy::Indexed {
            self.build_reverse_index();
        }

        let Some(target) = self.project_position(target_root) else {
            debug!(root = %target_root.display(), "unknown target project");
            return BTreeSet::new();
        };
        let changed: BTreeSet<PathBuf> = changed
            .into_iter()
            .map(|p| normalize_path(p.as_ref()))
            .collect();

        files_depending_on(self, target, &changed, strategy)
    }
}

fn files_depending_on(
    graph: &DependencyGraph,
    target: usize,
    changed: &BTreeSet<PathBuf>,
    strategy: CrossProjectStrategy,
) -> BTreeSet<PathBuf> {
    let target_root = graph.projects[target].root();
    let all_files: Vec<&Path> = graph.files_in_project(target_root).collect();
    let mut resolved: HashMap<PathBuf, HashSet<PathBuf>> = HashMap::new();
    let mut result = BTreeSet::new();

    for path in changed {
        let indexed = match strategy {
            CrossProjectStrategy::Indexed => indexed_candidates(graph, target, path),
            CrossProjectStrategy::FullScan => None,
        };
        let candidates: Vec<&Path> = match &indexed {
            Some(set) => set.iter().copied().collect(),
            None => all_files.clone(),
        };
        debug!(
            changed = %path.display(),
            candidates = candidates.len(),
            pruned = indexed.is_some(),
            "checking target files"
        );

        for file in candidates {
            if result.contains(file) {
                continue;
            }
            if depends_on(graph, target, file, path, &mut resolved) {
                result.insert(file.to_path_buf());
            }
        }
    }
    result
}

/// The pruned candidate set for `changed`, or `None` when the full scan is needed.
///
/// Pruning only applies to a graph node owned by a different, named project:
/// anything the target can reach then goes through the package name (reverse
/// index) or already has a graph edge (importers).
fn indexed_candidates<'g>(
    graph: &'g DependencyGraph,
    target: usize,
    changed: &Path,
) -> Option<BTreeSet<&'g Path>> {
    let &idx = graph.file_index.get(changed)?;
    let target_root = graph.projects[target].root();
    let owner = &graph.projects[graph.graph[idx].project];
    if owner.root() == target_root {
        return None;
    }
    let package = owner.package_name()?;
    let index = graph.reverse_index.as_ref()?;

    let mut candidates: BTreeSet<&Path> = index
        .files_importing(target_root, package)
        .into_iter()
        .flatten()
        .map(PathBuf::as_path)
        .collect();
    candidates.extend(
        graph
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| &graph.graph[n])
            .filter(|node| node.project_root == target_root)
            .map(|node| node.path.as_path()),
    );
    Some(candidates)
}

/// Whether target file `file` depends on `changed` itself, by a resolved graph edge or
/// by re-resolution.
///
/// Package-link edges do not count: they stand for the package as a whole, not for
/// the changed file. Each file is resolved at most once per query.
fn depends_on(
    graph: &DependencyGraph,
    target: usize,
    file: &Path,
    changed: &Path,
    resolved: &mut HashMap<PathBuf, HashSet<PathBuf>>,
) -> bool {
    let Some(&from) = graph.file_index.get(file) else {
        return false;
    };
    if let Some(&to) = graph.file_index.get(changed)
        && let Some(edge) = graph.graph.find_edge(from, to)
        && graph.graph[edge].kind == EdgeKind::Resolved
    {
        return true;
    }

    resolved
        .entry(file.to_path_buf())
        .or_insert_with(|| {
            let project = &graph.projects[target];
            let options = ResolveOptions::default();
            graph.graph[from]
                .raw_imports
                .iter()
                .flat_map(|spec| project.resolve_quietly(file, spec, &options))
                .collect()
        })
        .contains(changed)
}
