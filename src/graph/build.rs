use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use petgraph::stable_graph::NodeIndex;
use tracing::{debug, info};

use crate::paths::{normalize_path, with_appended_extension};
use crate::project::{Project, ResolveOptions};
use crate::resolver::is_bare_specifier;

use super::DependencyGraph;
use super::edge::{EdgeKind, ImportEdge};

/// Extensions tried when a package entry or subpath is written without one.
const ENTRY_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

impl DependencyGraph {
    /// Build the graph if it is stale; otherwise do nothing.
    ///
    /// Cost is proportional to the number of files times their import count, so
    /// every query goes through this guard instead of rebuilding.
    pub fn build_graph(&mut self) {
        if self.valid {
            return;
        }
        let started = Instant::now();

        self.graph.clear();
        self.file_index.clear();
        self.project_files.clear();
        self.reverse_index = None;

        // -------------------------------------------------------------------
        // Node phase: one node per enumerated file.
        // -------------------------------------------------------------------
        for project in 0..self.projects.len() {
            let root = self.projects[project].root().to_path_buf();
            self.project_files.entry(root).or_default();

            let files = self.projects[project].files().files();
            for file in files {
                let path = normalize_path(&file);
                if self.file_index.contains_key(&path) {
                    debug!(
                        file = %path.display(),
                        "file enumerated by two projects; keeping first owner"
                    );
                    continue;
                }
                self.insert_node(project, path);
            }
        }

        // -------------------------------------------------------------------
        // Edge phase: resolve every raw specifier, then link package references.
        // -------------------------------------------------------------------
        let nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        let mut package_references = 0;
        for idx in nodes {
            package_references += self.link_node(idx);
        }

        self.valid = true;
        self.package_references = package_references;
        self.build_duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let cross_project = self.cross_project_edge_count();
        info!(
            modules = self.module_count(),
            edges = self.edge_count(),
            cross_project,
            package_references,
            duration_ms = self.build_duration_ms,
            "built dependency graph"
        );
    }

    /// Install the outgoing edges of one node.
    ///
    /// Returns how many of its specifiers named another registered project's package.
    pub(crate) fn link_node(&mut self, from: NodeIndex) -> usize {
        let (path, project, raw_imports) = {
            let node = &self.graph[from];
            (node.path.clone(), node.project, node.raw_imports.clone())
        };
        if raw_imports.is_empty() {
            return 0;
        }

        let options = ResolveOptions::for_graph();
        let mut package_references = 0;
        for specifier in &raw_imports {
            let resolved = self.projects[project].resolve_quietly(&path, specifier, &options);

            let mut reached: HashSet<usize> = HashSet::new();
            for target in resolved {
                if let Some(&to) = self.file_index.get(&target) {
                    reached.insert(self.graph[to].project);
                    self.add_import_edge(from, to, EdgeKind::Resolved);
                }
            }

            let Some(target_project) = self.package_target(project, specifier) else {
                continue;
            };
            package_references += 1;
            if !self.options.link_package_imports || reached.contains(&target_project) {
                continue;
            }
            for to in self.package_entry_nodes(target_project, specifier) {
                self.add_import_edge(from, to, EdgeKind::PackageLink);
            }
        }
        package_references
    }

    /// Raw specifiers of one node that name another registered project's package.
    pub(crate) fn package_reference_count(&self, idx: NodeIndex) -> usize {
        let node = &self.graph[idx];
        node.raw_imports
            .iter()
            .filter(|specifier| self.package_target(node.project, specifier).is_some())
            .count()
    }

    /// Add `from -> to` unless it is a self-import or already present.
    fn add_import_edge(&mut self, from: NodeIndex, to: NodeIndex, kind: EdgeKind) -> bool {
        if from == to || self.graph.contains_edge(from, to) {
            return false;
        }
        let cross_project = self.graph[from].project_root != self.graph[to].project_root;
        self.graph
            .add_edge(from, to, ImportEdge { kind, cross_project });
        true
    }

    /// The registered project (other than `source`) whose package `specifier` names.
    ///
    /// When several names match (`@org/ui` and `@org/ui/icons` both registered),
    /// the longest one wins.
    pub(crate) fn package_target(&self, source: usize, specifier: &str) -> Option<usize> {
        if !is_bare_specifier(specifier) {
            return None;
        }
        let source_root = self.projects[source].root();
        self.package_index
            .iter()
            .filter(|(name, _)| Project::specifier_names_package(specifier, name))
            .filter(|(_, target)| self.projects[**target].root() != source_root)
            .max_by_key(|(name, _)| name.len())
            .map(|(_, &target)| target)
    }

    /// Nodes a package specifier stands for inside `target`.
    ///
    /// A subpath (`pkg/utils`) is looked up under the project root and its `src/`;
    /// a bare name (or a subpath that found nothing) goes through the manifest's
    /// entry fields, then `index.*` and `src/index.*`. When nothing matches, every
    /// file of the project is returned: running extra tests beats missing one.
    fn package_entry_nodes(&self, target: usize, specifier: &str) -> Vec<NodeIndex> {
        let project = &self.projects[target];
        let root = project.root();
        let subpath = project
            .package_name()
            .and_then(|name| specifier.strip_prefix(name))
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or("");

        if !subpath.is_empty() {
            for base in [root.join(subpath), root.join("src").join(subpath)] {
                if let Some(idx) = self.find_entry_module(&base) {
                    return vec![idx];
                }
            }
        }

        let mut entries: Vec<PathBuf> = project
            .manifest()
            .map(|m| m.entry_fields().map(|field| root.join(field)).collect())
            .unwrap_or_default();
        entries.push(root.join("index"));
        entries.push(root.join("src").join("index"));

        for entry in entries {
            if let Some(idx) = self.find_entry_module(&entry) {
                return vec![idx];
            }
        }

        debug!(
            specifier,
            project = %root.display(),
            "no entry module found; linking every file of the package"
        );
        self.project_files
            .get(root)
            .into_iter()
            .flatten()
            .filter_map(|file| self.file_index.get(file).copied())
            .collect()
    }

    /// Find a node for `base` as written, with an extension appended, or as a directory index.
    fn find_entry_module(&self, base: &Path) -> Option<NodeIndex> {
        let base = normalize_path(base);
        if let Some(&idx) = self.file_index.get(&base) {
            return Some(idx);
        }
        ENTRY_EXTENSIONS
            .iter()
            .map(|ext| with_appended_extension(&base, ext))
            .chain(
                ENTRY_EXTENSIONS
                    .iter()
                    .map(|ext| base.join(format!("index.{ext}"))),
            )
            .find_map(|candidate| self.file_index.get(&candidate).copied())
    }

    pub(crate) fn cross_project_edge_count(&self) -> usize {
        self.graph
            .edge_weights()
            .filter(|edge| edge.cross_project)
            .count()
    }
}
