use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::project::Project;

use super::DependencyGraph;

/// Per project: which of its files import which other project's package.
///
/// Turns "scan every file of the target project" into a lookup when the changed
/// file belongs to a package the target imports by name.
#[derive(Debug, Clone, Default)]
pub struct ReverseIndex {
    by_project: HashMap<PathBuf, HashMap<String, BTreeSet<PathBuf>>>,
}

impl ReverseIndex {
    /// Index every node's raw specifiers against every other project's package name.
    pub fn build(graph: &DependencyGraph) -> Self {
        let packages: Vec<(&str, &Path)> = graph
            .projects
            .iter()
            .filter_map(|p| p.package_name().map(|name| (name, p.root())))
            .collect();

        let mut by_project: HashMap<PathBuf, HashMap<String, BTreeSet<PathBuf>>> = HashMap::new();
        for project in &graph.projects {
            by_project.entry(project.root().to_path_buf()).or_default();
        }

        for node in graph.graph.node_weights() {
            for specifier in &node.raw_imports {
                for &(name, root) in &packages {
                    if root == node.project_root {
                        continue;
                    }
                    if Project::specifier_names_package(specifier, name) {
                        by_project
                            .entry(node.project_root.clone())
                            .or_default()
                            .entry(name.to_owned())
                            .or_default()
                            .insert(node.path.clone());
                    }
                }
            }
        }

        debug!(
            projects = by_project.len(),
            entries = by_project.values().map(HashMap::len).sum::<usize>(),
            "built reverse index"
        );
        Self { by_project }
    }

    /// Files of the project at `project_root` that import `package` (or a subpath of it).
    pub fn files_importing(
        &self,
        project_root: &Path,
        package: &str,
    ) -> Option<&BTreeSet<PathBuf>> {
        self.by_project.get(project_root)?.get(package)
    }

    /// Packages imported by the project at `project_root`.
    pub fn packages_imported_by(&self, project_root: &Path) -> impl Iterator<Item = &str> {
        self.by_project
            .get(project_root)
            .into_iter()
            .flat_map(|packages| packages.keys().map(String::as_str))
    }
}

impl DependencyGraph {
    /// Build the reverse index for the current graph generation, if not already built.
    pub fn build_reverse_index(&mut self) -> &ReverseIndex {
        self.build_graph();
        if self.reverse_index.is_none() {
            self.reverse_index = Some(ReverseIndex::build(self));
        }
        self.reverse_index.get_or_insert_with(ReverseIndex::default)
    }

    pub fn reverse_index(&self) -> Option<&ReverseIndex> {
        self.reverse_index.as_ref()
    }
}
