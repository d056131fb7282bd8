use serde::Serialize;

use crate::graph::DependencyGraph;

/// Build statistics of a [`DependencyGraph`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub module_count: usize,
    pub edge_count: usize,
    /// Edges whose endpoints belong to different projects.
    pub cross_project_edges: usize,
    /// Raw specifiers that named another registered project's package during the last build.
    pub package_references: usize,
    pub build_duration_ms: u64,
    pub project_count: usize,
    /// `edge_count / module_count`; every edge has exactly one importer.
    pub avg_importers_per_file: f64,
}

impl DependencyGraph {
    /// Statistics of the graph as it currently stands. Does not trigger a build.
    pub fn stats(&self) -> Stats {
        let module_count = self.module_count();
        let edge_count = self.edge_count();
        let avg_importers_per_file = if module_count == 0 {
            0.0
        } else {
            edge_count as f64 / module_count as f64
        };

        Stats {
            module_count,
            edge_count,
            cross_project_edges: self.cross_project_edge_count(),
            package_references: self.package_references,
            build_duration_ms: self.build_duration_ms,
            project_count: self.projects.len(),
            avg_importers_per_file,
        }
    }
}
