pub mod dot;
pub mod model;

use std::path::Path;

use petgraph::visit::{EdgeRef, IntoEdgeReferences};

use crate::graph::DependencyGraph;
use crate::output::display_path;

use model::{ExportFormat, ExportedEdge, ExportedGraph, ExportedNode};

impl DependencyGraph {
    /// Snapshot the graph with paths relative to `workspace_root`. Builds first if stale.
    pub fn export(&mut self, workspace_root: &Path) -> ExportedGraph {
        self.build_graph();
        exported_graph(self, workspace_root)
    }
}

/// Snapshot an already-built graph.
pub fn exported_graph(graph: &DependencyGraph, workspace_root: &Path) -> ExportedGraph {
    let mut nodes: Vec<ExportedNode> = graph
        .modules()
        .map(|node| ExportedNode {
            file: display_path(&node.path, workspace_root),
            project: project_label(&node.project_root, workspace_root),
            is_test: node.is_test,
        })
        .collect();
    nodes.sort_by(|a, b| a.file.cmp(&b.file));

    let mut edges: Vec<ExportedEdge> = graph
        .graph
        .edge_references()
        .map(|edge| ExportedEdge {
            from: display_path(&graph.graph[edge.source()].path, workspace_root),
            to: display_path(&graph.graph[edge.target()].path, workspace_root),
            cross_project: edge.weight().cross_project,
        })
        .collect();
    edges.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));

    ExportedGraph { nodes, edges }
}

/// Render the graph in `format`.
pub fn render(graph: &ExportedGraph, format: ExportFormat) -> anyhow::Result<String> {
    match format {
        ExportFormat::Json => {
            let mut out = serde_json::to_string_pretty(graph)?;
            out.push('\n');
            Ok(out)
        }
        ExportFormat::Dot => Ok(dot::render_dot(graph)),
    }
}

fn project_label(project_root: &Path, workspace_root: &Path) -> String {
    let label = display_path(project_root, workspace_root);
    if label.is_empty() { ".".to_owned() } else { label }
}
