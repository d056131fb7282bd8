use serde::{Deserialize, Serialize};

/// Output format for graph export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
pub enum ExportFormat {
    /// Nodes and edges as JSON (default). Stable ordering, workspace-relative paths.
    #[default]
    Json,
    /// Graphviz DOT with one cluster per project.
    Dot,
}

/// Serializable snapshot of a built [`DependencyGraph`](crate::DependencyGraph).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedGraph {
    /// Sorted by `file`.
    pub nodes: Vec<ExportedNode>,
    /// Sorted by `(from, to)`.
    pub edges: Vec<ExportedEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedNode {
    pub file: String,
    /// Root of the owning project, `"."` for the workspace root itself.
    pub project: String,
    pub is_test: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedEdge {
    /// The importer.
    pub from: String,
    /// The imported file.
    pub to: String,
    pub cross_project: bool,
}
