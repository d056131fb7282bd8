use std::path::{Path, PathBuf};

/// One file in the graph, owned by exactly one project.
///
/// Incoming ("importers") and outgoing ("imported modules") edges are not stored on
/// the node: they are the incoming and outgoing edges of its index in the
/// underlying graph, which keeps both directions mirrored by construction.
#[derive(Debug, Clone)]
pub struct ModuleNode {
    /// Absolute path; the node's identity.
    pub path: PathBuf,
    /// Root of the owning project.
    pub project_root: PathBuf,
    /// Import specifiers exactly as written in source. Empty when the lookup had nothing.
    pub raw_imports: Vec<String>,
    /// Classified once, when the node is created.
    pub is_test: bool,
    /// Position of the owning project in registration order.
    pub(crate) project: usize,
}

impl ModuleNode {
    pub fn path(&self) -> &Path {
        &self.path
    }
}
