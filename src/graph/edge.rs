use serde::Serialize;

/// How an import edge came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    /// The importing project's resolver mapped a specifier to the target file.
    Resolved,
    /// A specifier named another project's package and was linked to that
    /// project's entry module(s) because the resolver did not reach it.
    PackageLink,
}

/// Importer -> imported file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportEdge {
    pub kind: EdgeKind,
    /// Source and target belong to different projects. Statistics only: crossing a
    /// project boundary does not change traversal semantics.
    pub cross_project: bool,
}
