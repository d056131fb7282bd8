//! Workspace dependency graph and affected-test resolution for monorepos.
//!
//! A [`DependencyGraph`] is built over every registered [`project::Project`] of a
//! workspace. Each project brings its own file enumerator, raw-import lookup,
//! import resolver and test-file classifier. Once built, the graph answers:
//!
//! - which test files are transitively affected by a set of changed files
//!   ([`DependencyGraph::find_affected_tests`]),
//! - which files of one project are affected
//!   ([`DependencyGraph::find_affected_files_in_project`]),
//! - which files of one project directly depend on a set of changed paths,
//!   accelerated by a package-name reverse index
//!   ([`DependencyGraph::find_files_in_project_depending_on_changed_paths`]).
//!
//! The graph is built lazily on the first query and rebuilt only after a new
//! project is registered. Watch-mode callers keep it current with
//! [`DependencyGraph::invalidate_files`] and [`DependencyGraph::refresh_files`].

pub mod config;
pub mod export;
pub mod graph;
pub mod loader;
pub mod logging;
pub mod output;
pub mod parser;
pub mod paths;
pub mod project;
pub mod query;
pub mod resolver;
pub mod walker;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

pub use graph::reverse_index::ReverseIndex;
pub use graph::{DependencyGraph, GraphOptions};
pub use project::test_matcher::{TestMatcher, TestPattern};
pub use project::{
    DependencyLookup, FileEnumerator, ImportResolver, ManifestReader, PackageManifest, Project,
    ProjectSpec, ResolveOptions,
};
pub use query::cross_project::CrossProjectStrategy;
pub use query::stats::Stats;
