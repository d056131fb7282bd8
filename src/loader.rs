//! Assemble a [`DependencyGraph`] for a workspace on disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::{AffectedConfig, default_test_pattern};
use crate::graph::DependencyGraph;
use crate::parser::ImportExtractor;
use crate::paths::canonical_root;
use crate::project::test_matcher::TestPattern;
use crate::project::{ManifestReader, PackageJsonReader, ProjectSpec};
use crate::resolver::{OxcImportResolver, WorkspacePackage, discover_workspace_packages};
use crate::walker::ProjectWalker;

/// A workspace root together with its configuration and an (unbuilt) graph.
pub struct LoadedWorkspace {
    pub root: PathBuf,
    pub config: AffectedConfig,
    pub graph: DependencyGraph,
}

/// Register every project of the workspace at `root`.
///
/// Projects come from `[[projects]]` in `affected-graph.toml` when present, else
/// from the npm/yarn/pnpm workspace globs (plus the root itself, for files outside
/// every package), else the root is the only project. Every root is canonicalized
/// here, because the graph compares paths lexically and `oxc_resolver` reports real
/// paths. The graph is built lazily by the first query.
pub fn load_workspace(root: &Path) -> Result<LoadedWorkspace> {
    let root = std::fs::canonicalize(root)
        .with_context(|| format!("workspace root {} does not exist", root.display()))?;
    let config = AffectedConfig::load(&root);

    let projects = project_list(&root, &config);
    let packages: Vec<WorkspacePackage> = projects
        .iter()
        .map(|(project_root, _)| WorkspacePackage {
            name: PackageJsonReader
                .read(project_root)
                .and_then(|manifest| manifest.name),
            root: project_root.clone(),
        })
        .collect();
    let all_roots: Vec<PathBuf> = projects.iter().map(|(r, _)| r.clone()).collect();

    let mut graph = DependencyGraph::with_options(config.graph_options());
    for (project_root, tests) in projects {
        debug!(root = %project_root.display(), ?tests, "registering project");
        let walker = ProjectWalker::new(&project_root, config.exclude())
            .with_nested_roots(all_roots.iter().cloned());
        graph.add_project(ProjectSpec {
            resolver: Box::new(OxcImportResolver::with_workspace(&project_root, &packages)),
            files: Box::new(walker),
            dependencies: Box::new(ImportExtractor::new()),
            root: project_root,
            tests,
        });
    }
    info!(
        root = %root.display(),
        projects = graph.projects().len(),
        "loaded workspace"
    );

    Ok(LoadedWorkspace {
        root,
        config,
        graph,
    })
}

/// `(canonical root, test pattern)` for every project, in registration order.
fn project_list(root: &Path, config: &AffectedConfig) -> Vec<(PathBuf, TestPattern)> {
    if !config.projects.is_empty() {
        return config
            .projects
            .iter()
            .map(|p| (canonical_root(&root.join(&p.root)), p.test_pattern()))
            .collect();
    }

    let mut projects: Vec<(PathBuf, TestPattern)> = discover_workspace_packages(root)
        .into_iter()
        .map(|package| (package.root, default_test_pattern()))
        .collect();
    if !projects.iter().any(|(r, _)| r == root) {
        projects.push((root.to_path_buf(), default_test_pattern()));
    }
    projects
}
