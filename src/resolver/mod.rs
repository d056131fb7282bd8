pub mod file_resolver;
pub mod workspace;

pub use file_resolver::{ResolutionOutcome, aliases_for, build_resolver, resolve_import};
pub use workspace::{WorkspacePackage, discover_workspace_packages};

use std::path::{Component, Path, PathBuf};

use anyhow::anyhow;
use tracing::trace;

use crate::project::{ImportResolver, ResolveOptions};

/// Returns `true` if the specifier names a package rather than a path.
///
/// Relative (`./x`, `../x`), absolute (`/x`), protocol (`node:fs`) and
/// subpath-import (`#internal`) specifiers are not bare.
pub fn is_bare_specifier(specifier: &str) -> bool {
    !specifier.is_empty()
        && !specifier.starts_with('.')
        && !specifier.starts_with('/')
        && !specifier.starts_with('#')
        && !specifier.contains(':')
}

/// The default [`ImportResolver`]: Node/TypeScript resolution through `oxc_resolver`.
///
/// Built-in modules resolve to nothing; unresolvable specifiers are errors, which
/// the graph treats as "nothing resolved".
pub struct OxcImportResolver {
    resolver: oxc_resolver::Resolver,
}

impl OxcImportResolver {
    pub fn new(project_root: &Path) -> Self {
        Self::with_workspace(project_root, &[])
    }

    /// A resolver that maps every named sibling package to its local sources.
    pub fn with_workspace(project_root: &Path, packages: &[WorkspacePackage]) -> Self {
        let dirs: Vec<(String, PathBuf)> = packages
            .iter()
            .filter(|p| p.root != project_root)
            .filter_map(|p| p.name.clone().map(|name| (name, p.source_dir())))
            .collect();
        let aliases = aliases_for(dirs.iter().map(|(name, dir)| (name.as_str(), dir.as_path())));
        Self {
            resolver: build_resolver(project_root, aliases),
        }
    }
}

impl ImportResolver for OxcImportResolver {
    fn resolve(
        &self,
        from: &Path,
        specifier: &str,
        options: &ResolveOptions,
    ) -> anyhow::Result<Vec<PathBuf>> {
        match resolve_import(&self.resolver, from, specifier) {
            ResolutionOutcome::Resolved(path) => {
                if options.skip_node_modules && in_node_modules(&path) {
                    trace!(specifier, target = %path.display(), "skipping node_modules target");
                    return Ok(Vec::new());
                }
                Ok(vec![path])
            }
            ResolutionOutcome::BuiltinModule(_) => Ok(Vec::new()),
            ResolutionOutcome::Unresolved(reason) => Err(anyhow!(reason)),
        }
    }
}

fn in_node_modules(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(name) if name == "node_modules"))
}
