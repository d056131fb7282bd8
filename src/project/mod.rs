pub mod test_matcher;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::paths::normalize_path;

use test_matcher::{TestMatcher, TestPattern};

// ---------------------------------------------------------------------------
// Collaborator capabilities
// ---------------------------------------------------------------------------

/// Enumerates the files that belong to a project.
///
/// Every call re-enumerates from scratch, so the sequence is restartable.
pub trait FileEnumerator {
    /// All absolute file paths belonging to the project.
    fn files(&self) -> Vec<PathBuf>;

    /// Whether `file` currently belongs to the project.
    ///
    /// The default enumerates everything; implementations backed by a real
    /// filesystem should answer directly.
    fn contains(&self, file: &Path) -> bool {
        self.files().iter().any(|f| normalize_path(f) == file)
    }
}

/// Looks up the raw import specifiers of a file, as written in source.
pub trait DependencyLookup {
    /// Specifiers in source order, or `None` when no dependency information is available.
    fn raw_imports(&self, file: &Path) -> Option<Vec<String>>;

    /// Drop anything cached for `file`; the next lookup must observe its current contents.
    fn invalidate(&self, _file: &Path) {}
}

/// Options passed to an [`ImportResolver`] on every call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Do not report targets that live inside `node_modules`.
    pub skip_node_modules: bool,
}

impl ResolveOptions {
    /// The options used while installing graph edges: third-party code is never a node.
    pub fn for_graph() -> Self {
        Self {
            skip_node_modules: true,
        }
    }
}

/// Resolves an import specifier, seen from `from`, to zero or more absolute files.
///
/// Errors are never propagated by the graph: a failing resolution simply yields no edge.
pub trait ImportResolver {
    fn resolve(
        &self,
        from: &Path,
        specifier: &str,
        options: &ResolveOptions,
    ) -> anyhow::Result<Vec<PathBuf>>;
}

/// Reads a project's package manifest. Failure of any kind is `None`.
pub trait ManifestReader {
    fn read(&self, root: &Path) -> Option<PackageManifest>;
}

// ---------------------------------------------------------------------------
// Package manifest
// ---------------------------------------------------------------------------

/// The subset of `package.json` the graph cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, alias = "typings")]
    pub types: Option<String>,
}

impl PackageManifest {
    /// Entry-point fields in the order they are tried: source first, build outputs last.
    pub fn entry_fields(&self) -> impl Iterator<Item = &str> {
        [&self.source, &self.module, &self.main, &self.types]
            .into_iter()
            .filter_map(|f| f.as_deref())
    }
}

/// Reads `<root>/package.json` from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct PackageJsonReader;

impl ManifestReader for PackageJsonReader {
    fn read(&self, root: &Path) -> Option<PackageManifest> {
        let path = root.join("package.json");
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(err) => {
                debug!(path = %path.display(), %err, "no readable package manifest");
                return None;
            }
        };
        match serde_json::from_str::<PackageManifest>(&content) {
            Ok(manifest) => Some(manifest),
            Err(err) => {
                debug!(path = %path.display(), %err, "package manifest is not valid JSON");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// Everything the host supplies to register one project.
pub struct ProjectSpec {
    /// Project root; cleaned lexically at registration. Symlinks are not resolved, so
    /// spell it the way enumerated files and query paths are spelled.
    pub root: PathBuf,
    pub files: Box<dyn FileEnumerator>,
    pub dependencies: Box<dyn DependencyLookup>,
    pub resolver: Box<dyn ImportResolver>,
    /// Which files are tests. [`TestPattern::None`] means no file ever is.
    pub tests: TestPattern,
}

/// A registered project: one independently configured sub-tree of the workspace.
///
/// The package name is read once at registration and never changes afterwards.
pub struct Project {
    root: PathBuf,
    manifest: Option<PackageManifest>,
    files: Box<dyn FileEnumerator>,
    dependencies: Box<dyn DependencyLookup>,
    resolver: Box<dyn ImportResolver>,
    test_matcher: TestMatcher,
}

impl Project {
    pub(crate) fn register(spec: ProjectSpec, manifests: &dyn ManifestReader) -> Self {
        let root = normalize_path(&spec.root);
        let manifest = manifests.read(&root);
        let test_matcher = TestMatcher::compile(&spec.tests, &root);
        Self {
            root,
            manifest,
            files: spec.files,
            dependencies: spec.dependencies,
            resolver: spec.resolver,
            test_matcher,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The package name from the manifest. Anonymous projects can never be the
    /// target of a cross-project package reference.
    pub fn package_name(&self) -> Option<&str> {
        self.manifest.as_ref().and_then(|m| m.name.as_deref())
    }

    pub fn manifest(&self) -> Option<&PackageManifest> {
        self.manifest.as_ref()
    }

    pub fn is_test(&self, file: &Path) -> bool {
        self.test_matcher.is_test(file)
    }

    pub(crate) fn files(&self) -> &dyn FileEnumerator {
        self.files.as_ref()
    }

    pub(crate) fn dependencies(&self) -> &dyn DependencyLookup {
        self.dependencies.as_ref()
    }

    /// Resolve `specifier` from `from`, treating any resolver error as "nothing resolved".
    pub(crate) fn resolve_quietly(
        &self,
        from: &Path,
        specifier: &str,
        options: &ResolveOptions,
    ) -> Vec<PathBuf> {
        match self.resolver.resolve(from, specifier, options) {
            Ok(paths) => paths.iter().map(|p| normalize_path(p)).collect(),
            Err(err) => {
                trace!(from = %from.display(), specifier, %err, "resolution failed");
                Vec::new()
            }
        }
    }

    /// Whether `specifier` names the package `name` itself or a subpath of it.
    pub(crate) fn specifier_names_package(specifier: &str, name: &str) -> bool {
        specifier == name
            || specifier
                .strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("root", &self.root)
            .field("package_name", &self.package_name())
            .field("test_matcher", &self.test_matcher)
            .finish_non_exhaustive()
    }
}
