//! In-memory collaborators for unit tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::bail;
use path_clean::PathClean;

use crate::graph::{DependencyGraph, GraphOptions};
use crate::paths::with_appended_extension;
use crate::project::test_matcher::TestPattern;
use crate::project::{
    DependencyLookup, FileEnumerator, ImportResolver, ManifestReader, PackageManifest,
    ProjectSpec, ResolveOptions,
};

pub(crate) fn test_globs() -> TestPattern {
    TestPattern::Glob(vec!["**/*.test.ts".to_owned()])
}

#[derive(Default)]
struct State {
    /// File -> raw imports; `None` for files without dependency information.
    files: BTreeMap<PathBuf, Option<Vec<String>>>,
    /// Root -> (package name, main entry).
    packages: HashMap<PathBuf, (String, Option<String>)>,
    aliases: HashMap<String, PathBuf>,
    failing: HashSet<String>,
    resolve_calls: usize,
}

/// A fake workspace shared by every collaborator it hands out, so tests can
/// edit files after the graph has been built.
#[derive(Clone, Default)]
pub(crate) struct MemoryWorkspace {
    state: Rc<RefCell<State>>,
}

impl MemoryWorkspace {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// `/ws/app` ("app") with `index.ts`, `util.ts`, `index.test.ts`;
    /// `/ws/pkg-b` ("pkg-b") with `src.ts`.
    pub(crate) fn seed_scenario() -> Self {
        let ws = Self::new();
        ws.package("/ws/app", "app");
        ws.package("/ws/pkg-b", "pkg-b");
        ws.file("/ws/app/index.ts", &["pkg-b", "./util.ts"]);
        ws.file("/ws/app/util.ts", &[]);
        ws.file("/ws/app/index.test.ts", &["./index.ts"]);
        ws.file("/ws/pkg-b/src.ts", &[]);
        ws
    }

    pub(crate) fn register_seed_projects(&self, graph: &mut DependencyGraph) {
        graph.add_project(self.project("/ws/app", test_globs()));
        graph.add_project(self.project("/ws/pkg-b", test_globs()));
    }

    /// Create or overwrite a file with the given raw imports.
    pub(crate) fn file(&self, path: &str, imports: &[&str]) {
        let imports = imports.iter().map(|s| (*s).to_owned()).collect();
        self.state
            .borrow_mut()
            .files
            .insert(PathBuf::from(path), Some(imports));
    }

    /// A file that is enumerated but has no dependency information.
    pub(crate) fn unindexed(&self, path: &str) {
        self.state.borrow_mut().files.insert(PathBuf::from(path), None);
    }

    pub(crate) fn remove(&self, path: &str) {
        self.state.borrow_mut().files.remove(Path::new(path));
    }

    pub(crate) fn package(&self, root: &str, name: &str) {
        self.state
            .borrow_mut()
            .packages
            .insert(PathBuf::from(root), (name.to_owned(), None));
    }

    pub(crate) fn package_with_entry(&self, root: &str, name: &str, main: &str) {
        self.state
            .borrow_mut()
            .packages
            .insert(PathBuf::from(root), (name.to_owned(), Some(main.to_owned())));
    }

    /// Make the resolver map a bare specifier to `target`.
    pub(crate) fn alias(&self, specifier: &str, target: &str) {
        self.state
            .borrow_mut()
            .aliases
            .insert(specifier.to_owned(), PathBuf::from(target));
    }

    /// Make the resolver fail for `specifier`.
    pub(crate) fn failing(&self, specifier: &str) {
        self.state.borrow_mut().failing.insert(specifier.to_owned());
    }

    pub(crate) fn resolve_calls(&self) -> usize {
        self.state.borrow().resolve_calls
    }

    pub(crate) fn project(&self, root: &str, tests: TestPattern) -> ProjectSpec {
        let root = PathBuf::from(root);
        ProjectSpec {
            root: root.clone(),
            files: Box::new(MemoryFiles {
                ws: self.clone(),
                root,
            }),
            dependencies: Box::new(self.clone()),
            resolver: Box::new(self.clone()),
            tests,
        }
    }

    pub(crate) fn graph(&self) -> DependencyGraph {
        self.graph_with(GraphOptions::default())
    }

    pub(crate) fn graph_with(&self, options: GraphOptions) -> DependencyGraph {
        DependencyGraph::with_options(options).with_manifest_reader(Box::new(self.clone()))
    }

    fn known(&self, path: &Path) -> bool {
        self.state.borrow().files.contains_key(path)
    }
}

struct MemoryFiles {
    ws: MemoryWorkspace,
    root: PathBuf,
}

impl FileEnumerator for MemoryFiles {
    fn files(&self) -> Vec<PathBuf> {
        self.ws
            .state
            .borrow()
            .files
            .keys()
            .filter(|f| f.starts_with(&self.root))
            .cloned()
            .collect()
    }
}

impl DependencyLookup for MemoryWorkspace {
    fn raw_imports(&self, file: &Path) -> Option<Vec<String>> {
        self.state.borrow().files.get(file).cloned().flatten()
    }
}

impl ImportResolver for MemoryWorkspace {
    fn resolve(
        &self,
        from: &Path,
        specifier: &str,
        _options: &ResolveOptions,
    ) -> anyhow::Result<Vec<PathBuf>> {
        self.state.borrow_mut().resolve_calls += 1;

        if self.state.borrow().failing.contains(specifier) {
            bail!("resolver exploded on {specifier}");
        }

        if !specifier.starts_with('.') {
            return match self.state.borrow().aliases.get(specifier) {
                Some(target) => Ok(vec![target.clone()]),
                None => bail!("cannot find module '{specifier}'"),
            };
        }

        let base = from
            .parent()
            .unwrap_or_else(|| Path::new("/"))
            .join(specifier)
            .clean();
        let candidates = [
            base.clone(),
            with_appended_extension(&base, "ts"),
            base.join("index.ts"),
        ];
        match candidates.into_iter().find(|c| self.known(c)) {
            Some(found) => Ok(vec![found]),
            None => bail!("cannot find module '{specifier}'"),
        }
    }
}

impl ManifestReader for MemoryWorkspace {
    fn read(&self, root: &Path) -> Option<PackageManifest> {
        let state = self.state.borrow();
        let (name, main) = state.packages.get(root)?;
        Some(PackageManifest {
            name: Some(name.clone()),
            main: main.clone(),
            ..PackageManifest::default()
        })
    }
}
