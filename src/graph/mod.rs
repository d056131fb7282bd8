pub mod build;
pub mod edge;
pub mod node;
pub mod reverse_index;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use petgraph::Direction;
use petgraph::Directed;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use tracing::{debug, warn};

use crate::paths::normalize_path;
use crate::project::{ManifestReader, PackageJsonReader, Project, ProjectSpec};
use crate::query::cross_project::CrossProjectStrategy;

use edge::ImportEdge;
use node::ModuleNode;
use reverse_index::ReverseIndex;

/// Behavior switches for a [`DependencyGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphOptions {
    /// Install package-link edges for specifiers that name another registered
    /// project's package when the resolver did not reach that project.
    ///
    /// With this off the graph only holds resolver edges, and cross-project
    /// impact is visible only to
    /// [`find_files_in_project_depending_on_changed_paths`](DependencyGraph::find_files_in_project_depending_on_changed_paths),
    /// which consults the reverse index.
    pub link_package_imports: bool,
    /// Default strategy for the cross-project dependency query.
    pub cross_project_strategy: CrossProjectStrategy,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            link_package_imports: true,
            cross_project_strategy: CrossProjectStrategy::Indexed,
        }
    }
}

/// The workspace-wide module graph.
///
/// Nodes are files, edges point from importer to imported file. The graph is built
/// lazily by the first query after it becomes stale; registering a project is the
/// only thing that makes it stale besides [`refresh_files`](Self::refresh_files)
/// seeing a file it has never indexed.
///
/// All mutation takes `&mut self`; callers sharing a graph across threads must
/// serialize access themselves.
pub struct DependencyGraph {
    /// Importer -> imported edges between file nodes.
    pub(crate) graph: StableGraph<ModuleNode, ImportEdge, Directed>,
    /// Absolute file path -> node.
    pub(crate) file_index: HashMap<PathBuf, NodeIndex>,
    /// Project root -> files owned by that project.
    pub(crate) project_files: HashMap<PathBuf, BTreeSet<PathBuf>>,
    /// Package name -> position in `projects`.
    pub(crate) package_index: HashMap<String, usize>,
    pub(crate) projects: Vec<Project>,
    pub(crate) options: GraphOptions,
    pub(crate) valid: bool,
    pub(crate) reverse_index: Option<ReverseIndex>,
    pub(crate) build_duration_ms: u64,
    pub(crate) package_references: usize,
    manifests: Box<dyn ManifestReader>,
}

impl DependencyGraph {
    /// An empty graph reading `package.json` manifests from disk.
    pub fn new() -> Self {
        Self::with_options(GraphOptions::default())
    }

    pub fn with_options(options: GraphOptions) -> Self {
        Self {
            graph: StableGraph::new(),
            file_index: HashMap::new(),
            project_files: HashMap::new(),
            package_index: HashMap::new(),
            projects: Vec::new(),
            options,
            valid: false,
            reverse_index: None,
            build_duration_ms: 0,
            package_references: 0,
            manifests: Box::new(PackageJsonReader),
        }
    }

    /// Replace the manifest reader used by subsequent [`add_project`](Self::add_project) calls.
    pub fn with_manifest_reader(mut self, reader: Box<dyn ManifestReader>) -> Self {
        self.manifests = reader;
        self
    }

    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    /// Register a project. Its manifest is read once, here.
    ///
    /// Marks the graph and the reverse index stale. Duplicate roots are kept (the
    /// first registration owns any shared file); a duplicate package name moves the
    /// name to the newest project.
    pub fn add_project(&mut self, spec: ProjectSpec) {
        let project = Project::register(spec, self.manifests.as_ref());
        let position = self.projects.len();

        if self.projects.iter().any(|p| p.root() == project.root()) {
            warn!(root = %project.root().display(), "project root registered twice");
        }

        if let Some(name) = project.package_name() {
            if let Some(previous) = self.package_index.insert(name.to_owned(), position) {
                warn!(
                    package = name,
                    previous = %self.projects[previous].root().display(),
                    current = %project.root().display(),
                    "package name registered twice; the newest project wins"
                );
            }
        }

        debug!(
            root = %project.root().display(),
            package = project.package_name().unwrap_or("<anonymous>"),
            "registered project"
        );
        self.projects.push(project);
        self.mark_stale();
    }

    /// Force the next query to rebuild from scratch.
    pub fn mark_stale(&mut self) {
        self.valid = false;
        self.reverse_index = None;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, root: &Path) -> Option<&Project> {
        self.project_position(root).map(|i| &self.projects[i])
    }

    /// Position of the first project registered with `root`.
    pub(crate) fn project_position(&self, root: &Path) -> Option<usize> {
        let root = normalize_path(root);
        self.projects.iter().position(|p| p.root() == root)
    }

    pub fn node(&self, file: &Path) -> Option<&ModuleNode> {
        self.file_index
            .get(&normalize_path(file))
            .map(|&idx| &self.graph[idx])
    }

    pub fn contains_file(&self, file: &Path) -> bool {
        self.file_index.contains_key(&normalize_path(file))
    }

    /// Files that `file` imports.
    pub fn imported_modules(&self, file: &Path) -> Vec<&Path> {
        self.neighbors(file, Direction::Outgoing)
    }

    /// Files that import `file`.
    pub fn importers(&self, file: &Path) -> Vec<&Path> {
        self.neighbors(file, Direction::Incoming)
    }

    fn neighbors(&self, file: &Path, direction: Direction) -> Vec<&Path> {
        let Some(&idx) = self.file_index.get(&normalize_path(file)) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].path.as_path())
            .collect()
    }

    /// Files owned by the project rooted at `root`, in path order.
    pub fn files_in_project(&self, root: &Path) -> impl Iterator<Item = &Path> {
        self.project_files
            .get(&normalize_path(root))
            .into_iter()
            .flat_map(|files| files.iter().map(PathBuf::as_path))
    }

    /// All nodes, in no particular order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleNode> {
        self.graph.node_weights()
    }

    pub fn module_count(&self) -> usize {
        self.file_index.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Remove the given files from the graph, tearing down every edge touching them.
    ///
    /// The files are not re-scanned and no new edges are installed: until a rebuild
    /// (or [`refresh_files`](Self::refresh_files)) they are simply missing. Unknown
    /// paths are ignored. Returns the number of nodes removed.
    pub fn invalidate_files<I, P>(&mut self, files: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut removed = 0;
        for file in files {
            let path = normalize_path(file.as_ref());
            let Some(&idx) = self.file_index.get(&path) else {
                continue;
            };
            let references = self.package_reference_count(idx);
            if let Some(node) = self.remove_node(&path) {
                self.package_references = self.package_references.saturating_sub(references);
                self.projects[node.project].dependencies().invalidate(&path);
                removed += 1;
            }
        }
        if removed > 0 {
            self.reverse_index = None;
            debug!(removed, "invalidated files");
        }
        removed
    }

    /// Re-scan the given files in place.
    ///
    /// Each known file is removed, then re-created if its project still lists it:
    /// raw imports are looked up again, its own imports are re-resolved, and every
    /// former importer is re-linked to it. A file the graph has never seen marks the
    /// whole graph stale instead, because existing nodes may now resolve to it.
    ///
    /// Returns the number of files re-inserted.
    pub fn refresh_files<I, P>(&mut self, files: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        if !self.valid {
            return 0;
        }
        self.reverse_index = None;

        let mut reinserted = 0;
        for file in files {
            let path = normalize_path(file.as_ref());
            let Some(&idx) = self.file_index.get(&path) else {
                debug!(file = %path.display(), "unindexed file changed; scheduling rebuild");
                self.valid = false;
                continue;
            };

            let project = self.graph[idx].project;
            let importers: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .collect();
            let importer_paths: Vec<PathBuf> = importers
                .iter()
                .map(|&i| self.graph[i].path.clone())
                .collect();

            let references = self.package_reference_count(idx);
            self.package_references = self.package_references.saturating_sub(references);
            self.projects[project].dependencies().invalidate(&path);
            self.remove_node(&path);

            if !self.projects[project].files().contains(&path) {
                debug!(file = %path.display(), "file left its project; not re-inserted");
                continue;
            }

            let new_idx = self.insert_node(project, path);
            self.package_references += self.link_node(new_idx);
            // importers keep their own reference counts
            for importer in importer_paths {
                if let Some(&importer_idx) = self.file_index.get(&importer) {
                    self.link_node(importer_idx);
                }
            }
            reinserted += 1;
        }
        reinserted
    }

    /// Create a node for `path` owned by `project`, classifying it and fetching its raw imports.
    pub(crate) fn insert_node(&mut self, project: usize, path: PathBuf) -> NodeIndex {
        let owner = &self.projects[project];
        let node = ModuleNode {
            raw_imports: owner.dependencies().raw_imports(&path).unwrap_or_default(),
            is_test: owner.is_test(&path),
            project_root: owner.root().to_path_buf(),
            path: path.clone(),
            project,
        };
        self.project_files
            .entry(node.project_root.clone())
            .or_default()
            .insert(path.clone());
        let idx = self.graph.add_node(node);
        self.file_index.insert(path, idx);
        idx
    }

    /// Remove the node for `path` and every edge touching it, on both sides.
    fn remove_node(&mut self, path: &Path) -> Option<ModuleNode> {
        let idx = self.file_index.remove(path)?;
        let node = self.graph.remove_node(idx)?;
        if let Some(files) = self.project_files.get_mut(&node.project_root) {
            files.remove(path);
        }
        Some(node)
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::test_matcher::TestPattern;
    use crate::testing::{MemoryWorkspace, test_globs};

    fn two_file_workspace() -> MemoryWorkspace {
        let ws = MemoryWorkspace::new();
        ws.file("/ws/app/util.ts", &[]);
        ws.file("/ws/app/index.ts", &["./util.ts"]);
        ws.file("/ws/app/index.test.ts", &["./index.ts"]);
        ws
    }

    #[test]
    fn test_edges_are_mirrored() {
        let ws = two_file_workspace();
        let mut graph = ws.graph();
        graph.add_project(ws.project("/ws/app", test_globs()));
        graph.build_graph();

        let index = Path::new("/ws/app/index.ts");
        let util = Path::new("/ws/app/util.ts");
        assert_eq!(graph.imported_modules(index), vec![util]);
        assert_eq!(graph.importers(util), vec![index]);

        for node in graph.modules() {
            for imported in graph.imported_modules(&node.path) {
                assert!(
                    graph.importers(imported).contains(&node.path.as_path()),
                    "{} imports {} but is not among its importers",
                    node.path.display(),
                    imported.display()
                );
            }
            for importer in graph.importers(&node.path) {
                assert!(
                    graph.imported_modules(importer).contains(&node.path.as_path()),
                    "{} is an importer of {} without importing it",
                    importer.display(),
                    node.path.display()
                );
            }
        }
    }

    #[test]
    fn test_add_project_marks_graph_stale() {
        let ws = two_file_workspace();
        ws.file("/ws/lib/a.ts", &[]);
        let mut graph = ws.graph();
        graph.add_project(ws.project("/ws/app", test_globs()));
        graph.build_graph();
        assert!(graph.is_valid());
        assert_eq!(graph.module_count(), 3);

        graph.add_project(ws.project("/ws/lib", test_globs()));
        assert!(!graph.is_valid(), "registering a project must invalidate the graph");
        graph.build_graph();
        assert_eq!(graph.module_count(), 4);
    }

    #[test]
    fn test_every_node_owner_is_indexed() {
        let ws = two_file_workspace();
        ws.file("/ws/lib/a.ts", &[]);
        let mut graph = ws.graph();
        graph.add_project(ws.project("/ws/app", test_globs()));
        graph.add_project(ws.project("/ws/lib", TestPattern::None));
        graph.build_graph();

        for node in graph.modules() {
            assert!(
                graph.project_files.contains_key(&node.project_root),
                "owner {} missing from the project index",
                node.project_root.display()
            );
        }
        assert_eq!(graph.files_in_project(Path::new("/ws/lib")).count(), 1);
    }

    #[test]
    fn test_duplicate_package_name_last_wins() {
        let ws = MemoryWorkspace::new();
        ws.package("/ws/one", "shared");
        ws.package("/ws/two", "shared");
        let mut graph = ws.graph();
        graph.add_project(ws.project("/ws/one", TestPattern::None));
        graph.add_project(ws.project("/ws/two", TestPattern::None));
        let owner = graph.package_index["shared"];
        assert_eq!(graph.projects()[owner].root(), Path::new("/ws/two"));
    }

    #[test]
    fn test_duplicate_root_first_registration_owns_files() {
        let ws = two_file_workspace();
        let mut graph = ws.graph();
        graph.add_project(ws.project("/ws/app", test_globs()));
        graph.add_project(ws.project("/ws/app", TestPattern::None));
        graph.build_graph();
        assert_eq!(graph.module_count(), 3, "shared files are not duplicated");
        let test_node = graph.node(Path::new("/ws/app/index.test.ts")).unwrap();
        assert!(test_node.is_test, "first registration's test pattern applies");
    }

    #[test]
    fn test_invalidate_removes_dangling_edges() {
        let ws = two_file_workspace();
        let mut graph = ws.graph();
        graph.add_project(ws.project("/ws/app", test_globs()));
        graph.build_graph();

        let index = Path::new("/ws/app/index.ts");
        assert_eq!(graph.invalidate_files([index]), 1);

        assert!(!graph.contains_file(index));
        for node in graph.modules() {
            assert!(!graph.importers(&node.path).contains(&index));
            assert!(!graph.imported_modules(&node.path).contains(&index));
        }
        assert!(graph.importers(Path::new("/ws/app/util.ts")).is_empty());
        assert!(graph.imported_modules(Path::new("/ws/app/index.test.ts")).is_empty());
        assert_eq!(graph.files_in_project(Path::new("/ws/app")).count(), 2);
        assert!(graph.is_valid(), "invalidation does not schedule a rebuild");
    }

    #[test]
    fn test_invalidate_unknown_file_is_noop() {
        let ws = two_file_workspace();
        let mut graph = ws.graph();
        graph.add_project(ws.project("/ws/app", test_globs()));
        graph.build_graph();
        assert_eq!(graph.invalidate_files([Path::new("/ws/app/nope.ts")]), 0);
        assert_eq!(graph.module_count(), 3);
    }

    #[test]
    fn test_refresh_restores_edges_in_both_directions() {
        let ws = two_file_workspace();
        let mut graph = ws.graph();
        graph.add_project(ws.project("/ws/app", test_globs()));
        graph.build_graph();

        // index.ts stops importing util.ts and starts importing helper.ts
        ws.file("/ws/app/helper.ts", &[]);
        ws.file("/ws/app/index.ts", &["./helper.ts"]);
        assert_eq!(graph.refresh_files([Path::new("/ws/app/index.ts")]), 1);

        let index = Path::new("/ws/app/index.ts");
        assert!(graph.importers(Path::new("/ws/app/util.ts")).is_empty());
        assert_eq!(
            graph.importers(index),
            vec![Path::new("/ws/app/index.test.ts")],
            "former importers are re-linked"
        );
        // helper.ts was not a node when the graph was built
        assert!(graph.imported_modules(index).is_empty());
    }

    #[test]
    fn test_refresh_of_new_file_schedules_rebuild() {
        let ws = two_file_workspace();
        let mut graph = ws.graph();
        graph.add_project(ws.project("/ws/app", test_globs()));
        graph.build_graph();

        ws.file("/ws/app/new.ts", &["./util.ts"]);
        assert_eq!(graph.refresh_files([Path::new("/ws/app/new.ts")]), 0);
        assert!(!graph.is_valid());
        graph.build_graph();
        assert_eq!(graph.imported_modules(Path::new("/ws/app/new.ts")).len(), 1);
    }

    #[test]
    fn test_refresh_of_deleted_file_leaves_it_out() {
        let ws = two_file_workspace();
        let mut graph = ws.graph();
        graph.add_project(ws.project("/ws/app", test_globs()));
        graph.build_graph();

        ws.remove("/ws/app/util.ts");
        assert_eq!(graph.refresh_files([Path::new("/ws/app/util.ts")]), 0);
        assert!(!graph.contains_file(Path::new("/ws/app/util.ts")));
        assert!(graph.imported_modules(Path::new("/ws/app/index.ts")).is_empty());
        assert!(graph.is_valid());
    }

    #[test]
    fn test_package_references_follow_refresh_and_invalidate() {
        let ws = MemoryWorkspace::seed_scenario();
        let mut graph = ws.graph();
        ws.register_seed_projects(&mut graph);
        graph.build_graph();
        assert_eq!(graph.stats().package_references, 1);

        let index = Path::new("/ws/app/index.ts");
        ws.file("/ws/app/index.ts", &["./util.ts"]);
        graph.refresh_files([index]);
        assert_eq!(graph.stats().package_references, 0);

        ws.file("/ws/app/index.ts", &["pkg-b", "pkg-b/src"]);
        graph.refresh_files([index]);
        assert_eq!(graph.stats().package_references, 2);

        // refreshing src.ts re-links index.ts; its references are not counted again
        graph.refresh_files([Path::new("/ws/pkg-b/src.ts")]);
        assert_eq!(graph.stats().package_references, 2);

        graph.invalidate_files([index]);
        assert_eq!(graph.stats().package_references, 0);
    }
}
