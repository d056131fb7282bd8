use std::collections::{BTreeSet, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use petgraph::Direction;
use petgraph::stable_graph::NodeIndex;

use crate::graph::DependencyGraph;
use crate::graph::node::ModuleNode;
use crate::paths::normalize_path;

impl DependencyGraph {
    /// Test files transitively affected by `changed`.
    ///
    /// Builds the graph if needed. Changed files the graph does not know are
    /// ignored; a changed test file is itself affected. An empty result means no
    /// known test depends on the change: whether to fall back to running everything
    /// is the caller's policy.
    pub fn find_affected_tests<I, P>(&mut self, changed: I) -> BTreeSet<PathBuf>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.build_graph();
        affected_tests(self, changed)
    }

    /// Files of the project rooted at `target_root` transitively affected by `changed`.
    ///
    /// Traversal passes through other projects' files without collecting them, so a
    /// chain that leaves the target project and comes back is still found.
    pub fn find_affected_files_in_project<I, P>(
        &mut self,
        target_root: &Path,
        changed: I,
    ) -> BTreeSet<PathBuf>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.build_graph();
        affected_files_in_project(self, target_root, changed)
    }
}

/// [`DependencyGraph::find_affected_tests`] on an already built graph.
pub fn affected_tests<I, P>(graph: &DependencyGraph, changed: I) -> BTreeSet<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut affected = BTreeSet::new();
    walk_importers(graph, changed, |node| {
        if node.is_test {
            affected.insert(node.path.clone());
        }
    });
    affected
}

/// [`DependencyGraph::find_affected_files_in_project`] on an already built graph.
pub fn affected_files_in_project<I, P>(
    graph: &DependencyGraph,
    target_root: &Path,
    changed: I,
) -> BTreeSet<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let target_root = normalize_path(target_root);
    let mut affected = BTreeSet::new();
    walk_importers(graph, changed, |node| {
        if node.project_root == target_root {
            affected.insert(node.path.clone());
        }
    });
    affected
}

/// Breadth-first walk from the changed files along importer edges only.
///
/// Every reachable node, the seeds included, is visited exactly once.
fn walk_importers<I, P, F>(graph: &DependencyGraph, changed: I, mut visit: F)
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
    F: FnMut(&ModuleNode),
{
    let mut queue: VecDeque<NodeIndex> = VecDeque::new();
    let mut visited: HashSet<NodeIndex> = HashSet::new();

    for file in changed {
        let path = normalize_path(file.as_ref());
        if let Some(&idx) = graph.file_index.get(&path)
            && visited.insert(idx)
        {
            queue.push_back(idx);
        }
    }

    while let Some(current) = queue.pop_front() {
        visit(&graph.graph[current]);
        for importer in graph.graph.neighbors_directed(current, Direction::Incoming) {
            if visited.insert(importer) {
                queue.push_back(importer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphOptions;
    use crate::project::test_matcher::TestPattern;
    use crate::testing::{MemoryWorkspace, test_globs};

    fn set(paths: &[&str]) -> BTreeSet<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    /// file0 <- file1 <- ... <- fileN.test.ts, each importing the previous one.
    fn chain(len: usize) -> (MemoryWorkspace, PathBuf) {
        let ws = MemoryWorkspace::new();
        ws.file("/ws/app/file0.ts", &[]);
        for i in 1..len {
            ws.file(&format!("/ws/app/file{i}.ts"), &[&format!("./file{}.ts", i - 1)]);
        }
        let test = format!("/ws/app/file{len}.test.ts");
        ws.file(&test, &[&format!("./file{}.ts", len - 1)]);
        (ws, PathBuf::from(test))
    }

    #[test]
    fn test_seed_scenario_util_change_reaches_test() {
        let ws = MemoryWorkspace::seed_scenario();
        let mut graph = ws.graph();
        ws.register_seed_projects(&mut graph);

        let affected = graph.find_affected_tests([Path::new("/ws/app/util.ts")]);
        assert_eq!(affected, set(&["/ws/app/index.test.ts"]));
    }

    #[test]
    fn test_seed_scenario_package_change_with_links() {
        let ws = MemoryWorkspace::seed_scenario();
        let mut graph = ws.graph();
        ws.register_seed_projects(&mut graph);

        let affected = graph.find_affected_tests([Path::new("/ws/pkg-b/src.ts")]);
        assert_eq!(
            affected,
            set(&["/ws/app/index.test.ts"]),
            "`import 'pkg-b'` links index.ts to pkg-b's files"
        );
    }

    #[test]
    fn test_seed_scenario_package_change_without_links() {
        let ws = MemoryWorkspace::seed_scenario();
        let mut graph = ws.graph_with(GraphOptions {
            link_package_imports: false,
            ..GraphOptions::default()
        });
        ws.register_seed_projects(&mut graph);

        let affected = graph.find_affected_tests([Path::new("/ws/pkg-b/src.ts")]);
        assert!(
            affected.is_empty(),
            "resolver-only edges cannot see the package import, got {affected:?}"
        );
    }

    #[test]
    fn test_cycle_terminates_and_reports_once() {
        let ws = MemoryWorkspace::new();
        ws.file("/ws/app/a.test.ts", &["./b.ts"]);
        ws.file("/ws/app/b.ts", &["./a.test.ts"]);
        let mut graph = ws.graph();
        graph.add_project(ws.project("/ws/app", test_globs()));

        let affected = graph.find_affected_tests([Path::new("/ws/app/b.ts")]);
        assert_eq!(affected, set(&["/ws/app/a.test.ts"]));
    }

    #[test]
    fn test_chain_of_one_and_five() {
        for len in [1, 5] {
            let (ws, test) = chain(len);
            let mut graph = ws.graph();
            graph.add_project(ws.project("/ws/app", test_globs()));
            let affected = graph.find_affected_tests([Path::new("/ws/app/file0.ts")]);
            assert!(
                affected.contains(&test),
                "chain of length {len} must reach {}",
                test.display()
            );
        }
    }

    #[test]
    fn test_non_test_importer_yields_nothing() {
        let ws = MemoryWorkspace::new();
        ws.file("/ws/app/leaf.ts", &[]);
        ws.file("/ws/app/consumer.ts", &["./leaf.ts"]);
        let mut graph = ws.graph();
        graph.add_project(ws.project("/ws/app", test_globs()));

        assert!(graph.find_affected_tests([Path::new("/ws/app/leaf.ts")]).is_empty());
    }

    #[test]
    fn test_unknown_changed_file_is_ignored() {
        let ws = MemoryWorkspace::seed_scenario();
        let mut graph = ws.graph();
        ws.register_seed_projects(&mut graph);

        let affected = graph.find_affected_tests([
            Path::new("/ws/app/does-not-exist.ts"),
            Path::new("/ws/app/util.ts"),
        ]);
        assert_eq!(affected, set(&["/ws/app/index.test.ts"]));
    }

    #[test]
    fn test_changed_test_file_is_affected() {
        let ws = MemoryWorkspace::seed_scenario();
        let mut graph = ws.graph();
        ws.register_seed_projects(&mut graph);

        let affected = graph.find_affected_tests([Path::new("/ws/app/index.test.ts")]);
        assert_eq!(affected, set(&["/ws/app/index.test.ts"]));
    }

    #[test]
    fn test_imported_modules_are_never_followed() {
        let ws = MemoryWorkspace::new();
        ws.file("/ws/app/a.ts", &["./dep.test.ts"]);
        ws.file("/ws/app/dep.test.ts", &[]);
        let mut graph = ws.graph();
        graph.add_project(ws.project("/ws/app", test_globs()));

        assert!(
            graph.find_affected_tests([Path::new("/ws/app/a.ts")]).is_empty(),
            "a test imported BY the change is not affected by it"
        );
    }

    #[test]
    fn test_relative_changed_paths_are_normalized() {
        let ws = MemoryWorkspace::seed_scenario();
        let mut graph = ws.graph();
        ws.register_seed_projects(&mut graph);

        let affected = graph.find_affected_tests([Path::new("/ws/app/sub/../util.ts")]);
        assert_eq!(affected, set(&["/ws/app/index.test.ts"]));
    }

    #[test]
    fn test_affected_files_in_project_passes_through_other_projects() {
        let ws = MemoryWorkspace::new();
        ws.file("/ws/a/src.ts", &[]);
        ws.file("/ws/c/bridge.ts", &["../a/src.ts"]);
        ws.file("/ws/target/consumer.test.ts", &["../c/bridge.ts"]);
        ws.file("/ws/target/unrelated.ts", &[]);
        let mut graph = ws.graph();
        for root in ["/ws/a", "/ws/c", "/ws/target"] {
            graph.add_project(ws.project(root, TestPattern::None));
        }

        let affected = graph.find_affected_files_in_project(
            Path::new("/ws/target"),
            [Path::new("/ws/a/src.ts")],
        );
        assert_eq!(affected, set(&["/ws/target/consumer.test.ts"]));
    }

    #[test]
    fn test_affected_files_in_project_collects_non_tests() {
        let ws = MemoryWorkspace::seed_scenario();
        let mut graph = ws.graph();
        ws.register_seed_projects(&mut graph);

        let affected = graph.find_affected_files_in_project(
            Path::new("/ws/app"),
            [Path::new("/ws/app/util.ts")],
        );
        assert_eq!(
            affected,
            set(&["/ws/app/index.test.ts", "/ws/app/index.ts", "/ws/app/util.ts"])
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_project_root_is_kept_as_registered() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir_all(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let root = link.to_str().unwrap();
        let util = format!("{root}/util.ts");
        let test = format!("{root}/src/util.test.ts");
        let ws = MemoryWorkspace::new();
        ws.file(&util, &[]);
        ws.file(&test, &["../util.ts"]);
        let mut graph = ws.graph();
        let tests = TestPattern::Glob(vec!["src/*.test.ts".to_owned()]);
        graph.add_project(ws.project(root, tests));

        assert_eq!(graph.projects()[0].root(), link.as_path());
        assert_eq!(graph.find_affected_tests([&util]), set(&[test.as_str()]));
        assert_eq!(
            graph.find_affected_files_in_project(&link, [&util]),
            set(&[test.as_str(), util.as_str()])
        );
        assert_eq!(
            graph.find_files_in_project_depending_on_changed_paths(&link, [&util]),
            set(&[test.as_str()])
        );
    }
}
