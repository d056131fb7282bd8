use std::path::{Path, PathBuf};

use tracing::{trace, warn};

use crate::parser::languages::SOURCE_EXTENSIONS;
use crate::paths::normalize_path;
use crate::project::FileEnumerator;

/// [`FileEnumerator`] over a project directory on disk.
///
/// Respects `.gitignore` rules, always excludes `node_modules`, applies the
/// configured exclusions, and leaves out sub-directories that are themselves
/// registered project roots so every file has one natural owner.
#[derive(Debug, Clone)]
pub struct ProjectWalker {
    root: PathBuf,
    exclude: Vec<glob::Pattern>,
    nested_roots: Vec<PathBuf>,
}

impl ProjectWalker {
    /// `exclude` holds glob patterns matched against the whole path and against
    /// each path component; invalid ones are skipped with a warning.
    pub fn new(root: &Path, exclude: &[String]) -> Self {
        let exclude = exclude
            .iter()
            .filter_map(|pattern| match glob::Pattern::new(pattern) {
                Ok(p) => Some(p),
                Err(err) => {
                    warn!(pattern, %err, "ignoring invalid exclude pattern");
                    None
                }
            })
            .collect();
        Self {
            root: normalize_path(root),
            exclude,
            nested_roots: Vec::new(),
        }
    }

    /// Skip these directories: they belong to other projects.
    ///
    /// Only roots strictly inside this walker's root are kept.
    pub fn with_nested_roots<I>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.nested_roots = roots
            .into_iter()
            .map(|r| normalize_path(&r))
            .filter(|r| r != &self.root && r.starts_with(&self.root))
            .collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_nested_root(&self, path: &Path) -> bool {
        self.nested_roots.iter().any(|r| path.starts_with(r))
    }

    fn accepts(&self, path: &Path) -> bool {
        if path_contains_node_modules(path) || self.is_nested_root(path) {
            return false;
        }
        if is_excluded(path, &self.exclude) {
            return false;
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        SOURCE_EXTENSIONS.contains(&ext)
    }
}

impl FileEnumerator for ProjectWalker {
    fn files(&self) -> Vec<PathBuf> {
        let nested = self.nested_roots.clone();
        let walker = ignore::WalkBuilder::new(&self.root)
            .standard_filters(true)
            // read .gitignore files even outside a git repository
            .require_git(false)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                !(is_dir
                    && (entry.file_name() == "node_modules"
                        || nested.iter().any(|r| entry.path() == r.as_path())))
            })
            .build();

        let mut files = Vec::new();
        for result in walker {
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    warn!(%err, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                continue;
            }
            let path = entry.path();
            if !self.accepts(path) {
                continue;
            }
            trace!(file = %path.display(), "discovered");
            files.push(path.to_path_buf());
        }
        files
    }

    /// Answered from the path alone plus an existence check; `.gitignore` rules are
    /// only applied by [`files`](Self::files).
    fn contains(&self, file: &Path) -> bool {
        file.starts_with(&self.root) && self.accepts(file) && file.is_file()
    }
}

/// Returns true if any component of `path` is named `node_modules`.
fn path_contains_node_modules(path: &Path) -> bool {
    path.components().any(|c| c.as_os_str() == "node_modules")
}

/// Returns true if `path`, or any of its components, matches an exclusion pattern.
fn is_excluded(path: &Path, patterns: &[glob::Pattern]) -> bool {
    if patterns.is_empty() {
        return false;
    }
    let path_str = path.to_string_lossy();
    patterns.iter().any(|pattern| {
        pattern.matches(&path_str)
            || path
                .components()
                .filter_map(|c| c.as_os_str().to_str())
                .any(|s| pattern.matches(s))
    })
}
