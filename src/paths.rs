use std::path::{Path, PathBuf};

use path_clean::PathClean;

/// Make `path` absolute (relative to the current directory) and lexically clean it.
///
/// No filesystem access beyond reading the current directory: `..` and `.` segments
/// are folded textually, symlinks are left alone. Every path entering the graph
/// (enumerated files, resolved imports, changed files) goes through this so that
/// lookups in the node table compare like with like.
pub fn normalize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.clean();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path).clean(),
        Err(_) => path.clean(),
    }
}

/// Canonicalize a project root, falling back to [`normalize_path`] when the
/// directory does not exist on disk.
pub fn canonical_root(root: &Path) -> PathBuf {
    std::fs::canonicalize(root).unwrap_or_else(|_| normalize_path(root))
}

/// Render a path with forward slashes, the form test patterns are matched against.
pub fn slash_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

/// Append `.ext` to the final path component without replacing an existing extension.
pub(crate) fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}
