use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::paths::slash_path;

/// How a project decides which of its files are tests.
///
/// Glob and regex configurations are mutually exclusive per project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestPattern {
    /// Glob patterns (`**`, `*`, `?`) matched against the whole absolute path.
    Glob(Vec<String>),
    /// Regular expressions searched for anywhere in the absolute path.
    Regex(Vec<String>),
    /// No file is ever a test.
    #[default]
    None,
}

/// A [`TestPattern`] compiled once at project registration.
#[derive(Debug, Clone, Default)]
pub struct TestMatcher {
    patterns: Vec<Regex>,
}

impl TestMatcher {
    /// Compile `pattern` for a project rooted at `root`.
    ///
    /// Relative globs that do not start with `**` are anchored under `root`.
    /// Patterns that fail to compile are skipped with a warning.
    pub fn compile(pattern: &TestPattern, root: &Path) -> Self {
        let sources: Vec<String> = match pattern {
            TestPattern::Glob(globs) => globs
                .iter()
                .map(|g| glob_to_regex(&anchor_glob(g, root)))
                .collect(),
            TestPattern::Regex(regexes) => regexes.clone(),
            TestPattern::None => Vec::new(),
        };

        let patterns = sources
            .iter()
            .filter_map(|src| match Regex::new(src) {
                Ok(re) => Some(re),
                Err(err) => {
                    warn!(pattern = %src, %err, "ignoring invalid test pattern");
                    None
                }
            })
            .collect();

        Self { patterns }
    }

    pub fn is_test(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let path = slash_path(path);
        self.patterns.iter().any(|re| re.is_match(&path))
    }
}

fn anchor_glob(glob: &str, root: &Path) -> String {
    if glob.starts_with('/') || glob.starts_with("**") {
        return glob.to_owned();
    }
    let glob = glob.strip_prefix("./").unwrap_or(glob);
    format!("{}/{}", slash_path(root).trim_end_matches('/'), glob)
}

/// Convert a glob into an anchored regular expression.
///
/// - `**` matches any characters, path separators included
/// - `*` matches any characters except `/`
/// - `?` matches exactly one character
///
/// Every other character is matched literally.
pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push('.'),
            other => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(other.encode_utf8(&mut buf)));
            }
        }
    }
    out.push('$');
    out
}
