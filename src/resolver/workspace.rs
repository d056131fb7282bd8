use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::paths::canonical_root;

/// One package directory declared by the workspace configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePackage {
    /// `name` from the package's `package.json`, if any.
    pub name: Option<String>,
    /// Directory containing the package's `package.json`.
    pub root: PathBuf,
}

impl WorkspacePackage {
    /// Where the package's sources live: `<root>/src` when it exists, the root otherwise.
    pub fn source_dir(&self) -> PathBuf {
        let src = self.root.join("src");
        if src.is_dir() { src } else { self.root.clone() }
    }
}

/// Discover the packages of an npm/yarn/pnpm workspace rooted at `root`.
///
/// Packages are returned in path order. An empty list means `root` declares no
/// workspace; callers then treat `root` itself as the only project.
pub fn discover_workspace_packages(root: &Path) -> Vec<WorkspacePackage> {
    let root = canonical_root(root);
    let mut packages: Vec<WorkspacePackage> = Vec::new();

    for pattern in read_workspace_globs(&root) {
        let full_pattern = format!(
            "{}/{}/package.json",
            root.display(),
            pattern.trim_end_matches('/')
        );
        let paths = match glob::glob(&full_pattern) {
            Ok(paths) => paths,
            Err(err) => {
                warn!(pattern, %err, "invalid workspace glob");
                continue;
            }
        };
        for manifest in paths.flatten() {
            if manifest.components().any(|c| c.as_os_str() == "node_modules") {
                continue;
            }
            let Some(dir) = manifest.parent() else { continue };
            let dir = canonical_root(dir);
            if packages.iter().any(|p| p.root == dir) {
                continue;
            }
            let name = read_package_name(&manifest);
            debug!(
                root = %dir.display(),
                name = name.as_deref().unwrap_or("<anonymous>"),
                "workspace package"
            );
            packages.push(WorkspacePackage { name, root: dir });
        }
    }

    packages.sort_by(|a, b| a.root.cmp(&b.root));
    packages
}

fn read_package_name(manifest: &Path) -> Option<String> {
    let content = std::fs::read_to_string(manifest).ok()?;
    let json: serde_json::Value = serde_json::from_str(&content).ok()?;
    json["name"].as_str().map(str::to_owned)
}

/// Workspace glob patterns declared at `root`.
///
/// `pnpm-workspace.yaml` wins over the `workspaces` field of `package.json`, which
/// may be an array (npm) or an object with a `packages` array (yarn classic).
fn read_workspace_globs(root: &Path) -> Vec<String> {
    let pnpm_yaml = root.join("pnpm-workspace.yaml");
    if let Ok(content) = std::fs::read_to_string(&pnpm_yaml) {
        return parse_pnpm_workspace_yaml(&content);
    }

    let Ok(content) = std::fs::read_to_string(root.join("package.json")) else {
        return Vec::new();
    };
    let Ok(json) = serde_json::from_str::<serde_json::Value>(&content) else {
        warn!(root = %root.display(), "workspace package.json is not valid JSON");
        return Vec::new();
    };
    let workspaces = &json["workspaces"];
    workspaces
        .as_array()
        .or_else(|| workspaces["packages"].as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

/// Line-based reader for the `packages:` list of `pnpm-workspace.yaml`.
///
/// ```yaml
/// packages:
///   - 'packages/*'
///   - "apps/*"
///   - tools/*
/// ```
///
/// Negated entries (`!**/test/**`) are dropped.
pub(crate) fn parse_pnpm_workspace_yaml(content: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut in_packages = false;

    for line in content.lines() {
        let trimmed = line.trim_end();

        if trimmed.trim_start().starts_with('#') {
            continue;
        }
        if trimmed == "packages:" {
            in_packages = true;
            continue;
        }
        if !in_packages {
            continue;
        }
        // a new top-level key ends the list
        if !trimmed.is_empty() && !trimmed.starts_with(' ') && !trimmed.starts_with('-') {
            break;
        }

        if let Some(rest) = trimmed.trim_start().strip_prefix("- ") {
            let glob = unquote(rest.trim());
            if !glob.is_empty() && !glob.starts_with('!') {
                result.push(glob.to_owned());
            }
        }
    }

    result
}

fn unquote(s: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}
