use std::path::{Path, PathBuf};

use oxc_resolver::{AliasValue, ResolveOptions, Resolver, TsconfigOptions, TsconfigReferences};

/// The outcome of resolving a single import specifier.
#[derive(Debug)]
pub enum ResolutionOutcome {
    /// Successfully resolved to an absolute file path.
    Resolved(PathBuf),
    /// The specifier is a Node.js built-in module (e.g. `"fs"`, `"node:crypto"`).
    BuiltinModule(String),
    /// The specifier could not be resolved. `String` contains a human-readable reason.
    Unresolved(String),
}

/// Build an `oxc_resolver::Resolver` for one project.
///
/// - TypeScript extensions are tried before JavaScript ones.
/// - `.js` in a specifier also tries `.ts`/`.tsx`, so ESM-style TypeScript
///   (`import './foo.js'`) resolves to the source file.
/// - `<project_root>/tsconfig.json`, when present, contributes `paths` aliases and
///   project references.
/// - `workspace_aliases` map sibling package names to their local directories so
///   they never go through `node_modules`.
pub fn build_resolver(
    project_root: &Path,
    workspace_aliases: Vec<(String, Vec<AliasValue>)>,
) -> Resolver {
    let tsconfig_path = project_root.join("tsconfig.json");
    let tsconfig = tsconfig_path.exists().then(|| TsconfigOptions {
        config_file: tsconfig_path,
        references: TsconfigReferences::Auto,
    });

    Resolver::new(ResolveOptions {
        extensions: vec![
            ".ts".into(),
            ".tsx".into(),
            ".mts".into(),
            ".cts".into(),
            ".js".into(),
            ".jsx".into(),
            ".mjs".into(),
            ".cjs".into(),
            ".json".into(),
        ],
        extension_alias: vec![(
            ".js".into(),
            vec![".ts".into(), ".tsx".into(), ".js".into()],
        )],
        tsconfig,
        alias: workspace_aliases,
        condition_names: vec!["node".into(), "import".into(), "require".into()],
        builtin_modules: true,
        ..ResolveOptions::default()
    })
}

/// Resolve `specifier` as written in `from_file`, relative to its directory.
pub fn resolve_import(resolver: &Resolver, from_file: &Path, specifier: &str) -> ResolutionOutcome {
    let Some(dir) = from_file.parent() else {
        return ResolutionOutcome::Unresolved("importing file has no parent directory".to_owned());
    };

    match resolver.resolve(dir, specifier) {
        Ok(resolution) => ResolutionOutcome::Resolved(resolution.into_path_buf()),
        Err(oxc_resolver::ResolveError::Builtin { resolved, .. }) => {
            ResolutionOutcome::BuiltinModule(resolved)
        }
        Err(e) => ResolutionOutcome::Unresolved(e.to_string()),
    }
}

/// `(package name, local directory)` pairs in the alias form `oxc_resolver` expects.
pub fn aliases_for<'a, I>(packages: I) -> Vec<(String, Vec<AliasValue>)>
where
    I: IntoIterator<Item = (&'a str, &'a Path)>,
{
    packages
        .into_iter()
        .map(|(name, dir)| {
            (
                name.to_owned(),
                vec![AliasValue::Path(dir.to_string_lossy().into_owned())],
            )
        })
        .collect()
}
