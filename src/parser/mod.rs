pub mod imports;
pub mod languages;

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;
use tree_sitter::Parser;

use crate::project::DependencyLookup;

use imports::{ImportInfo, extract_imports};
use languages::Grammar;

/// Parse a source file and extract its module specifiers.
///
/// # Errors
/// Returns an error if:
/// - The file extension is not a JS/TS source extension
/// - `tree-sitter` returns `None` (malformed / truncated source)
pub fn parse_imports(path: &Path, source: &[u8]) -> Result<Vec<ImportInfo>> {
    let grammar = Grammar::for_path(path)
        .ok_or_else(|| anyhow!("unsupported file extension: {:?}", path.extension()))?;

    let mut parser = Parser::new();
    parser
        .set_language(&grammar.language())
        .with_context(|| format!("failed to set tree-sitter language for {grammar:?}"))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| anyhow!("tree-sitter returned None for {:?}", path))?;

    Ok(extract_imports(&tree, source, grammar))
}

/// [`DependencyLookup`] that reads files from disk and parses their imports with tree-sitter.
///
/// Results are cached per file until [`DependencyLookup::invalidate`] is called for it.
/// Unreadable or unparseable files have no dependency information.
#[derive(Debug, Default)]
pub struct ImportExtractor {
    cache: RefCell<HashMap<PathBuf, Option<Vec<String>>>>,
}

impl ImportExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    fn scan(file: &Path) -> Option<Vec<String>> {
        let source = match std::fs::read(file) {
            Ok(source) => source,
            Err(err) => {
                debug!(file = %file.display(), %err, "cannot read source file");
                return None;
            }
        };
        match parse_imports(file, &source) {
            Ok(imports) => {
                let mut specifiers: Vec<String> = Vec::with_capacity(imports.len());
                for import in imports {
                    if !specifiers.contains(&import.module_path) {
                        specifiers.push(import.module_path);
                    }
                }
                Some(specifiers)
            }
            Err(err) => {
                debug!(file = %file.display(), %err, "cannot parse source file");
                None
            }
        }
    }
}

impl DependencyLookup for ImportExtractor {
    fn raw_imports(&self, file: &Path) -> Option<Vec<String>> {
        if let Some(cached) = self.cache.borrow().get(file) {
            return cached.clone();
        }
        let scanned = Self::scan(file);
        self.cache
            .borrow_mut()
            .insert(file.to_path_buf(), scanned.clone());
        scanned
    }

    fn invalidate(&self, file: &Path) {
        self.cache.borrow_mut().remove(file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_unsupported_extension_is_an_error() {
        assert!(parse_imports(Path::new("styles.css"), b"body {}").is_err());
    }

    #[test]
    fn test_extractor_dedupes_in_source_order() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.ts");
        fs::write(
            &file,
            "import { x } from './x';\nimport { y } from './y';\nexport { x2 } from './x';\n",
        )
        .unwrap();

        let extractor = ImportExtractor::new();
        assert_eq!(
            extractor.raw_imports(&file),
            Some(vec!["./x".to_owned(), "./y".to_owned()])
        );
    }

    #[test]
    fn test_extractor_caches_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.js");
        fs::write(&file, "require('./one');\n").unwrap();

        let extractor = ImportExtractor::new();
        assert_eq!(extractor.raw_imports(&file), Some(vec!["./one".to_owned()]));

        fs::write(&file, "require('./two');\n").unwrap();
        assert_eq!(
            extractor.raw_imports(&file),
            Some(vec!["./one".to_owned()]),
            "stale until invalidated"
        );

        extractor.invalidate(&file);
        assert_eq!(extractor.raw_imports(&file), Some(vec!["./two".to_owned()]));
    }

    #[test]
    fn test_missing_file_has_no_dependency_information() {
        let extractor = ImportExtractor::new();
        assert_eq!(extractor.raw_imports(Path::new("/definitely/missing.ts")), None);
    }
}
