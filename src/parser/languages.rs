use std::path::Path;

use tree_sitter::Language;

/// The tree-sitter grammar a source file is parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    TypeScript,
    Tsx,
    JavaScript,
}

impl Grammar {
    pub const ALL: [Grammar; 3] = [Grammar::TypeScript, Grammar::Tsx, Grammar::JavaScript];

    /// Pick the grammar from the file extension, or `None` for files that are not JS/TS sources.
    ///
    /// `.ts` and `.tsx` MUST use different grammars: the TypeScript grammar cannot
    /// parse JSX and the TSX grammar breaks angle-bracket type assertions.
    pub fn for_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::for_extension(ext)
    }

    pub fn for_extension(ext: &str) -> Option<Self> {
        match ext {
            "ts" | "mts" | "cts" => Some(Grammar::TypeScript),
            "tsx" => Some(Grammar::Tsx),
            "js" | "jsx" | "mjs" | "cjs" => Some(Grammar::JavaScript),
            _ => None,
        }
    }

    pub fn language(self) -> Language {
        match self {
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Grammar::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Grammar::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }

    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

/// Extensions the walker collects and the parser understands.
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_for_path() {
        assert_eq!(Grammar::for_path(Path::new("a/b.mts")), Some(Grammar::TypeScript));
        assert_eq!(Grammar::for_path(Path::new("a/b.tsx")), Some(Grammar::Tsx));
        assert_eq!(Grammar::for_path(Path::new("a/b.jsx")), Some(Grammar::JavaScript));
        assert_eq!(Grammar::for_path(Path::new("a/b.d.ts")), Some(Grammar::TypeScript));
        assert_eq!(Grammar::for_path(Path::new("a/b.json")), None);
        assert_eq!(Grammar::for_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_every_source_extension_has_a_grammar() {
        for ext in SOURCE_EXTENSIONS {
            assert!(Grammar::for_extension(ext).is_some(), "{ext}");
        }
    }
}
