use std::sync::OnceLock;

use tree_sitter::{Node, Query, QueryCursor, StreamingIterator, Tree};
use tracing::warn;

use super::languages::Grammar;

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// How a module specifier entered the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `import { X } from './module'`, `import './side-effect'`, `import type { T } from './t'`
    Esm,
    /// `export { X } from './module'`, `export * from './module'`
    ReExport,
    /// `require('./module')`, and TypeScript's `import x = require('./module')`
    Require,
    /// `import('./module')` with a string literal argument
    Dynamic,
}

/// A module specifier found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportInfo {
    pub kind: ImportKind,
    /// The raw specifier, e.g. `"react"` or `"./utils"`.
    pub module_path: String,
}

// ---------------------------------------------------------------------------
// Query strings
// ---------------------------------------------------------------------------

/// Patterns shared by every grammar.
///
/// `require` is matched as any identifier and filtered in code: the 0.26
/// streaming cursor does not apply `#eq?` predicates on its own.
const IMPORT_QUERY: &str = r#"
    (import_statement
      source: (string (string_fragment) @esm))

    (export_statement
      source: (string (string_fragment) @reexport))

    (call_expression
      function: (identifier) @fn
      arguments: (arguments . (string (string_fragment) @require)))

    (call_expression
      function: (import)
      arguments: (arguments . (string (string_fragment) @dynamic)))
"#;

/// `import fs = require('fs')` only exists in the TypeScript grammars.
const TS_IMPORT_REQUIRE_QUERY: &str = r#"
    (import_require_clause
      source: (string (string_fragment) @require_clause))
"#;

// ---------------------------------------------------------------------------
// Query cache
// ---------------------------------------------------------------------------

static QUERY_CACHE: [OnceLock<Option<Query>>; 3] = [const { OnceLock::new() }; 3];

/// The compiled import query for `grammar`, or `None` if it failed to compile.
fn import_query(grammar: Grammar) -> Option<&'static Query> {
    QUERY_CACHE[grammar.slot()]
        .get_or_init(|| {
            let language = grammar.language();
            let compiled = match grammar {
                Grammar::TypeScript | Grammar::Tsx => {
                    let full = format!("{IMPORT_QUERY}\n{TS_IMPORT_REQUIRE_QUERY}");
                    Query::new(&language, &full).or_else(|err| {
                        warn!(?grammar, %err, "import-require pattern unavailable");
                        Query::new(&language, IMPORT_QUERY)
                    })
                }
                Grammar::JavaScript => Query::new(&language, IMPORT_QUERY),
            };
            match compiled {
                Ok(query) => Some(query),
                Err(err) => {
                    warn!(?grammar, %err, "import query failed to compile");
                    None
                }
            }
        })
        .as_ref()
}

fn node_text<'a>(node: Node<'a>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

// ---------------------------------------------------------------------------
// Import extraction
// ---------------------------------------------------------------------------

/// Extract every static module specifier from a parsed file, in source order.
///
/// Specifiers built at runtime (template literals, variables) are not visible
/// and are skipped.
pub fn extract_imports(tree: &Tree, source: &[u8], grammar: Grammar) -> Vec<ImportInfo> {
    let Some(query) = import_query(grammar) else {
        return Vec::new();
    };
    let names = query.capture_names();

    let mut found: Vec<(usize, ImportInfo)> = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, tree.root_node(), source);

    while let Some(m) = matches.next() {
        let mut callee: Option<&str> = None;
        let mut hit: Option<(ImportKind, Node)> = None;

        for capture in m.captures {
            let kind = match names[capture.index as usize] {
                "fn" => {
                    callee = Some(node_text(capture.node, source));
                    continue;
                }
                "esm" => ImportKind::Esm,
                "reexport" => ImportKind::ReExport,
                "require" | "require_clause" => ImportKind::Require,
                "dynamic" => ImportKind::Dynamic,
                _ => continue,
            };
            hit = Some((kind, capture.node));
        }

        let Some((kind, node)) = hit else { continue };
        // a call pattern matched some other function
        if callee.is_some_and(|name| name != "require") {
            continue;
        }
        let module_path = node_text(node, source);
        if module_path.is_empty() {
            continue;
        }
        found.push((
            node.start_byte(),
            ImportInfo {
                kind,
                module_path: module_path.to_owned(),
            },
        ));
    }

    found.sort_by_key(|(position, _)| *position);
    found.into_iter().map(|(_, info)| info).collect()
}
