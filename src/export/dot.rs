use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

use crate::export::model::ExportedGraph;

const SOURCE_FILL: &str = "#AED6F1";
const TEST_FILL: &str = "#A9DFBF";

/// Sanitize a string for use as a DOT node ID or subgraph name.
///
/// Replaces non-alphanumeric characters with `_`. Prepends `n` if the result
/// starts with a digit (DOT IDs must not start with a digit).
pub fn sanitize_dot_id(s: &str) -> String {
    let mut result: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, 'n');
    }
    if result.is_empty() {
        result = "root".to_string();
    }
    result
}

fn escape_label(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render the graph as DOT: one `cluster_*` subgraph per project, test files in
/// green, cross-project edges dashed.
pub fn render_dot(graph: &ExportedGraph) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph affected_graph {{");
    let _ = writeln!(out, "    rankdir=LR;");
    let _ = writeln!(out, "    node [shape=box style=filled fontname=monospace];");

    let ids: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.file.as_str(), i))
        .collect();

    let mut projects: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, node) in graph.nodes.iter().enumerate() {
        projects.entry(node.project.as_str()).or_default().push(i);
    }

    for (project, members) in &projects {
        let _ = writeln!(out, "    subgraph cluster_{} {{", sanitize_dot_id(project));
        let _ = writeln!(out, "        label=\"{}\";", escape_label(project));
        let _ = writeln!(out, "        color=lightgrey;");
        for &i in members {
            let node = &graph.nodes[i];
            let fill = if node.is_test { TEST_FILL } else { SOURCE_FILL };
            let _ = writeln!(
                out,
                "        n{} [label=\"{}\" fillcolor=\"{}\"];",
                i,
                escape_label(&node.file),
                fill
            );
        }
        let _ = writeln!(out, "    }}");
    }

    for edge in &graph.edges {
        let (Some(from), Some(to)) = (ids.get(edge.from.as_str()), ids.get(edge.to.as_str())) else {
            continue;
        };
        let style = if edge.cross_project { "style=dashed" } else { "style=solid" };
        let _ = writeln!(out, "    n{} -> n{} [{}];", from, to, style);
    }

    let _ = writeln!(out, "}}");
    out
}
