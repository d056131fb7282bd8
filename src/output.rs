use std::collections::BTreeSet;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::paths::slash_path;
use crate::query::stats::Stats;

/// Output format for query results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One workspace-relative path per line (default). Pipes straight into a test runner.
    #[default]
    Compact,
    /// JSON array of workspace-relative paths.
    Json,
}

/// `path` relative to `root` with forward slashes, or the absolute path when it lies outside.
pub fn display_path(path: &Path, root: &Path) -> String {
    slash_path(path.strip_prefix(root).unwrap_or(path))
}

/// Render a set of files for stdout.
pub fn render_paths(paths: &BTreeSet<PathBuf>, format: OutputFormat, root: &Path) -> String {
    let rel: Vec<String> = paths.iter().map(|p| display_path(p, root)).collect();
    match format {
        OutputFormat::Compact => {
            let mut out = String::new();
            for p in &rel {
                let _ = writeln!(out, "{p}");
            }
            out
        }
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(&rel).unwrap_or_else(|_| "[]".to_owned());
            out.push('\n');
            out
        }
    }
}

/// Render graph statistics.
///
/// - `json = true`: a pretty-printed JSON object.
/// - `json = false`: a short human-readable summary.
pub fn render_stats(stats: &Stats, json: bool) -> String {
    if json {
        let mut out = serde_json::to_string_pretty(stats).unwrap_or_else(|_| "{}".to_owned());
        out.push('\n');
        return out;
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Built {} modules across {} projects in {}ms",
        stats.module_count, stats.project_count, stats.build_duration_ms
    );
    let _ = writeln!(
        out,
        "  {} edges ({} cross-project), {} package references",
        stats.edge_count, stats.cross_project_edges, stats.package_references
    );
    let _ = writeln!(
        out,
        "  {:.2} importers per file on average",
        stats.avg_importers_per_file
    );
    out
}
