use std::path::PathBuf;

use clap::{Parser, Subcommand};

use affected_graph::export::model::ExportFormat;
use affected_graph::output::OutputFormat;

/// Workspace dependency graph for TypeScript/JavaScript monorepos.
///
/// affected-graph links every file of every workspace project into one import
/// graph and reports which test files a set of changed files can affect.
#[derive(Parser, Debug)]
#[command(
    name = "affected-graph",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    /// Debug-level logs on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Errors only on stderr.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the test files affected by a set of changed files.
    ///
    /// With --project, lists every affected file of that project instead.
    Affected {
        /// Workspace root.
        root: PathBuf,

        /// Changed file (repeatable). Relative paths are taken from the workspace root.
        #[arg(short, long = "changed")]
        changed: Vec<PathBuf>,

        /// Also read changed files from stdin, one per line (e.g. `git diff --name-only`).
        #[arg(long)]
        stdin: bool,

        /// Report affected files of this project root rather than affected tests.
        #[arg(long)]
        project: Option<PathBuf>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// List the files of one project that directly import any of the changed files.
    ///
    /// Each candidate is re-resolved with the project's own resolver.
    Depends {
        /// Workspace root.
        root: PathBuf,

        /// Project whose files are searched.
        #[arg(long)]
        project: PathBuf,

        /// Changed file (repeatable).
        #[arg(short, long = "changed", required = true)]
        changed: Vec<PathBuf>,

        /// Scan every file of the project instead of consulting the package reverse index.
        #[arg(long)]
        full_scan: bool,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Build the graph and print its statistics.
    Stats {
        /// Workspace root.
        root: PathBuf,

        /// Output results as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },

    /// Export the whole graph.
    Export {
        /// Workspace root.
        root: PathBuf,

        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Watch the workspace and print the affected tests after every change batch.
    Watch {
        /// Workspace root.
        root: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },
}
