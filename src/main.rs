mod cli;

use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use affected_graph::CrossProjectStrategy;
use affected_graph::export;
use affected_graph::loader::{LoadedWorkspace, load_workspace};
use affected_graph::logging::init_logging;
use affected_graph::output::{OutputFormat, render_paths, render_stats};
use affected_graph::paths::normalize_path;
use affected_graph::watcher::incremental::handle_batch;
use affected_graph::watcher::start_watcher;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Affected {
            root,
            changed,
            stdin,
            project,
            format,
        } => {
            let mut ws = load_workspace(&root)?;
            let mut changed = changed;
            if stdin {
                changed.extend(read_stdin_paths()?);
            }
            let changed = resolve_paths(&ws.root, &changed);
            let result = match project {
                Some(project) => {
                    let project = resolve_path(&ws.root, &project);
                    ws.graph.find_affected_files_in_project(&project, &changed)
                }
                None => ws.graph.find_affected_tests(&changed),
            };
            print_out(&render_paths(&result, format, &ws.root))?;
        }

        Commands::Depends {
            root,
            project,
            changed,
            full_scan,
            format,
        } => {
            let mut ws = load_workspace(&root)?;
            let project = resolve_path(&ws.root, &project);
            if ws.graph.project(&project).is_none() {
                warn!(project = %project.display(), "not a registered project");
            }
            let changed = resolve_paths(&ws.root, &changed);
            let strategy = if full_scan {
                CrossProjectStrategy::FullScan
            } else {
                ws.graph.options().cross_project_strategy
            };
            let result = ws
                .graph
                .find_files_depending_with(&project, &changed, strategy);
            print_out(&render_paths(&result, format, &ws.root))?;
        }

        Commands::Stats { root, json } => {
            let mut ws = load_workspace(&root)?;
            ws.graph.build_graph();
            print_out(&render_stats(&ws.graph.stats(), json))?;
        }

        Commands::Export {
            root,
            format,
            output,
        } => {
            let mut ws = load_workspace(&root)?;
            let exported = ws.graph.export(&ws.root);
            let content = export::render(&exported, format)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &content)
                        .with_context(|| format!("cannot write {}", path.display()))?;
                    info!(
                        path = %path.display(),
                        nodes = exported.nodes.len(),
                        edges = exported.edges.len(),
                        "exported graph"
                    );
                }
                None => print_out(&content)?,
            }
        }

        Commands::Watch { root, format } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("cannot start the async runtime")?;
            runtime.block_on(watch(&root, format))?;
        }
    }

    Ok(())
}

/// Print affected tests after every debounced batch until Ctrl-C.
///
/// The graph stays on this task: events are drained in batches and applied in order.
async fn watch(root: &Path, format: OutputFormat) -> Result<()> {
    let mut ws = load_and_build(root)?;
    let (_handle, mut rx) = start_watcher(&ws.root)
        .with_context(|| format!("cannot watch {}", ws.root.display()))?;
    info!(root = %ws.root.display(), "watching for changes");

    loop {
        let first = tokio::select! {
            event = rx.recv() => event,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(first) = first else { break };

        let mut batch = vec![first];
        while let Ok(event) = rx.try_recv() {
            batch.push(event);
        }

        let outcome = handle_batch(&mut ws.graph, &batch);
        if outcome.reload {
            info!("workspace configuration changed; reloading");
            ws = load_and_build(&ws.root)?;
            continue;
        }
        if !outcome.affected_tests.is_empty() {
            print_out(&render_paths(&outcome.affected_tests, format, &ws.root))?;
        }
    }
    Ok(())
}

fn load_and_build(root: &Path) -> Result<LoadedWorkspace> {
    let mut ws = load_workspace(root)?;
    ws.graph.build_graph();
    Ok(ws)
}

fn read_stdin_paths() -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for line in std::io::stdin().lock().lines() {
        let line = line.context("cannot read changed files from stdin")?;
        let line = line.trim();
        if !line.is_empty() {
            paths.push(PathBuf::from(line));
        }
    }
    Ok(paths)
}

/// Relative paths are taken from the workspace root; existing files are canonicalized
/// so they match the walker's paths, deleted ones are cleaned lexically.
fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    std::fs::canonicalize(&joined).unwrap_or_else(|_| normalize_path(&joined))
}

fn resolve_paths(root: &Path, paths: &[PathBuf]) -> BTreeSet<PathBuf> {
    paths.iter().map(|p| resolve_path(root, p)).collect()
}

fn print_out(content: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(content.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
