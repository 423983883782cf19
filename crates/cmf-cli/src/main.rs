//! Command line front end for the lesson engine.

mod cli;

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cmf_core::import::import_pgn;
use cmf_core::mainline::{calculate_dynamic_mainline_path, calculate_mainline_path};
use cmf_core::move_index::position_at;
use cmf_core::traversal::{
    analyze_graph, analyze_node, compute_state_at_node, find_path_to_node, get_all_paths,
    get_mainline_path, search_nodes, PathOptions, SearchOptions,
};
use cmf_core::{validate, EngineConfig, MoveGraph, Timeline};

use crate::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = EngineConfig::from_env();
    if let Some(window) = cli.pause_window_ms {
        config.pause_window_ms = window;
    }

    run(cli.command, &config)
}

fn load(path: &Path) -> anyhow::Result<MoveGraph> {
    let graph = MoveGraph::from_file(path)
        .with_context(|| format!("Failed to load lesson {}", path.display()))?;
    if !graph.events_sorted() {
        tracing::warn!("Events in {} are not in time order", path.display());
    }
    Ok(graph)
}

fn emit<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(command: Commands, config: &EngineConfig) -> anyhow::Result<()> {
    match command {
        Commands::State { file, time_ms } => {
            let graph = load(&file)?;
            let timeline = Timeline::load(&graph, config.clone())?;
            emit(&timeline.state_at(time_ms))
        }
        Commands::Node { file, fen, at } => {
            let graph = load(&file)?;
            let Some(node) = graph.node(&fen) else {
                bail!("Node not found: {fen}");
            };
            let path = find_path_to_node(&graph, &fen)
                .with_context(|| format!("Node is not reachable from the root: {fen}"))?;
            let time_ms = at.unwrap_or(graph.meta.duration_ms);
            emit(&compute_state_at_node(&graph, node, &path, time_ms, config))
        }
        Commands::Index { file, at } => {
            let graph = load(&file)?;
            let timeline = Timeline::load(&graph, config.clone())?;
            match at {
                Some(t) => emit(&position_at(timeline.index(), t)),
                None => emit(&timeline.index()),
            }
        }
        Commands::Mainline { file, at, authored } => {
            let graph = load(&file)?;
            let path = match (authored, at) {
                (true, _) => get_mainline_path(&graph),
                (false, Some(t)) => calculate_dynamic_mainline_path(&graph, t, config),
                (false, None) => calculate_mainline_path(&graph, config),
            };
            emit(&path)
        }
        Commands::Paths {
            file,
            variations,
            max_depth,
        } => {
            let graph = load(&file)?;
            let opts = PathOptions {
                max_depth: max_depth.unwrap_or(config.max_path_depth),
                include_variations: variations,
            };
            emit(&get_all_paths(&graph, opts))
        }
        Commands::Search {
            file,
            text,
            case_sensitive,
            limit,
        } => {
            let graph = load(&file)?;
            let opts = SearchOptions {
                case_sensitive,
                max_results: limit,
            };
            emit(&search_nodes(&graph, &text, &opts))
        }
        Commands::Stats { file } => {
            let graph = load(&file)?;
            emit(&analyze_graph(&graph))
        }
        Commands::Analyze { file, fen } => {
            let graph = load(&file)?;
            match analyze_node(&graph, &fen) {
                Some(analysis) => emit(&analysis),
                None => bail!("Node not found: {fen}"),
            }
        }
        Commands::Validate { file, fix_order } => {
            let mut graph = load(&file)?;
            let report = validate(&graph);
            if fix_order && report.out_of_order_events > 0 {
                graph.sort_events();
                fs::write(&file, graph.to_json_pretty()?)
                    .with_context(|| format!("Failed to write {}", file.display()))?;
                tracing::info!("Re-sorted {} events in {}", graph.events.len(), file.display());
            }
            emit(&report)
        }
        Commands::ImportPgn { file, ms_per_move } => {
            let pgn = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let graph = import_pgn(&pgn, ms_per_move)?;
            emit(&graph)
        }
    }
}
