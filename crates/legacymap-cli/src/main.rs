//! legacymap CLI
//!
//! Builds a knowledge graph of a legacy Java web application from a normalized
//! source inventory:
//! - `assemble`: run the linkers, filter, derive traces, gate, write the graph document
//! - `check`: structural and gate re-check of an existing graph document
//! - `traces`: print request traces from a graph document

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use legacymap_assemble::{assemble, assemble_lenient, check_document, Diagnostics};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod load;
mod report;

#[derive(Parser)]
#[command(name = "legacymap")]
#[command(author, version, about = "legacymap: knowledge graphs of legacy Java web applications")]
struct Cli {
    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a graph document from a source inventory.
    Assemble(AssembleArgs),

    /// Re-check an existing graph document (structure, digest, gates).
    Check {
        /// Graph document JSON
        #[arg(long)]
        graph: PathBuf,
        /// Assembly configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print request traces from a graph document.
    Traces {
        /// Graph document JSON
        #[arg(long)]
        graph: PathBuf,
        /// Only traces starting at this route id
        #[arg(long)]
        route: Option<String>,
    },
}

#[derive(Args)]
struct AssembleArgs {
    /// Inventory JSON (whole document or array of per-file records)
    #[arg(long, conflicts_with = "inventory_dir")]
    inventory: Option<PathBuf>,
    /// Directory of per-file inventory records (`*.json`)
    #[arg(long)]
    inventory_dir: Option<PathBuf>,
    /// Assembly configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output graph document JSON
    #[arg(short, long)]
    out: PathBuf,
    /// Write the document even when a quality gate fails
    #[arg(long)]
    no_fail: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Assemble(args) => cmd_assemble(&args),
        Commands::Check { graph, config } => cmd_check(&graph, config.as_deref()),
        Commands::Traces { graph, route } => cmd_traces(&graph, route.as_deref()),
    }
}

fn cmd_assemble(args: &AssembleArgs) -> Result<()> {
    let inventory = load::inventory(args.inventory.as_deref(), args.inventory_dir.as_deref())?;
    let config = load::config(args.config.as_deref())?;
    println!(
        "{} {} source files",
        "Assembling".green().bold(),
        inventory.file_count()
    );

    let mut diagnostics = Diagnostics::new();
    let doc = if args.no_fail {
        assemble_lenient(&inventory, &config, &mut diagnostics)?
    } else {
        assemble(&inventory, &config, &mut diagnostics)?
    };

    load::write_document(&args.out, &doc)?;
    report::print_summary(&doc);
    println!("  {} {}", "wrote".green().bold(), args.out.display());
    Ok(())
}

fn cmd_check(graph: &Path, config: Option<&Path>) -> Result<()> {
    let doc = load::document(graph)?;
    let config = load::config(config)?;
    let stats = check_document(&doc, &config)?;
    report::print_coverage(&stats);
    println!(
        "{} {} ({} entities, {} relations, {} traces)",
        "ok".green().bold(),
        graph.display(),
        doc.entities.len(),
        doc.relations.len(),
        doc.traces.len()
    );
    Ok(())
}

fn cmd_traces(graph: &Path, route: Option<&str>) -> Result<()> {
    let doc = load::document(graph)?;
    let traces: Vec<_> = match route {
        Some(route) => doc.traces_for_route(route).collect(),
        None => doc.traces.iter().collect(),
    };
    if traces.is_empty() {
        return match route {
            Some(route) => Err(anyhow!("no traces for route `{route}`")),
            None => {
                println!("{} no traces in {}", "info:".yellow().bold(), graph.display());
                Ok(())
            }
        };
    }
    for trace in traces {
        report::print_trace(trace);
    }
    Ok(())
}
