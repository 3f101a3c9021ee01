//! cellstat CLI - measure the storage footprint of cell DAGs
//!
//! Reads bag files (or JSON cell descriptions) and prints deduplicated or
//! raw bit/cell counts. Output is JSON by default so other tools can wrap it.

use anyhow::Context;
use cell_stats::report::TextSink;
use cell_stats::store::{bag_from_json, read_json};
use cell_stats::{
    code_size, collect, collect_many, Cell, CellBag, CellNode, CollectOptions, StorageStats, MAGIC,
};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cellstat")]
#[command(about = "Deduplicated and raw storage accounting for cell DAGs")]
#[command(version)]
struct Cli {
    /// Output format (json or text)
    #[arg(short, long, default_value = "json", global = true)]
    format: OutputFormat,

    /// Log more (repeat for trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Count bits and cells under one root
    Stats {
        /// Bag file or JSON cell description
        file: PathBuf,
        /// Which root of the file to measure
        #[arg(short, long, default_value = "0")]
        root: usize,
        /// Leave the root cell itself out of the count
        #[arg(long)]
        skip_root: bool,
        /// Count every occurrence instead of every distinct cell
        #[arg(long)]
        raw: bool,
    },

    /// Show deduplicated and raw size side by side
    Report {
        /// Bag file or JSON cell description
        file: PathBuf,
        /// Name used in the report (defaults to the file stem)
        #[arg(short, long)]
        label: Option<String>,
        /// Which root of the file to measure
        #[arg(short, long, default_value = "0")]
        root: usize,
    },

    /// Sum every root of every file, counting shared cells once overall
    Sum {
        /// Bag files or JSON cell descriptions
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Count every occurrence instead of every distinct cell
        #[arg(long)]
        raw: bool,
    },

    /// Compile a JSON cell description into a bag file
    Build {
        /// JSON cell description
        input: PathBuf,
        /// Output bag file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show root hashes and shape of a file
    Inspect {
        /// Bag file or JSON cell description
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Stats {
            file,
            root,
            skip_root,
            raw,
        } => {
            let bag = load_bag(&file)?;
            let cell = select_root(&bag, root)?;
            let options = CollectOptions {
                skip_root,
                ignore_visited: raw,
            };
            let stats = collect(cell.as_ref(), &mut HashSet::new(), options);
            let mode = mode_name(raw);

            match cli.format {
                OutputFormat::Json => output(
                    &cli.format,
                    &serde_json::json!({
                        "root": cell.repr_hash().to_hex(),
                        "mode": mode,
                        "stats": stats,
                    }),
                )?,
                OutputFormat::Text => println!("{}", describe(&stats)),
            }
        }

        Commands::Report { file, label, root } => {
            let bag = load_bag(&file)?;
            let cell = select_root(&bag, root)?;
            let label = label.unwrap_or_else(|| default_label(&file));
            let report = code_size(label, cell.as_ref());

            match cli.format {
                OutputFormat::Json => output(&cli.format, &serde_json::to_value(&report)?)?,
                OutputFormat::Text => report.emit(&mut TextSink::new(std::io::stdout().lock()))?,
            }
        }

        Commands::Sum { files, raw } => {
            let options = if raw {
                CollectOptions::raw()
            } else {
                CollectOptions::deduplicated()
            };
            let mut visited = HashSet::new();
            let mut total = StorageStats::zero();
            let mut roots = 0usize;
            let mode = mode_name(raw);
            for file in &files {
                let bag = load_bag(file)?;
                roots += bag.roots().len();
                total += collect_many(bag.roots().iter().map(|r| r.as_ref()), &mut visited, options);
            }

            match cli.format {
                OutputFormat::Json => output(
                    &cli.format,
                    &serde_json::json!({
                        "files": files.len(),
                        "roots": roots,
                        "mode": mode,
                        "stats": total,
                    }),
                )?,
                OutputFormat::Text => println!("{}", describe(&total)),
            }
        }

        Commands::Build { input, output: out } => {
            let bag = read_json(&input)
                .with_context(|| format!("Failed to load {}", input.display()))?;
            bag.write_to(&out)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "roots": bag.roots().len(),
                    "cells": bag.distinct_cells(),
                    "message": format!("Wrote {}", out.display()),
                }),
            )?;
        }

        Commands::Inspect { file } => {
            let bag = load_bag(&file)?;
            let roots: Vec<_> = bag
                .roots()
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "hash": r.hash().to_hex(),
                        "bits": r.bit_len(),
                        "refs": r.refs().len(),
                        "depth": r.depth(),
                    })
                })
                .collect();
            output(
                &cli.format,
                &serde_json::json!({
                    "roots": roots,
                    "distinct_cells": bag.distinct_cells(),
                }),
            )?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load a bag file, or a JSON description when the magic bytes are absent
fn load_bag(path: &Path) -> anyhow::Result<CellBag> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let bag = if data.starts_with(MAGIC) {
        CellBag::decode(&data).with_context(|| format!("Failed to decode {}", path.display()))?
    } else {
        let text = std::str::from_utf8(&data).with_context(|| {
            format!("{} is neither a bag file nor JSON", path.display())
        })?;
        bag_from_json(text).with_context(|| format!("Failed to parse {}", path.display()))?
    };
    Ok(bag)
}

fn select_root(bag: &CellBag, index: usize) -> anyhow::Result<&Arc<Cell>> {
    bag.root(index).ok_or_else(|| {
        anyhow::anyhow!(
            "Root {} out of range, file has {} root(s)",
            index,
            bag.roots().len()
        )
    })
}

fn default_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string())
}

fn mode_name(raw: bool) -> &'static str {
    if raw {
        "raw"
    } else {
        "deduplicated"
    }
}

fn describe(stats: &StorageStats) -> String {
    format!("{} bits and {} cells", stats.bits(), stats.cells())
}

fn output(format: &OutputFormat, value: &serde_json::Value) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
        OutputFormat::Text => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}
