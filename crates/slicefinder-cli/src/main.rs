//! Slicefinder CLI
//!
//! Finds the slices of a prepared (one-hot encoded, already scored) table
//! where a model's error concentrates:
//! - `search`: run the lattice search and print the ranked slices
//! - `inspect`: summarize a prepared table before searching it

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use slicefinder_core::{PreparedTable, RowOracle, SearchConfig, TableOracle};

mod report;

#[derive(Parser)]
#[command(name = "slicefinder")]
#[command(author, version, about = "Find the data slices where a model underperforms")]
struct Cli {
    /// Log per-slice decisions (`RUST_LOG` takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a prepared table for its top-K slices.
    Search {
        /// Prepared table (JSON)
        table: PathBuf,
        #[command(flatten)]
        overrides: ConfigArgs,
        /// Print the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print row count, baseline error and predicate coverage.
    Inspect {
        /// Prepared table (JSON)
        table: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct ConfigArgs {
    /// Search config file (JSON); flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of slices to report
    #[arg(long)]
    k: Option<usize>,
    /// Size significance coefficient (slices need rows / alpha rows)
    #[arg(long)]
    alpha: Option<f64>,
    /// Error weight of the score, in [0, 1]
    #[arg(long)]
    w: Option<f64>,
    /// Minimum score for a single predicate to seed the results
    #[arg(long)]
    admit_threshold: Option<f64>,
    /// Deepest lattice level to explore
    #[arg(long)]
    max_level: Option<usize>,
    /// Evaluate each level on all cores
    #[arg(long)]
    parallel: bool,
    /// Bound new slices from every parent pair instead of the first one
    #[arg(long)]
    tight_bounds: bool,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<SearchConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => SearchConfig::default(),
        };

        if let Some(k) = self.k {
            config.k = k;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(w) = self.w {
            config.w = w;
        }
        if let Some(threshold) = self.admit_threshold {
            config.admit_threshold = threshold;
        }
        if self.max_level.is_some() {
            config.max_level = self.max_level;
        }
        if self.parallel {
            config.parallel = true;
        }
        if self.tight_bounds {
            config.bound_parents = slicefinder_core::BoundParents::All;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_table(path: &Path) -> Result<TableOracle> {
    let table =
        PreparedTable::load(path).with_context(|| format!("loading table {}", path.display()))?;
    table
        .into_oracle()
        .with_context(|| format!("building table {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Search {
            table,
            overrides,
            json,
        } => cmd_search(&table, &overrides, json),
        Commands::Inspect { table } => cmd_inspect(&table),
    }
}

fn cmd_search(path: &Path, overrides: &ConfigArgs, json: bool) -> Result<()> {
    let config = overrides.resolve()?;
    tracing::debug!(?config, "resolved search config");
    let oracle = load_table(path)?;
    let outcome = slicefinder_core::search(&oracle, &config)?;

    if json {
        println!("{}", report::to_json(&outcome, &config)?);
        return Ok(());
    }

    println!(
        "{} {} ({} rows, baseline error {:.4})",
        "Top slices of".bold(),
        path.display(),
        outcome.stats.total_rows,
        outcome.stats.baseline_error
    );
    print!("{}", report::render_slices(&outcome.slices));
    println!();
    print!("{}", report::render_levels(&outcome.stats));
    Ok(())
}

fn cmd_inspect(path: &Path) -> Result<()> {
    let oracle = load_table(path)?;
    let rows = oracle.row_count()?;

    println!("{} {}", "Table".bold(), path.display());
    println!("  rows:           {rows}");
    println!("  loss:           {:?}", oracle.loss());
    println!("  baseline error: {:.6}", oracle.baseline_error()?);
    println!("  predicates:     {}", oracle.predicates()?.len());
    for predicate in oracle.predicates()? {
        let covered = oracle.coverage(predicate.column).unwrap_or(0);
        let share = if rows == 0 {
            0.0
        } else {
            covered as f64 / rows as f64
        };
        println!(
            "    {:>4}  {:<32} {:>8} rows ({:>5.1}%)",
            predicate.column,
            predicate.name,
            covered,
            share * 100.0
        );
    }
    Ok(())
}
