use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use memlab::{BlockRegistry, Comparison, ComparisonPlan, ComparisonSession, SeededRequests, SimConfig};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "memlab driver and workspace automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every strategy once and print the ranked comparison
    Simulate {
        /// Partition size for the fixed-partition run (bytes)
        #[arg(long, default_value_t = 4096)]
        partition: usize,

        /// Request sizes for first-fit and buddy (bytes)
        #[arg(long, value_delimiter = ',', default_values_t = [100, 200, 50])]
        requests: Vec<usize>,

        /// Seed for simulated partition requests (defaults to the clock)
        #[arg(long)]
        seed: Option<u64>,

        /// JSON file overriding arena capacity, request bound and bucket count
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Insert, look up and remove named registry blocks, timing each call
    Registry {
        /// Blocks to insert as `key=size`
        blocks: Vec<String>,

        /// Key to look up after inserting (repeatable)
        #[arg(long = "lookup", value_name = "KEY")]
        lookups: Vec<String>,

        /// Key to remove after the lookups (repeatable)
        #[arg(long = "remove", value_name = "KEY")]
        removals: Vec<String>,
    },
    /// Run the criterion benchmarks
    Bench {
        /// Run quickly (lower sample size/time)
        #[arg(long, default_value_t = false)]
        quick: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { partition, requests, seed, config, format } => {
            simulate(partition, requests, seed, config, format)?;
        }
        Commands::Registry { blocks, lookups, removals } => registry(&blocks, &lookups, &removals)?,
        Commands::Bench { quick } => run_benchmarks(quick)?,
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let json = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    SimConfig::from_json(&json).with_context(|| format!("Invalid config in {}", path.display()))
}

fn simulate(
    partition_size: usize,
    requests: Vec<usize>,
    seed: Option<u64>,
    config: Option<PathBuf>,
    format: Format,
) -> Result<()> {
    let config = load_config(config)?;
    let seed = match seed {
        Some(seed) => seed,
        None => SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs(),
    };
    info!(seed, capacity = config.arena_capacity, "starting simulation");

    let mut session = ComparisonSession::new(config, SeededRequests::seeded(seed))?;
    let comparison = session.run_plan(&ComparisonPlan { partition_size, requests })?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&comparison)?),
        Format::Text => print_comparison(&comparison),
    }
    Ok(())
}

fn print_comparison(comparison: &Comparison) {
    println!("\n--- Strategy Comparison ---");
    for (strategy, stats) in &comparison.per_strategy {
        println!("\n** {strategy} **");
        println!("Runs: {}", stats.runs);
        println!("Elapsed: {:.6} s", stats.elapsed.as_secs_f64());
        println!("Waste: {} bytes", stats.total_waste);
    }
    println!("\n--- Ranking ---");
    println!("Fastest: {}", comparison.fastest);
    println!("Least waste: {}", comparison.least_waste);
}

fn registry(blocks: &[String], lookups: &[String], removals: &[String]) -> Result<()> {
    let mut registry = BlockRegistry::from_config(&SimConfig::default())?;

    for entry in blocks {
        let (key, size) = entry.split_once('=').with_context(|| format!("Expected key=size, got `{entry}`"))?;
        let size: usize = size.parse().with_context(|| format!("Invalid size in `{entry}`"))?;

        let timed = memlab::measure(|| registry.insert(key, size));
        match timed.value {
            Ok(()) => println!("Inserted '{key}' ({size} bytes)"),
            Err(err) => warn!(%err, "insert failed"),
        }
        println!("Elapsed: {:.6} s", timed.elapsed.as_secs_f64());
    }

    for key in lookups {
        let timed = memlab::measure(|| registry.lookup(key));
        match timed.value {
            Some(record) => println!(
                "Found '{}': size={}, range={:?}",
                record.key,
                record.size,
                record.range()
            ),
            None => println!("Key '{key}' not found"),
        }
        println!("Elapsed: {:.6} s", timed.elapsed.as_secs_f64());
    }

    for key in removals {
        let timed = memlab::measure(|| registry.remove(key));
        match timed.value {
            Ok(record) => println!("Released '{}' ({} bytes)", record.key, record.size),
            Err(err) => warn!(%err, "remove failed"),
        }
        println!("Elapsed: {:.6} s", timed.elapsed.as_secs_f64());
    }

    println!("\n--- Registry ({} records) ---", registry.len());
    for (bucket, chain) in registry.buckets() {
        let entries: Vec<String> =
            chain.map(|r| format!("{{key: {}, size: {}, offset: {}}}", r.key, r.size, r.offset)).collect();
        println!("[{bucket}]: {}", entries.join(" -> "));
    }
    for (bucket, record) in registry.list_all() {
        info!(bucket, key = %record.key, size = record.size, offset = record.offset, "registry record");
    }
    Ok(())
}

fn run_benchmarks(quick: bool) -> Result<()> {
    println!("Running strategy benchmarks...");
    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.args(["bench", "--bench", "strategies", "-p", "memlab"]);

    if quick {
        // Args for the test runner (Criterion) go after --
        cmd.arg("--");
        cmd.arg("--measurement-time").arg("0.1");
        cmd.arg("--noplot");
        cmd.arg("--sample-size").arg("10");
    }

    let status = cmd.status().context("Failed to run cargo bench")?;
    if !status.success() {
        anyhow::bail!("Benchmarks failed");
    }

    println!("Finished in {:.2?}", start.elapsed());
    Ok(())
}
