//! Command-line argument parsing
//!
//! Arguments are grouped by category. Defaults reproduce the classic
//! experiment: 50 workers, 1000 operations each, 3 repetitions.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::strategy::{StrategyKind, WorkloadKind};

/// Benchmark harness comparing synchronization strategies for shared state
#[derive(Parser, Debug, Clone)]
#[command(name = "syncbench")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    // ===== Workload Shape =====
    /// Number of concurrent workers
    #[arg(short = 'w', long = "workers", default_value_t = 50)]
    pub workers: u64,

    /// Operations performed by each worker
    #[arg(short = 'n', long = "ops", default_value_t = 1000)]
    pub ops_per_worker: u64,

    /// Runs per strategy
    #[arg(short = 'r', long = "repetitions", default_value_t = 3)]
    pub repetitions: u32,

    // ===== Strategy Selection =====
    /// Synchronization strategies to compare
    #[arg(
        short = 's',
        long = "strategy",
        value_enum,
        value_delimiter = ',',
        default_values_t = [StrategyKind::Mutex, StrategyKind::RwMutex, StrategyKind::LockFree]
    )]
    pub strategies: Vec<StrategyKind>,

    /// Shared target shape (default: each strategy's natural workload)
    #[arg(long = "workload", value_enum)]
    pub workload: Option<WorkloadKind>,

    // ===== Concurrent Readers =====
    /// Reader threads calling size() while workers write
    #[arg(long = "readers", default_value_t = 0)]
    pub readers: u64,

    /// size() calls per reader
    #[arg(long = "reads-per-reader", default_value_t = 100)]
    pub reads_per_reader: u64,

    /// Pause between two reads of one reader, in microseconds
    #[arg(long = "reader-pause-us", default_value_t = 1)]
    pub reader_pause_us: u64,

    // ===== Extra Experiments =====
    /// Also time the same writes on one thread without sharing
    #[arg(long = "baseline")]
    pub baseline: bool,

    /// Pause between consecutive runs, in milliseconds
    #[arg(long = "cooldown-ms", default_value_t = 100)]
    pub cooldown_ms: u64,

    /// Run the buffered vs unbuffered write benchmark in this directory
    #[arg(long = "io-bench")]
    pub io_bench_dir: Option<PathBuf>,

    /// Lines written per I/O benchmark pass
    #[arg(long = "io-lines", default_value_t = 100_000)]
    pub io_lines: u64,

    /// Run the channel ping-pong benchmark with this many round trips
    #[arg(long = "ping-pong")]
    pub ping_pong_rounds: Option<u64>,

    // ===== Output Options =====
    /// JSON output file
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// CSV output file (one row per run)
    #[arg(long = "csv")]
    pub csv_output: Option<PathBuf>,

    /// Summary format printed to stdout
    #[arg(long = "output-format", value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// Quiet mode (errors only, no progress bar)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Verbose output (per-run debug logging)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format for the summary
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("--workers must be at least 1".to_string());
        }

        if self.ops_per_worker == 0 {
            return Err("--ops must be at least 1".to_string());
        }

        if self.workers.checked_mul(self.ops_per_worker).is_none() {
            return Err(format!(
                "--workers ({}) x --ops ({}) overflows the key space",
                self.workers, self.ops_per_worker
            ));
        }

        if self.repetitions == 0 {
            return Err("--repetitions must be at least 1".to_string());
        }

        if self.strategies.is_empty() {
            return Err("--strategy needs at least one strategy".to_string());
        }

        if let Some(workload) = self.workload {
            if let Some(bad) = self.strategies.iter().find(|s| !s.supports(workload)) {
                return Err(format!(
                    "strategy '{}' does not support the {} workload",
                    bad, workload
                ));
            }
        }

        if self.readers > 0 && self.reads_per_reader == 0 {
            return Err("--reads-per-reader must be at least 1 when --readers is set".to_string());
        }

        if self.io_bench_dir.is_some() && self.io_lines == 0 {
            return Err("--io-lines must be at least 1".to_string());
        }

        if self.ping_pong_rounds == Some(0) {
            return Err("--ping-pong must be at least 1".to_string());
        }

        if self.quiet && self.verbose {
            return Err("--quiet and --verbose are mutually exclusive".to_string());
        }

        Ok(())
    }
}
