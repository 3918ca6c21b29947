//! Benchmark configuration derived from CLI arguments

use super::cli::{CliArgs, OutputFormat};
use crate::strategy::{StrategyKind, WorkloadKind};
use std::path::PathBuf;
use std::time::Duration;

/// One strategy to benchmark, paired with the workload it will protect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Experiment {
    pub strategy: StrategyKind,
    pub workload: WorkloadKind,
}

/// Complete benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    // Workload shape
    pub workers: u64,
    pub ops_per_worker: u64,
    pub repetitions: u32,
    pub cooldown: Duration,

    // Strategies
    pub experiments: Vec<Experiment>,

    // Concurrent readers
    pub readers: u64,
    pub reads_per_reader: u64,
    pub reader_pause: Duration,

    // Extra experiments
    pub baseline: bool,
    pub io_bench_dir: Option<PathBuf>,
    pub io_lines: u64,
    pub ping_pong_rounds: Option<u64>,

    // Output
    pub output_path: Option<PathBuf>,
    pub csv_output: Option<PathBuf>,
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
}

impl BenchmarkConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self, String> {
        // Validate first
        args.validate()?;

        // Resolve each strategy's workload, dropping repeated selections
        let mut experiments: Vec<Experiment> = Vec::with_capacity(args.strategies.len());
        for &strategy in &args.strategies {
            let experiment = Experiment {
                strategy,
                workload: args
                    .workload
                    .unwrap_or_else(|| strategy.natural_workload()),
            };
            if !experiments.contains(&experiment) {
                experiments.push(experiment);
            }
        }

        Ok(Self {
            workers: args.workers,
            ops_per_worker: args.ops_per_worker,
            repetitions: args.repetitions,
            cooldown: Duration::from_millis(args.cooldown_ms),

            experiments,

            readers: args.readers,
            reads_per_reader: args.reads_per_reader,
            reader_pause: Duration::from_micros(args.reader_pause_us),

            baseline: args.baseline,
            io_bench_dir: args.io_bench_dir.clone(),
            io_lines: args.io_lines,
            ping_pong_rounds: args.ping_pong_rounds,

            output_path: args.output.clone(),
            csv_output: args.csv_output.clone(),
            output_format: args.output_format,
            quiet: args.quiet,
            verbose: args.verbose,
        })
    }

    /// Expected final count of every run
    pub fn expected(&self) -> u64 {
        self.workers * self.ops_per_worker
    }

    /// Distinct workloads across all experiments, in first-seen order
    pub fn workloads(&self) -> Vec<WorkloadKind> {
        let mut workloads = Vec::new();
        for experiment in &self.experiments {
            if !workloads.contains(&experiment.workload) {
                workloads.push(experiment.workload);
            }
        }
        workloads
    }

    /// Total number of runs the benchmark will execute
    pub fn total_runs(&self) -> u64 {
        self.experiments.len() as u64 * self.repetitions as u64
    }

    /// One-line description used in banners and exports
    pub fn summary(&self) -> String {
        format!(
            "workers={}, ops_per_worker={}, repetitions={}, readers={}, strategies={}",
            self.workers,
            self.ops_per_worker,
            self.repetitions,
            self.readers,
            self.experiments
                .iter()
                .map(|e| format!("{}/{}", e.strategy, e.workload))
                .collect::<Vec<_>>()
                .join(",")
        )
    }
}
