//! Benchmark orchestrator
//!
//! Drives every configured strategy through the aggregator, runs the optional
//! baselines and micro-benchmarks, and collects everything into one report.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use super::aggregator::Aggregator;
use super::runner::ExperimentRunner;
use crate::config::{BenchmarkConfig, OutputFormat};
use crate::metrics::{format_run_line, BenchmarkReport};
use crate::microbench::{run_io_bench, run_ping_pong_repeated};
use crate::utils::Result;

/// Benchmark orchestrator
pub struct Orchestrator {
    config: Arc<BenchmarkConfig>,
    aggregator: Aggregator,
}

impl Orchestrator {
    /// Create new orchestrator
    pub fn new(config: BenchmarkConfig) -> Self {
        Self::from_arc(Arc::new(config))
    }

    pub fn from_arc(config: Arc<BenchmarkConfig>) -> Self {
        let aggregator =
            Aggregator::new(ExperimentRunner::from_config(&config)).with_cooldown(config.cooldown);
        Self { config, aggregator }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Per-run lines are only interleaved with human-readable output
    fn shows_runs(&self) -> bool {
        !self.config.quiet && self.config.output_format == OutputFormat::Text
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.shows_runs() {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(self.config.total_runs());
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} runs ({msg})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }

    /// Run all configured experiments
    ///
    /// Crashed runs do not stop the benchmark; they are recorded in the
    /// report and every remaining run still executes.
    pub fn run_all(&self) -> Result<BenchmarkReport> {
        let mut report = BenchmarkReport::new(&self.config.summary());

        let pb = self.progress_bar();
        for experiment in &self.config.experiments {
            pb.set_message(format!("{}/{}", experiment.strategy, experiment.workload));

            let mut repetition = 0;
            let aggregate = self.aggregator.aggregate_with(
                experiment.strategy,
                experiment.workload,
                self.config.repetitions,
                |outcome| {
                    repetition += 1;
                    if self.shows_runs() {
                        pb.println(format_run_line(outcome, repetition));
                    }
                    pb.inc(1);
                },
            )?;

            info!(
                "{} ({}): passed={} lost={} crashed={}",
                aggregate.strategy,
                aggregate.workload,
                aggregate.passed(),
                aggregate.lost(),
                aggregate.crashed()
            );
            report.aggregates.push(aggregate);
        }
        pb.finish_with_message("done");

        if self.config.baseline {
            for workload in self.config.workloads() {
                let baseline = self.aggregator.runner().run_baseline(workload);
                info!(
                    "{} baseline: {} entries in {:?}",
                    workload, baseline.observed, baseline.duration
                );
                report.baselines.push(baseline);
            }
        }

        if let Some(ref dir) = self.config.io_bench_dir {
            info!(
                "Running buffered vs unbuffered writes in {} ({} lines)",
                dir.display(),
                self.config.io_lines
            );
            report.io = Some(run_io_bench(
                dir,
                self.config.io_lines,
                self.config.repetitions,
            )?);
        }

        if let Some(rounds) = self.config.ping_pong_rounds {
            info!("Running channel ping-pong ({} round trips)", rounds);
            report.ping_pong = Some(run_ping_pong_repeated(rounds, self.config.repetitions)?);
        }

        Ok(report)
    }

    /// Write the requested export files
    pub fn export(&self, report: &BenchmarkReport) -> Result<()> {
        if let Some(ref path) = self.config.output_path {
            report.write_json(path)?;
            info!("Results written to {}", path.display());
        }
        if let Some(ref path) = self.config.csv_output {
            report.write_csv_file(path)?;
            info!("CSV written to {}", path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliArgs;
    use clap::Parser;

    fn config(args: &[&str]) -> BenchmarkConfig {
        let mut argv = vec!["syncbench", "--quiet", "--cooldown-ms", "0"];
        argv.extend_from_slice(args);
        BenchmarkConfig::from_cli(&CliArgs::parse_from(argv)).unwrap()
    }

    #[test]
    fn test_run_all_safe_strategies() {
        let orchestrator = Orchestrator::new(config(&[
            "-w", "8", "-n", "200", "-r", "2", "-s", "mutex,rwmutex,lockfree,atomic",
        ]));
        let report = orchestrator.run_all().unwrap();

        assert_eq!(report.aggregates.len(), 4);
        assert_eq!(report.total_runs(), 8);
        assert!(!report.has_crashes());
        for aggregate in &report.aggregates {
            assert!(aggregate.is_correct(), "{} failed", aggregate.strategy);
            assert_eq!(aggregate.expected(), Some(1600));
        }
        assert!(report.baselines.is_empty());
        assert!(report.io.is_none());
        assert!(report.ping_pong.is_none());
    }

    #[test]
    fn test_run_all_with_extras() {
        let dir = tempfile::tempdir().unwrap();
        let dir_arg = dir.path().to_str().unwrap().to_string();
        let orchestrator = Orchestrator::new(config(&[
            "-w", "4", "-n", "100", "-r", "1", "-s", "mutex,atomic", "--baseline",
            "--io-bench", dir_arg.as_str(), "--io-lines", "50", "--ping-pong", "20",
        ]));
        let report = orchestrator.run_all().unwrap();

        assert_eq!(report.baselines.len(), 2);
        assert!(report.baselines.iter().all(|b| b.observed == 400));
        assert_eq!(report.io.as_ref().map(|io| io.lines), Some(50));
        assert_eq!(report.ping_pong.as_ref().map(|p| p.passes.len()), Some(1));
    }

    #[test]
    fn test_export_files() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("out.json");
        let csv = dir.path().join("out.csv");
        let orchestrator = Orchestrator::new(config(&[
            "-w", "2", "-n", "10", "-r", "2", "-s", "mutex",
            "-o", json.to_str().unwrap(), "--csv", csv.to_str().unwrap(),
        ]));

        let report = orchestrator.run_all().unwrap();
        orchestrator.export(&report).unwrap();

        assert!(json.exists());
        let rows = std::fs::read_to_string(&csv).unwrap();
        assert_eq!(rows.lines().count(), 3);
    }
}
