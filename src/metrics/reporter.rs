//! Metrics reporter - output formatting and export
//!
//! Supports multiple output formats:
//! - Console (human-readable)
//! - JSON
//! - CSV (one row per run)

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use crate::benchmark::aggregator::{rank, Aggregate, Ranking};
use crate::benchmark::runner::{BaselineResult, RunOutcome};
use crate::config::OutputFormat;
use crate::microbench::{IoBenchResult, PingPongSummary};
use crate::utils::{format_count, format_duration, format_throughput, Result};

const CSV_HEADER: &str = "strategy,workload,repetition,status,observed,expected,duration_ms,lost_updates,reads,size_regressions,worker_p50_us,worker_max_us";

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Everything one invocation produced
#[derive(Debug, Default)]
pub struct BenchmarkReport {
    /// Configuration summary
    pub config_summary: String,
    pub aggregates: Vec<Aggregate>,
    pub baselines: Vec<BaselineResult>,
    pub io: Option<IoBenchResult>,
    pub ping_pong: Option<PingPongSummary>,
}

impl BenchmarkReport {
    pub fn new(config_summary: &str) -> Self {
        Self {
            config_summary: config_summary.to_string(),
            ..Default::default()
        }
    }

    /// Total runs across all strategies
    pub fn total_runs(&self) -> usize {
        self.aggregates.iter().map(Aggregate::repetitions).sum()
    }

    /// Runs torn down by a concurrent-mutation fault
    pub fn total_crashes(&self) -> usize {
        self.aggregates.iter().map(Aggregate::crashed).sum()
    }

    /// Runs that finished with lost updates
    pub fn total_lost(&self) -> usize {
        self.aggregates.iter().map(Aggregate::lost).sum()
    }

    pub fn has_crashes(&self) -> bool {
        self.total_crashes() > 0
    }

    /// Export all results to JSON
    pub fn to_json(&self) -> serde_json::Value {
        let rankings = rank(&self.aggregates);
        serde_json::json!({
            "config": self.config_summary,
            "strategies": rankings.iter().map(ranking_to_json).collect::<Vec<_>>(),
            "baselines": self.baselines.iter().map(|b| {
                serde_json::json!({
                    "workload": b.workload,
                    "observed": b.observed,
                    "expected": b.expected,
                    "duration_ms": millis(b.duration),
                })
            }).collect::<Vec<_>>(),
            "io": self.io.as_ref().map(io_to_json),
            "ping_pong": self.ping_pong.as_ref().map(|p| {
                serde_json::json!({
                    "passes": p.passes.len(),
                    "rounds": p.passes.first().map(|r| r.rounds),
                    "mean_duration_ms": millis(p.mean_duration()),
                    "mean_per_switch_ns": p.mean_per_switch().as_nanos() as u64,
                })
            }),
            "totals": {
                "runs": self.total_runs(),
                "lost": self.total_lost(),
                "crashed": self.total_crashes(),
            }
        })
    }

    /// Write all results to JSON file
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;
        writeln!(file, "{}", serde_json::to_string_pretty(&self.to_json())?)?;
        Ok(())
    }

    /// Write one CSV row per run
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "{}", CSV_HEADER)?;
        for aggregate in &self.aggregates {
            for (i, outcome) in aggregate.outcomes.iter().enumerate() {
                writeln!(out, "{}", outcome_csv_row(outcome, i + 1))?;
            }
        }
        Ok(())
    }

    /// Write one CSV row per run to a file
    pub fn write_csv_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write_csv(io::BufWriter::new(file))?;
        Ok(())
    }
}

fn outcome_to_json(outcome: &RunOutcome, repetition: usize) -> serde_json::Value {
    match outcome {
        RunOutcome::Completed(r) => serde_json::json!({
            "repetition": repetition,
            "status": outcome.status(),
            "observed": r.observed,
            "expected": r.expected,
            "correct": r.is_correct(),
            "lost_updates": r.lost_updates(),
            "duration_ms": millis(r.duration),
            "throughput": r.throughput(),
            "reads": r.reads,
            "size_regressions": r.size_regressions,
            "worker_latency": {
                "p50_us": r.worker_histogram.value_at_percentile(50.0),
                "p99_us": r.worker_histogram.value_at_percentile(99.0),
                "max_us": r.worker_histogram.max(),
            }
        }),
        RunOutcome::Crashed(f) => serde_json::json!({
            "repetition": repetition,
            "status": outcome.status(),
            "observed": null,
            "expected": f.expected,
            "correct": false,
            "duration_ms": millis(f.duration),
            "fault": {
                "message": f.message,
                "faulted_threads": f.faulted_threads,
            }
        }),
    }
}

fn ranking_to_json(ranking: &Ranking<'_>) -> serde_json::Value {
    let a = ranking.aggregate;
    serde_json::json!({
        "strategy": a.strategy,
        "workload": a.workload,
        "safety": a.safety(),
        "rank": ranking.rank,
        "relative": ranking.relative,
        "correct": a.is_correct(),
        "repetitions": a.repetitions(),
        "passed": a.passed(),
        "lost": a.lost(),
        "crashed": a.crashed(),
        "expected": a.expected(),
        "mean_ms": a.mean_duration().map(millis),
        "stddev_ms": a.stddev().map(millis),
        "variance_ms2": a.variance_secs().map(|v| v * 1_000_000.0),
        "min_ms": a.min_duration().map(millis),
        "max_ms": a.max_duration().map(millis),
        "runs": a.outcomes.iter().enumerate()
            .map(|(i, o)| outcome_to_json(o, i + 1))
            .collect::<Vec<_>>(),
    })
}

fn io_to_json(io: &IoBenchResult) -> serde_json::Value {
    serde_json::json!({
        "lines": io.lines,
        "passes": io.unbuffered.len(),
        "unbuffered_mean_ms": millis(io.mean_unbuffered()),
        "buffered_mean_ms": millis(io.mean_buffered()),
        "unbuffered_sink_writes": io.unbuffered.first().map(|s| s.sink_writes),
        "buffered_sink_writes": io.buffered.first().map(|s| s.sink_writes),
        "speedup": io.speedup(),
    })
}

fn outcome_csv_row(outcome: &RunOutcome, repetition: usize) -> String {
    match outcome {
        RunOutcome::Completed(r) => format!(
            "{},{},{},{},{},{},{:.3},{},{},{},{},{}",
            r.strategy,
            r.workload,
            repetition,
            outcome.status(),
            r.observed,
            r.expected,
            millis(r.duration),
            r.lost_updates(),
            r.reads,
            r.size_regressions,
            r.worker_histogram.value_at_percentile(50.0),
            r.worker_histogram.max()
        ),
        RunOutcome::Crashed(f) => format!(
            "{},{},{},{},,{},{:.3},,,,,",
            f.strategy,
            f.workload,
            repetition,
            outcome.status(),
            f.expected,
            millis(f.duration)
        ),
    }
}

/// Metrics reporter
pub struct MetricsReporter {
    format: OutputFormat,
    quiet: bool,
}

impl MetricsReporter {
    /// Create new reporter with specified format
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Print the final report to stdout
    pub fn report(&self, report: &BenchmarkReport) -> Result<()> {
        match self.format {
            OutputFormat::Text => {
                if !self.quiet {
                    self.report_console(report);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&report.to_json())?);
            }
            OutputFormat::Csv => {
                report.write_csv(io::stdout().lock())?;
            }
        }
        Ok(())
    }

    /// Report to console (human-readable)
    fn report_console(&self, report: &BenchmarkReport) {
        for aggregate in &report.aggregates {
            print_aggregate(aggregate);
        }

        let rankings = rank(&report.aggregates);
        if rankings.len() > 1 {
            print_ranking(&rankings);
        }

        for baseline in &report.baselines {
            println!(
                "\nSingle-threaded {} baseline: count = {} | Time: {}",
                baseline.workload,
                format_count(baseline.observed),
                format_duration(baseline.duration)
            );
        }

        if let Some(ref io) = report.io {
            println!("\n=== Buffered vs unbuffered writes ({} lines) ===", format_count(io.lines));
            println!(
                "Unbuffered: {} avg ({} sink writes) | Buffered: {} avg ({} sink writes)",
                format_duration(io.mean_unbuffered()),
                format_count(io.unbuffered.first().map(|s| s.sink_writes).unwrap_or(0)),
                format_duration(io.mean_buffered()),
                format_count(io.buffered.first().map(|s| s.sink_writes).unwrap_or(0)),
            );
            if let Some(speedup) = io.speedup() {
                println!("Speed difference: {:.2}x faster with buffering", speedup);
            }
        }

        if let Some(ref ping_pong) = report.ping_pong {
            let rounds = ping_pong.passes.first().map(|p| p.rounds).unwrap_or(0);
            println!("\n=== Channel ping-pong ({} round trips) ===", format_count(rounds));
            println!(
                "Average: {} total ({:?} per switch)",
                format_duration(ping_pong.mean_duration()),
                ping_pong.mean_per_switch()
            );
        }
    }
}

/// One line per run, e.g. `Run 1: count = 50,000 / 50,000 | Time: 3.21ms [ok]`
pub fn format_run_line(outcome: &RunOutcome, repetition: usize) -> String {
    match outcome {
        RunOutcome::Completed(r) => format!(
            "  [{}/{}] Run {}: count = {} / {} | Time: {} [{}]{}",
            r.strategy,
            r.workload,
            repetition,
            format_count(r.observed),
            format_count(r.expected),
            format_duration(r.duration),
            outcome.status(),
            if r.size_regressions > 0 {
                format!(" | size regressions: {}", r.size_regressions)
            } else {
                String::new()
            }
        ),
        RunOutcome::Crashed(f) => format!(
            "  [{}/{}] Run {}: CRASHED ({}) after {} | {} thread(s) faulted",
            f.strategy,
            f.workload,
            repetition,
            f.message,
            format_duration(f.duration),
            f.faulted_threads
        ),
    }
}

/// Print summary for one strategy
pub fn print_aggregate(aggregate: &Aggregate) {
    println!(
        "\n=== {} ({} workload, {}) ===",
        aggregate.strategy,
        aggregate.workload,
        aggregate.safety().as_str()
    );

    match (aggregate.mean_duration(), aggregate.stddev()) {
        (Some(mean), Some(stddev)) => println!(
            "Mean: {} | Stddev: {} | Min: {} | Max: {}",
            format_duration(mean),
            format_duration(stddev),
            aggregate.min_duration().map(format_duration).unwrap_or_default(),
            aggregate.max_duration().map(format_duration).unwrap_or_default(),
        ),
        _ => println!("Mean: n/a (no run completed)"),
    }

    println!(
        "Runs: {} | passed={} lost={} crashed={} | Verdict: {}",
        aggregate.repetitions(),
        aggregate.passed(),
        aggregate.lost(),
        aggregate.crashed(),
        if aggregate.is_correct() { "CORRECT" } else { "INCORRECT" }
    );

    if let Some(throughput) = aggregate.mean_throughput() {
        println!("Throughput: {} writes/s", format_throughput(throughput));
    }

    if aggregate.total_lost_updates() > 0 {
        println!(
            "Lost updates: {} across all runs",
            format_count(aggregate.total_lost_updates())
        );
    }

    if aggregate.total_size_regressions() > 0 {
        println!(
            "Size regressions seen by readers: {}",
            format_count(aggregate.total_size_regressions())
        );
    }

    if let Some(histogram) = aggregate.worker_histogram() {
        println!(
            "Worker completion (ms): p50={:.3} p99={:.3} max={:.3}",
            histogram.value_at_percentile(50.0) as f64 / 1000.0,
            histogram.value_at_percentile(99.0) as f64 / 1000.0,
            histogram.max() as f64 / 1000.0
        );
    }
}

/// Print the relative ranking table
pub fn print_ranking(rankings: &[Ranking<'_>]) {
    println!("\n=== Ranking ===");
    println!(
        "{:>4} {:10} {:8} {:>12} {:>9} {:>10}",
        "Rank", "Strategy", "Workload", "Mean", "Relative", "Verdict"
    );
    println!("{}", "-".repeat(58));
    for ranking in rankings {
        let a = ranking.aggregate;
        println!(
            "{:>4} {:10} {:8} {:>12} {:>9} {:>10}",
            ranking.rank,
            a.strategy.as_str(),
            a.workload.as_str(),
            a.mean_duration().map(format_duration).unwrap_or_else(|| "n/a".to_string()),
            ranking
                .relative
                .map(|r| format!("{:.2}x", r))
                .unwrap_or_else(|| "-".to_string()),
            if a.is_correct() { "correct" } else { "incorrect" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::runner::{new_histogram, RunFault, RunResult};
    use crate::strategy::{StrategyKind, WorkloadKind};

    fn sample_report() -> BenchmarkReport {
        let mut histogram = new_histogram().unwrap();
        histogram.record(1200).unwrap();

        let mut mutex = Aggregate::new(StrategyKind::Mutex, WorkloadKind::Map);
        mutex.push(RunOutcome::Completed(RunResult {
            strategy: StrategyKind::Mutex,
            workload: WorkloadKind::Map,
            duration: Duration::from_millis(4),
            observed: 50_000,
            expected: 50_000,
            worker_histogram: histogram,
            reads: 0,
            size_regressions: 0,
        }));

        let mut none = Aggregate::new(StrategyKind::None, WorkloadKind::Map);
        none.push(RunOutcome::Crashed(RunFault {
            strategy: StrategyKind::None,
            workload: WorkloadKind::Map,
            message: "concurrent map writes".to_string(),
            faulted_threads: 3,
            expected: 50_000,
            duration: Duration::from_millis(1),
        }));

        let mut report = BenchmarkReport::new("workers=50");
        report.aggregates = vec![mutex, none];
        report
    }

    #[test]
    fn test_report_totals() {
        let report = sample_report();
        assert_eq!(report.total_runs(), 2);
        assert_eq!(report.total_crashes(), 1);
        assert_eq!(report.total_lost(), 0);
        assert!(report.has_crashes());
    }

    #[test]
    fn test_report_json() {
        let json = sample_report().to_json();
        assert_eq!(json["config"], "workers=50");
        assert_eq!(json["totals"]["crashed"], 1);

        let strategies = json["strategies"].as_array().unwrap();
        assert_eq!(strategies.len(), 2);
        assert_eq!(strategies[0]["strategy"], "mutex");
        assert_eq!(strategies[0]["rank"], 1);
        assert_eq!(strategies[0]["correct"], true);
        assert_eq!(strategies[0]["runs"][0]["observed"], 50_000);
        assert_eq!(strategies[1]["safety"], "unsafe");
        assert_eq!(strategies[1]["runs"][0]["status"], "crashed");
        assert!(strategies[1]["runs"][0]["observed"].is_null());
        assert!(json["io"].is_null());
    }

    #[test]
    fn test_report_csv() {
        let mut out = Vec::new();
        sample_report().write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("mutex,map,1,ok,50000,50000,4.000,0,0,0,"));
        assert!(lines[2].starts_with("none,map,1,crashed,,50000,1.000"));
        assert_eq!(
            lines[2].split(',').count(),
            CSV_HEADER.split(',').count()
        );
    }

    #[test]
    fn test_run_line() {
        let report = sample_report();
        let line = format_run_line(&report.aggregates[0].outcomes[0], 1);
        assert!(line.contains("count = 50,000 / 50,000"));
        assert!(line.contains("[ok]"));

        let line = format_run_line(&report.aggregates[1].outcomes[0], 1);
        assert!(line.contains("CRASHED (concurrent map writes)"));
    }

    #[test]
    fn test_write_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        sample_report().write_json(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["totals"]["runs"], 2);
    }
}
