//! Experiment runner
//!
//! One run = one fresh target, one timed fan-out, one final read. The target
//! is created inside `run` and dropped before it returns, so no state leaks
//! from one run into the next.

use std::collections::HashMap;
use std::hint::black_box;
use std::time::{Duration, Instant};

use hdrhistogram::Histogram;
use tracing::{debug, warn};

use super::worker::{key_range, run_workload, WorkloadReport, WorkloadSpec};
use crate::config::BenchmarkConfig;
use crate::strategy::{build_target, SafetyClass, StrategyKind, WorkloadKind};
use crate::utils::{BenchmarkError, Result};

/// Create the histogram used for worker completion times (microseconds)
pub fn new_histogram() -> Result<Histogram<u64>> {
    Histogram::new_with_bounds(1, 3_600_000_000, 3)
        .map_err(|e| BenchmarkError::Worker(format!("Failed to create histogram: {}", e)))
}

/// Outcome of a run that finished
#[derive(Debug, Clone)]
pub struct RunResult {
    pub strategy: StrategyKind,
    pub workload: WorkloadKind,
    /// Gate release to last join
    pub duration: Duration,
    /// Final `size()` read through the strategy's read path
    pub observed: u64,
    /// `workers * ops_per_worker`
    pub expected: u64,
    /// Per-worker completion times in microseconds
    pub worker_histogram: Histogram<u64>,
    /// `size()` calls made by concurrent readers
    pub reads: u64,
    /// Reads that returned less than the same reader's previous read
    pub size_regressions: u64,
}

impl RunResult {
    /// Derived correctness flag
    pub fn is_correct(&self) -> bool {
        self.observed == self.expected
    }

    /// Writes that did not survive
    pub fn lost_updates(&self) -> u64 {
        self.expected.saturating_sub(self.observed)
    }

    /// Writes per second across all workers
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.expected as f64 / secs
        } else {
            0.0
        }
    }

    /// Slowest worker's completion time in microseconds
    pub fn slowest_worker_us(&self) -> u64 {
        self.worker_histogram.max()
    }
}

/// Outcome of a run torn down by a concurrent-mutation fault
#[derive(Debug, Clone)]
pub struct RunFault {
    pub strategy: StrategyKind,
    pub workload: WorkloadKind,
    /// First panic message collected at the join
    pub message: String,
    /// Threads that panicked
    pub faulted_threads: usize,
    pub expected: u64,
    /// Gate release until every thread (faulted or not) was joined
    pub duration: Duration,
}

/// What one run produced
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(RunResult),
    Crashed(RunFault),
}

impl RunOutcome {
    pub fn strategy(&self) -> StrategyKind {
        match self {
            RunOutcome::Completed(r) => r.strategy,
            RunOutcome::Crashed(f) => f.strategy,
        }
    }

    pub fn workload(&self) -> WorkloadKind {
        match self {
            RunOutcome::Completed(r) => r.workload,
            RunOutcome::Crashed(f) => f.workload,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            RunOutcome::Completed(r) => r.duration,
            RunOutcome::Crashed(f) => f.duration,
        }
    }

    pub fn expected(&self) -> u64 {
        match self {
            RunOutcome::Completed(r) => r.expected,
            RunOutcome::Crashed(f) => f.expected,
        }
    }

    /// Observed count, if the run got far enough to read one
    pub fn observed(&self) -> Option<u64> {
        match self {
            RunOutcome::Completed(r) => Some(r.observed),
            RunOutcome::Crashed(_) => None,
        }
    }

    pub fn is_correct(&self) -> bool {
        matches!(self, RunOutcome::Completed(r) if r.is_correct())
    }

    pub fn is_crashed(&self) -> bool {
        matches!(self, RunOutcome::Crashed(_))
    }

    pub fn as_completed(&self) -> Option<&RunResult> {
        match self {
            RunOutcome::Completed(r) => Some(r),
            RunOutcome::Crashed(_) => None,
        }
    }

    /// Short status label: "ok", "lost", or "crashed"
    pub fn status(&self) -> &'static str {
        match self {
            RunOutcome::Completed(r) if r.is_correct() => "ok",
            RunOutcome::Completed(_) => "lost",
            RunOutcome::Crashed(_) => "crashed",
        }
    }
}

/// Sequential single-thread run on an unshared container
#[derive(Debug, Clone)]
pub struct BaselineResult {
    pub workload: WorkloadKind,
    pub duration: Duration,
    pub observed: u64,
    pub expected: u64,
}

/// Runs single experiments for a fixed workload shape
#[derive(Debug, Clone)]
pub struct ExperimentRunner {
    spec: WorkloadSpec,
}

impl ExperimentRunner {
    pub fn new(spec: WorkloadSpec) -> Self {
        Self { spec }
    }

    /// Build the workload shape from the resolved configuration
    pub fn from_config(config: &BenchmarkConfig) -> Self {
        let spec = WorkloadSpec::writers(config.workers, config.ops_per_worker).with_readers(
            config.readers,
            config.reads_per_reader,
            config.reader_pause,
        );
        Self::new(spec)
    }

    pub fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    /// Expected final count for every run of this runner
    pub fn expected(&self) -> u64 {
        self.spec.total_ops()
    }

    /// Execute one run on a fresh target
    ///
    /// Returns `Err` only for configuration problems (an unsupported
    /// strategy/workload pair) or a failure to spawn threads. Lost updates
    /// come back as an incorrect `Completed` result, worker panics as
    /// `Crashed`.
    pub fn run(&self, strategy: StrategyKind, workload: WorkloadKind) -> Result<RunOutcome> {
        let target = build_target(strategy, workload)?;
        let expected = self.expected();

        let report = run_workload(target.as_ref(), &self.spec)?;

        if report.has_faults() {
            let first = &report.faults[0];
            warn!(
                "{} {} run crashed: {} ({} of {} threads faulted, first: {})",
                strategy,
                workload,
                first.message,
                report.faults.len(),
                self.spec.workers + self.spec.readers,
                first.thread_name
            );
            return Ok(RunOutcome::Crashed(RunFault {
                strategy,
                workload,
                message: first.message.clone(),
                faulted_threads: report.faults.len(),
                expected,
                duration: report.elapsed,
            }));
        }

        let observed = target.size();
        let result = self.build_result(strategy, workload, observed, &report)?;

        debug!(
            "{} {} run: observed {} of {} in {:?}",
            strategy, workload, observed, expected, result.duration
        );
        if !result.is_correct() && strategy.safety(workload) == SafetyClass::Safe {
            warn!(
                "{} {} lost {} updates despite being a safe strategy",
                strategy,
                workload,
                result.lost_updates()
            );
        }

        Ok(RunOutcome::Completed(result))
    }

    fn build_result(
        &self,
        strategy: StrategyKind,
        workload: WorkloadKind,
        observed: u64,
        report: &WorkloadReport,
    ) -> Result<RunResult> {
        let mut worker_histogram = new_histogram()?;
        for worker in &report.workers {
            worker_histogram.saturating_record(worker.elapsed.as_micros() as u64);
        }

        Ok(RunResult {
            strategy,
            workload,
            duration: report.elapsed,
            observed,
            expected: self.expected(),
            worker_histogram,
            reads: report.total_reads(),
            size_regressions: report.total_regressions(),
        })
    }

    /// Perform the same writes sequentially on an unshared container
    pub fn run_baseline(&self, workload: WorkloadKind) -> BaselineResult {
        let start = Instant::now();
        let observed = match workload {
            WorkloadKind::Counter => {
                let mut counter = 0u64;
                for _ in 0..self.expected() {
                    counter = black_box(counter + 1);
                }
                counter
            }
            WorkloadKind::Map => {
                let mut entries = HashMap::new();
                for worker_id in 0..self.spec.workers {
                    let keys = key_range(worker_id, self.spec.ops_per_worker);
                    let first = keys.start;
                    for key in keys {
                        entries.insert(key, key - first);
                    }
                }
                black_box(&entries);
                entries.len() as u64
            }
        };

        BaselineResult {
            workload,
            duration: start.elapsed(),
            observed,
            expected: self.expected(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(workers: u64, ops: u64) -> ExperimentRunner {
        ExperimentRunner::new(WorkloadSpec::writers(workers, ops))
    }

    #[test]
    fn test_safe_strategies_are_exact() {
        let runner = runner(50, 1000);
        let cases = [
            (StrategyKind::Mutex, WorkloadKind::Counter),
            (StrategyKind::Mutex, WorkloadKind::Map),
            (StrategyKind::RwMutex, WorkloadKind::Counter),
            (StrategyKind::RwMutex, WorkloadKind::Map),
            (StrategyKind::LockFree, WorkloadKind::Map),
            (StrategyKind::Atomic, WorkloadKind::Counter),
        ];

        for (strategy, workload) in cases {
            let outcome = runner.run(strategy, workload).unwrap();
            let result = outcome.as_completed().unwrap();
            assert_eq!(result.expected, 50_000);
            assert_eq!(result.observed, 50_000, "{} {}", strategy, workload);
            assert!(result.is_correct());
            assert_eq!(outcome.status(), "ok");
            assert_eq!(result.worker_histogram.len(), 50);
        }
    }

    #[test]
    fn test_atomic_end_to_end() {
        let runner = runner(10, 100);
        for _ in 0..3 {
            let outcome = runner.run(StrategyKind::Atomic, WorkloadKind::Counter).unwrap();
            assert_eq!(outcome.expected(), 1000);
            assert_eq!(outcome.observed(), Some(1000));
            assert!(outcome.is_correct());
        }
    }

    #[test]
    fn test_racy_counter_never_exceeds_expected() {
        let runner = runner(50, 1000);
        for _ in 0..5 {
            let outcome = runner.run(StrategyKind::None, WorkloadKind::Counter).unwrap();
            assert!(!outcome.is_crashed());
            assert_eq!(outcome.expected(), 50_000);
            assert!(outcome.observed().unwrap() <= 50_000);
        }
    }

    #[test]
    fn test_racy_counter_loses_updates() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        if cores < 2 {
            // Without parallel execution the race window is rarely hit
            return;
        }

        let runner = runner(50, 1000);
        let lossy = (0..10)
            .filter_map(|_| runner.run(StrategyKind::None, WorkloadKind::Counter).ok())
            .filter_map(|o| o.as_completed().map(|r| r.lost_updates()))
            .any(|lost| lost > 0);
        assert!(lossy, "expected at least one of 10 runs to lose updates");
    }

    #[test]
    fn test_unguarded_map_crashes_or_undercounts() {
        let runner = runner(50, 1000);
        let outcome = runner.run(StrategyKind::None, WorkloadKind::Map).unwrap();
        match outcome {
            RunOutcome::Crashed(fault) => {
                assert!(fault.faulted_threads >= 1);
                assert!(fault.message.contains("concurrent map"));
                assert_eq!(fault.expected, 50_000);
            }
            RunOutcome::Completed(result) => {
                assert!(result.observed <= result.expected);
            }
        }
    }

    #[test]
    fn test_unsupported_pair_fails_fast() {
        let err = runner(2, 2)
            .run(StrategyKind::LockFree, WorkloadKind::Counter)
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_fresh_target_per_run() {
        let runner = runner(4, 250);
        let first = runner.run(StrategyKind::Mutex, WorkloadKind::Counter).unwrap();
        let second = runner.run(StrategyKind::Mutex, WorkloadKind::Counter).unwrap();
        assert_eq!(first.observed(), Some(1000));
        assert_eq!(second.observed(), Some(1000));
    }

    #[test]
    fn test_readers_during_rwlock_run() {
        let runner = ExperimentRunner::new(
            WorkloadSpec::writers(20, 1000).with_readers(10, 100, Duration::ZERO),
        );
        let outcome = runner.run(StrategyKind::RwMutex, WorkloadKind::Map).unwrap();
        let result = outcome.as_completed().unwrap();
        assert!(result.is_correct());
        assert_eq!(result.reads, 1000);
        assert_eq!(result.size_regressions, 0);
    }

    #[test]
    fn test_baseline() {
        let runner = runner(50, 1000);
        for workload in [WorkloadKind::Counter, WorkloadKind::Map] {
            let baseline = runner.run_baseline(workload);
            assert_eq!(baseline.observed, 50_000);
            assert_eq!(baseline.expected, 50_000);
        }
    }

    #[test]
    fn test_lost_updates_and_status() {
        let result = RunResult {
            strategy: StrategyKind::None,
            workload: WorkloadKind::Counter,
            duration: Duration::from_millis(2),
            observed: 48_000,
            expected: 50_000,
            worker_histogram: new_histogram().unwrap(),
            reads: 0,
            size_regressions: 0,
        };
        assert!(!result.is_correct());
        assert_eq!(result.lost_updates(), 2000);
        assert_eq!(RunOutcome::Completed(result).status(), "lost");
    }
}
