//! Result aggregation
//!
//! Repeats runs of one strategy back to back, keeps every outcome, and
//! derives duration statistics and a correctness verdict. A single lost
//! update or crash among N runs is enough to fail the strategy; failures are
//! never averaged away.

use std::cmp::Ordering;
use std::thread;
use std::time::Duration;

use hdrhistogram::Histogram;
use tracing::debug;

use super::runner::{ExperimentRunner, RunOutcome, RunResult};
use crate::strategy::{SafetyClass, StrategyKind, WorkloadKind};
use crate::utils::Result;

/// All runs of one strategy under one configuration
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub strategy: StrategyKind,
    pub workload: WorkloadKind,
    pub outcomes: Vec<RunOutcome>,
}

impl Aggregate {
    pub fn new(strategy: StrategyKind, workload: WorkloadKind) -> Self {
        Self {
            strategy,
            workload,
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: RunOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn repetitions(&self) -> usize {
        self.outcomes.len()
    }

    pub fn safety(&self) -> SafetyClass {
        self.strategy.safety(self.workload)
    }

    /// Runs that finished (correct or not)
    pub fn completed(&self) -> impl Iterator<Item = &RunResult> {
        self.outcomes.iter().filter_map(RunOutcome::as_completed)
    }

    /// Runs whose observed count matched the expected count
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_correct()).count()
    }

    /// Runs that finished with lost updates
    pub fn lost(&self) -> usize {
        self.completed().filter(|r| !r.is_correct()).count()
    }

    /// Runs torn down by a concurrent-mutation fault
    pub fn crashed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_crashed()).count()
    }

    /// True only if there was at least one run and every run was correct
    pub fn is_correct(&self) -> bool {
        !self.outcomes.is_empty() && self.passed() == self.outcomes.len()
    }

    /// Expected count shared by every run
    pub fn expected(&self) -> Option<u64> {
        self.outcomes.first().map(RunOutcome::expected)
    }

    /// Lost updates summed over all completed runs
    pub fn total_lost_updates(&self) -> u64 {
        self.completed().map(RunResult::lost_updates).sum()
    }

    /// Size regressions seen by concurrent readers, summed over all runs
    pub fn total_size_regressions(&self) -> u64 {
        self.completed().map(|r| r.size_regressions).sum()
    }

    fn completed_secs(&self) -> Vec<f64> {
        self.completed().map(|r| r.duration.as_secs_f64()).collect()
    }

    /// Arithmetic mean duration over completed runs
    pub fn mean_duration(&self) -> Option<Duration> {
        let secs = self.completed_secs();
        if secs.is_empty() {
            return None;
        }
        let mean = secs.iter().sum::<f64>() / secs.len() as f64;
        Some(Duration::from_secs_f64(mean))
    }

    /// Population variance of completed-run durations, in seconds squared
    pub fn variance_secs(&self) -> Option<f64> {
        let secs = self.completed_secs();
        if secs.is_empty() {
            return None;
        }
        let n = secs.len() as f64;
        let mean = secs.iter().sum::<f64>() / n;
        Some(secs.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n)
    }

    /// Standard deviation of completed-run durations
    pub fn stddev(&self) -> Option<Duration> {
        self.variance_secs()
            .map(|v| Duration::from_secs_f64(v.sqrt()))
    }

    pub fn min_duration(&self) -> Option<Duration> {
        self.completed().map(|r| r.duration).min()
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.completed().map(|r| r.duration).max()
    }

    /// Worker completion times merged across all completed runs
    pub fn worker_histogram(&self) -> Option<Histogram<u64>> {
        let mut runs = self.completed();
        let mut merged = runs.next()?.worker_histogram.clone();
        for run in runs {
            merged.add(&run.worker_histogram).ok();
        }
        Some(merged)
    }

    /// Mean write throughput over completed runs (writes per second)
    pub fn mean_throughput(&self) -> Option<f64> {
        let mean = self.mean_duration()?.as_secs_f64();
        let expected = self.expected()? as f64;
        if mean > 0.0 {
            Some(expected / mean)
        } else {
            None
        }
    }
}

/// Runs repetitions sequentially through one [`ExperimentRunner`]
#[derive(Debug, Clone)]
pub struct Aggregator {
    runner: ExperimentRunner,
    cooldown: Duration,
}

impl Aggregator {
    pub fn new(runner: ExperimentRunner) -> Self {
        Self {
            runner,
            cooldown: Duration::ZERO,
        }
    }

    /// Pause between two consecutive runs
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn runner(&self) -> &ExperimentRunner {
        &self.runner
    }

    /// Run `repetitions` experiments of one strategy
    pub fn aggregate(
        &self,
        strategy: StrategyKind,
        workload: WorkloadKind,
        repetitions: u32,
    ) -> Result<Aggregate> {
        self.aggregate_with(strategy, workload, repetitions, |_| {})
    }

    /// Like [`aggregate`](Self::aggregate), calling `on_run` after every run
    pub fn aggregate_with<F>(
        &self,
        strategy: StrategyKind,
        workload: WorkloadKind,
        repetitions: u32,
        mut on_run: F,
    ) -> Result<Aggregate>
    where
        F: FnMut(&RunOutcome),
    {
        let mut aggregate = Aggregate::new(strategy, workload);

        for repetition in 0..repetitions {
            if repetition > 0 && !self.cooldown.is_zero() {
                thread::sleep(self.cooldown);
            }

            let outcome = self.runner.run(strategy, workload)?;
            debug!(
                "{} {} repetition {}/{}: {}",
                strategy,
                workload,
                repetition + 1,
                repetitions,
                outcome.status()
            );
            on_run(&outcome);
            aggregate.push(outcome);
        }

        Ok(aggregate)
    }

    /// Aggregate several strategies under the identical workload shape
    pub fn compare(
        &self,
        strategies: &[(StrategyKind, WorkloadKind)],
        repetitions: u32,
    ) -> Result<Vec<Aggregate>> {
        strategies
            .iter()
            .map(|&(strategy, workload)| self.aggregate(strategy, workload, repetitions))
            .collect()
    }
}

/// Position of one strategy in a comparison
#[derive(Debug, Clone, Copy)]
pub struct Ranking<'a> {
    /// 1-based position within the aggregate's workload
    pub rank: usize,
    pub aggregate: &'a Aggregate,
    /// Mean duration divided by the fastest correct mean of the same
    /// workload (1.0 = fastest), if both are known
    pub relative: Option<f64>,
}

/// Rank aggregates per workload: correct strategies first, then by mean
/// duration (fastest first). Aggregates without a completed run go last.
pub fn rank(aggregates: &[Aggregate]) -> Vec<Ranking<'_>> {
    let mut sorted: Vec<&Aggregate> = aggregates.iter().collect();
    sorted.sort_by(|a, b| {
        a.workload
            .as_str()
            .cmp(b.workload.as_str())
            .then_with(|| b.is_correct().cmp(&a.is_correct()))
            .then_with(|| compare_means(a.mean_duration(), b.mean_duration()))
    });

    let mut rankings = Vec::with_capacity(sorted.len());
    let mut position = 0;
    let mut current_workload = None;
    let mut fastest = None;

    for aggregate in sorted {
        if current_workload != Some(aggregate.workload) {
            current_workload = Some(aggregate.workload);
            position = 0;
            fastest = aggregate.mean_duration().filter(|_| aggregate.is_correct());
        }
        position += 1;

        let relative = match (aggregate.mean_duration(), fastest) {
            (Some(mean), Some(best)) if !best.is_zero() => {
                Some(mean.as_secs_f64() / best.as_secs_f64())
            }
            _ => None,
        };

        rankings.push(Ranking {
            rank: position,
            aggregate,
            relative,
        });
    }

    rankings
}

fn compare_means(a: Option<Duration>, b: Option<Duration>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
