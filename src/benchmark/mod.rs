//! Benchmark execution
//!
//! - worker: spawns writer and reader threads behind a start gate
//! - runner: one timed run on a fresh target, with its correctness check
//! - aggregator: repeated runs, statistics and ranking
//! - orchestrator: drives every configured experiment and the extras

pub mod aggregator;
pub mod orchestrator;
pub mod runner;
pub mod worker;

pub use aggregator::{rank, Aggregate, Aggregator, Ranking};
pub use orchestrator::Orchestrator;
pub use runner::{BaselineResult, ExperimentRunner, RunFault, RunOutcome, RunResult};
pub use worker::{run_workload, WorkerFault, WorkloadReport, WorkloadSpec};
