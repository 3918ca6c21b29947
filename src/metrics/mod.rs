//! Result reporting
//!
//! This module provides:
//! - Console summaries per strategy and a ranking table
//! - JSON export of every run and aggregate
//! - CSV export (one row per run)

pub mod reporter;

pub use reporter::{format_run_line, print_aggregate, print_ranking, BenchmarkReport, MetricsReporter};
