//! syncbench library
//!
//! Benchmark harness comparing synchronization strategies for a shared
//! counter and a shared map under concurrent writers.

pub mod benchmark;
pub mod config;
pub mod metrics;
pub mod microbench;
pub mod strategy;
pub mod utils;
