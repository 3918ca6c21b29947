//! Error types for syncbench

use std::io;
use thiserror::Error;

/// Top-level application error
///
/// Lost updates and concurrent-mutation faults are benchmark *outcomes*, not
/// errors; they are reported through `RunOutcome`. Only problems that stop
/// the harness itself end up here.
#[derive(Error, Debug)]
pub enum BenchmarkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BenchmarkError {
    /// Shorthand for a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        BenchmarkError::Config(msg.into())
    }

    /// True if this error was raised before any run started
    pub fn is_config(&self) -> bool {
        matches!(self, BenchmarkError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, BenchmarkError>;
