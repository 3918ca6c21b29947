//! Stand-alone micro-benchmarks
//!
//! These sit beside the strategy harness and share nothing with it:
//! - io: buffered vs unbuffered writes through a `Write` sink
//! - ping_pong: context-switch cost of a rendezvous channel round trip

pub mod io;
pub mod ping_pong;

pub use io::{run_io_bench, write_buffered, write_unbuffered, CountingWriter, IoBenchResult, WriteStats};
pub use ping_pong::{run_ping_pong, run_ping_pong_repeated, PingPongResult, PingPongSummary};

use std::time::Duration;

/// Arithmetic mean of a set of durations
pub(crate) fn mean_duration(durations: &[Duration]) -> Duration {
    if durations.is_empty() {
        return Duration::ZERO;
    }
    durations.iter().sum::<Duration>() / durations.len() as u32
}
