//! Channel ping-pong
//!
//! Two threads bounce a unit message across a pair of zero-capacity
//! channels. Every send blocks until the other side receives, so each round
//! trip forces two hand-offs between threads.

use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use tracing::debug;

use super::mean_duration;
use crate::utils::{BenchmarkError, Result};

/// One ping-pong pass
#[derive(Debug, Clone, Copy)]
pub struct PingPongResult {
    pub rounds: u64,
    pub duration: Duration,
}

impl PingPongResult {
    /// Two hand-offs per round trip
    pub fn switches(&self) -> u64 {
        self.rounds * 2
    }

    pub fn per_switch(&self) -> Duration {
        if self.rounds == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos((self.duration.as_nanos() / self.switches() as u128) as u64)
    }
}

/// All passes of the ping-pong benchmark
#[derive(Debug, Clone, Default)]
pub struct PingPongSummary {
    pub passes: Vec<PingPongResult>,
}

impl PingPongSummary {
    pub fn mean_duration(&self) -> Duration {
        mean_duration(&self.passes.iter().map(|p| p.duration).collect::<Vec<_>>())
    }

    pub fn mean_per_switch(&self) -> Duration {
        mean_duration(&self.passes.iter().map(|p| p.per_switch()).collect::<Vec<_>>())
    }
}

/// Run `rounds` round trips between two threads
pub fn run_ping_pong(rounds: u64) -> Result<PingPongResult> {
    let (ping_tx, ping_rx) = channel::bounded::<()>(0);
    let (pong_tx, pong_rx) = channel::bounded::<()>(0);

    let start = Instant::now();
    let (server, client) = thread::scope(|s| {
        let server = thread::Builder::new()
            .name("pong".to_string())
            .spawn_scoped(s, move || serve(ping_rx, pong_tx, rounds))?;
        let client = drive(ping_tx, pong_rx, rounds);
        let server = server
            .join()
            .map_err(|_| BenchmarkError::Worker("ping-pong responder panicked".to_string()))?;
        Ok::<_, BenchmarkError>((server, client))
    })?;
    let duration = start.elapsed();

    if server != rounds || client != rounds {
        return Err(BenchmarkError::Worker(format!(
            "ping-pong stopped early: {} pings answered, {} pongs received of {}",
            server, client, rounds
        )));
    }

    Ok(PingPongResult { rounds, duration })
}

/// Repeat [`run_ping_pong`] and collect every pass
pub fn run_ping_pong_repeated(rounds: u64, repetitions: u32) -> Result<PingPongSummary> {
    let mut summary = PingPongSummary::default();
    for pass in 1..=repetitions {
        let result = run_ping_pong(rounds)?;
        debug!(
            "Ping-pong pass {}: {} rounds in {:?} ({:?} per switch)",
            pass,
            rounds,
            result.duration,
            result.per_switch()
        );
        summary.passes.push(result);
    }
    Ok(summary)
}

fn drive(ping: Sender<()>, pong: Receiver<()>, rounds: u64) -> u64 {
    let mut completed = 0;
    for _ in 0..rounds {
        if ping.send(()).is_err() || pong.recv().is_err() {
            break;
        }
        completed += 1;
    }
    completed
}

fn serve(ping: Receiver<()>, pong: Sender<()>, rounds: u64) -> u64 {
    let mut answered = 0;
    for _ in 0..rounds {
        if ping.recv().is_err() || pong.send(()).is_err() {
            break;
        }
        answered += 1;
    }
    answered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_pong_completes() {
        let result = run_ping_pong(1000).unwrap();
        assert_eq!(result.rounds, 1000);
        assert_eq!(result.switches(), 2000);
        assert!(result.per_switch() <= result.duration);
    }

    #[test]
    fn test_repeated_passes() {
        let summary = run_ping_pong_repeated(100, 3).unwrap();
        assert_eq!(summary.passes.len(), 3);
        assert!(summary.mean_per_switch() <= summary.mean_duration());
    }

    #[test]
    fn test_per_switch_math() {
        let result = PingPongResult {
            rounds: 500,
            duration: Duration::from_millis(1),
        };
        assert_eq!(result.per_switch(), Duration::from_nanos(1000));
        let empty = PingPongResult {
            rounds: 0,
            duration: Duration::ZERO,
        };
        assert_eq!(empty.per_switch(), Duration::ZERO);
    }
}
