//! Buffered vs unbuffered writes
//!
//! The sink is anything implementing `Write` (the `write(bytes)` / `flush()`
//! capability pair). A [`CountingWriter`] between the writer under test and
//! the sink counts how many `write` calls actually reach the sink, which is
//! what buffering saves.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::mean_duration;
use crate::utils::Result;

/// Line written on every iteration
pub const DEFAULT_LINE: &str = "The ghosts are writing their stories...\n";

/// Counts calls and bytes that reach the wrapped sink
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    writes: u64,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            writes: 0,
            bytes: 0,
        }
    }

    /// `write` calls that reached the sink
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Bytes that reached the sink
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.writes += 1;
        self.bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Measurements of one write pass
#[derive(Debug, Clone, Copy)]
pub struct WriteStats {
    pub duration: Duration,
    /// Bytes that reached the sink
    pub bytes: u64,
    /// `write` calls that reached the sink
    pub sink_writes: u64,
}

/// Write `lines` copies of `content`, one sink write per line
pub fn write_unbuffered<W: Write>(sink: W, lines: u64, content: &str) -> io::Result<WriteStats> {
    let mut sink = CountingWriter::new(sink);
    let start = Instant::now();
    for _ in 0..lines {
        sink.write_all(content.as_bytes())?;
    }
    sink.flush()?;
    Ok(WriteStats {
        duration: start.elapsed(),
        bytes: sink.bytes(),
        sink_writes: sink.writes(),
    })
}

/// Write `lines` copies of `content` through a `BufWriter`, flushing once
pub fn write_buffered<W: Write>(sink: W, lines: u64, content: &str) -> io::Result<WriteStats> {
    let mut writer = BufWriter::new(CountingWriter::new(sink));
    let start = Instant::now();
    for _ in 0..lines {
        writer.write_all(content.as_bytes())?;
    }
    writer.flush()?;
    let duration = start.elapsed();

    let sink = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(WriteStats {
        duration,
        bytes: sink.bytes(),
        sink_writes: sink.writes(),
    })
}

/// All passes of the I/O benchmark
#[derive(Debug, Clone, Default)]
pub struct IoBenchResult {
    pub lines: u64,
    pub unbuffered: Vec<WriteStats>,
    pub buffered: Vec<WriteStats>,
}

impl IoBenchResult {
    pub fn mean_unbuffered(&self) -> Duration {
        mean_duration(&self.unbuffered.iter().map(|s| s.duration).collect::<Vec<_>>())
    }

    pub fn mean_buffered(&self) -> Duration {
        mean_duration(&self.buffered.iter().map(|s| s.duration).collect::<Vec<_>>())
    }

    /// How many times faster buffered writes were on average
    pub fn speedup(&self) -> Option<f64> {
        let buffered = self.mean_buffered().as_secs_f64();
        if buffered > 0.0 {
            Some(self.mean_unbuffered().as_secs_f64() / buffered)
        } else {
            None
        }
    }
}

/// Alternate unbuffered and buffered passes against files in `dir`
///
/// Each pass writes a fresh file that is removed as soon as the pass ends.
pub fn run_io_bench(dir: &Path, lines: u64, repetitions: u32) -> Result<IoBenchResult> {
    let unbuffered_path = dir.join("syncbench-unbuffered.txt");
    let buffered_path = dir.join("syncbench-buffered.txt");
    let mut result = IoBenchResult {
        lines,
        ..Default::default()
    };

    for round in 1..=repetitions {
        let stats = write_unbuffered(File::create(&unbuffered_path)?, lines, DEFAULT_LINE);
        fs::remove_file(&unbuffered_path)?;
        let unbuffered = stats?;

        let stats = write_buffered(File::create(&buffered_path)?, lines, DEFAULT_LINE);
        fs::remove_file(&buffered_path)?;
        let buffered = stats?;

        debug!(
            "I/O round {}: unbuffered {:?} ({} writes), buffered {:?} ({} writes)",
            round, unbuffered.duration, unbuffered.sink_writes, buffered.duration, buffered.sink_writes
        );
        result.unbuffered.push(unbuffered);
        result.buffered.push(buffered);
    }

    if let Some(speedup) = result.speedup() {
        info!("Buffered writes {:.2}x faster than unbuffered", speedup);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbuffered_one_write_per_line() {
        let mut sink = Vec::new();
        let stats = write_unbuffered(&mut sink, 100, "abc\n").unwrap();
        assert_eq!(stats.sink_writes, 100);
        assert_eq!(stats.bytes, 400);
        assert_eq!(sink.len(), 400);
    }

    #[test]
    fn test_buffered_batches_writes() {
        let mut sink = Vec::new();
        let stats = write_buffered(&mut sink, 10_000, DEFAULT_LINE).unwrap();
        let total = 10_000 * DEFAULT_LINE.len() as u64;
        assert_eq!(stats.bytes, total);
        assert_eq!(sink.len() as u64, total);
        // Default BufWriter capacity is 8 KiB
        assert!(stats.sink_writes < 10_000 / 10);
    }

    #[test]
    fn test_counting_writer() {
        let mut writer = CountingWriter::new(Vec::new());
        writer.write_all(b"hello").unwrap();
        writer.write_all(b" world").unwrap();
        assert_eq!(writer.writes(), 2);
        assert_eq!(writer.bytes(), 11);
        assert_eq!(writer.into_inner(), b"hello world");
    }

    #[test]
    fn test_run_io_bench_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_io_bench(dir.path(), 500, 2).unwrap();

        assert_eq!(result.unbuffered.len(), 2);
        assert_eq!(result.buffered.len(), 2);
        assert!(result.unbuffered.iter().all(|s| s.sink_writes == 500));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_speedup_without_samples() {
        assert_eq!(IoBenchResult::default().speedup(), None);
    }
}
