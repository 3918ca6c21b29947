//! Workload generator
//!
//! Fans out one OS thread per worker (plus optional reader threads), holds
//! them at a start gate until every thread exists, then releases them
//! together and joins them all. The shared target is borrowed for the
//! duration of the fan-out only; nothing outlives the scope.
//!
//! Worker `w` writes keys `w * ops_per_worker .. (w + 1) * ops_per_worker`,
//! so no two workers ever touch the same key.

use std::any::Any;
use std::ops::Range;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::strategy::SharedTarget;
use crate::utils::Result;

/// Shape of one run's concurrent load
#[derive(Debug, Clone)]
pub struct WorkloadSpec {
    /// Number of writer threads
    pub workers: u64,
    /// Writes performed by each writer
    pub ops_per_worker: u64,
    /// Number of concurrent reader threads (0 = write-only)
    pub readers: u64,
    /// `size()` calls performed by each reader
    pub reads_per_reader: u64,
    /// Pause between two reads of the same reader
    pub reader_pause: Duration,
}

impl WorkloadSpec {
    /// Write-only workload
    pub fn writers(workers: u64, ops_per_worker: u64) -> Self {
        Self {
            workers,
            ops_per_worker,
            readers: 0,
            reads_per_reader: 0,
            reader_pause: Duration::ZERO,
        }
    }

    /// Add concurrent readers
    pub fn with_readers(mut self, readers: u64, reads_per_reader: u64, pause: Duration) -> Self {
        self.readers = readers;
        self.reads_per_reader = reads_per_reader;
        self.reader_pause = pause;
        self
    }

    /// Total writes across all workers (the expected final count)
    pub fn total_ops(&self) -> u64 {
        self.workers * self.ops_per_worker
    }
}

/// Keys owned by one worker
#[inline]
pub fn key_range(worker_id: u64, ops_per_worker: u64) -> Range<u64> {
    let start = worker_id * ops_per_worker;
    start..start + ops_per_worker
}

/// Result from a writer thread
#[derive(Debug, Clone)]
pub struct WorkerResult {
    pub worker_id: u64,
    /// Writes issued
    pub ops: u64,
    /// Time from gate release to the last write
    pub elapsed: Duration,
}

/// Result from a reader thread
#[derive(Debug, Clone, Default)]
pub struct ReaderResult {
    pub reader_id: u64,
    /// `size()` calls issued
    pub reads: u64,
    /// Reads that returned less than the previous read of the same reader
    pub regressions: u64,
    /// Last size observed
    pub last_size: u64,
}

/// A thread that panicked instead of finishing
#[derive(Debug, Clone)]
pub struct WorkerFault {
    pub thread_name: String,
    pub message: String,
}

/// Everything the fan-out produced
#[derive(Debug, Default)]
pub struct WorkloadReport {
    pub workers: Vec<WorkerResult>,
    pub readers: Vec<ReaderResult>,
    pub faults: Vec<WorkerFault>,
    /// Gate release to last join
    pub elapsed: Duration,
}

impl WorkloadReport {
    pub fn has_faults(&self) -> bool {
        !self.faults.is_empty()
    }

    pub fn total_reads(&self) -> u64 {
        self.readers.iter().map(|r| r.reads).sum()
    }

    pub fn total_regressions(&self) -> u64 {
        self.readers.iter().map(|r| r.regressions).sum()
    }
}

/// One-shot gate every spawned thread waits on before its first operation
struct StartGate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl StartGate {
    fn new() -> Self {
        Self {
            open: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cond.wait(&mut open);
        }
    }

    fn open(&self) {
        *self.open.lock() = true;
        self.cond.notify_all();
    }
}

/// Run the workload against `target` and join every thread
///
/// Thread panics are collected as [`WorkerFault`]s rather than re-raised.
/// The only error is a failure to spawn a thread, in which case the threads
/// that did start are released and joined before the error is returned.
pub fn run_workload(target: &dyn SharedTarget, spec: &WorkloadSpec) -> Result<WorkloadReport> {
    let gate = StartGate::new();

    thread::scope(|s| {
        let gate = &gate;
        let mut writers = Vec::with_capacity(spec.workers as usize);
        let mut readers = Vec::with_capacity(spec.readers as usize);
        let mut spawn_error = None;

        for worker_id in 0..spec.workers {
            let ops_per_worker = spec.ops_per_worker;
            let spawned = thread::Builder::new()
                .name(format!("worker-{}", worker_id))
                .spawn_scoped(s, move || {
                    gate.wait();
                    run_writer(target, worker_id, ops_per_worker)
                });
            match spawned {
                Ok(handle) => writers.push(handle),
                Err(e) => {
                    spawn_error = Some(e);
                    break;
                }
            }
        }

        if spawn_error.is_none() {
            for reader_id in 0..spec.readers {
                let reads = spec.reads_per_reader;
                let pause = spec.reader_pause;
                let spawned = thread::Builder::new()
                    .name(format!("reader-{}", reader_id))
                    .spawn_scoped(s, move || {
                        gate.wait();
                        run_reader(target, reader_id, reads, pause)
                    });
                match spawned {
                    Ok(handle) => readers.push(handle),
                    Err(e) => {
                        spawn_error = Some(e);
                        break;
                    }
                }
            }
        }

        debug!(
            "Releasing {} writers and {} readers",
            writers.len(),
            readers.len()
        );
        let start = Instant::now();
        gate.open();

        let mut report = WorkloadReport::default();
        for handle in writers {
            let thread_name = thread_name(handle.thread());
            match handle.join() {
                Ok(result) => report.workers.push(result),
                Err(payload) => report.faults.push(WorkerFault {
                    thread_name,
                    message: panic_message(&*payload),
                }),
            }
        }
        for handle in readers {
            let thread_name = thread_name(handle.thread());
            match handle.join() {
                Ok(result) => report.readers.push(result),
                Err(payload) => report.faults.push(WorkerFault {
                    thread_name,
                    message: panic_message(&*payload),
                }),
            }
        }
        report.elapsed = start.elapsed();

        match spawn_error {
            Some(e) => Err(e.into()),
            None => Ok(report),
        }
    })
}

fn run_writer(target: &dyn SharedTarget, worker_id: u64, ops_per_worker: u64) -> WorkerResult {
    let start = Instant::now();
    let keys = key_range(worker_id, ops_per_worker);
    let first = keys.start;
    for key in keys {
        target.write(key, key - first);
    }
    WorkerResult {
        worker_id,
        ops: ops_per_worker,
        elapsed: start.elapsed(),
    }
}

fn run_reader(target: &dyn SharedTarget, reader_id: u64, reads: u64, pause: Duration) -> ReaderResult {
    let mut result = ReaderResult {
        reader_id,
        ..Default::default()
    };
    for _ in 0..reads {
        let size = target.size();
        if size < result.last_size {
            result.regressions += 1;
        }
        result.last_size = size;
        result.reads += 1;
        if !pause.is_zero() {
            thread::sleep(pause);
        }
    }
    result
}

fn thread_name(thread: &thread::Thread) -> String {
    thread.name().unwrap_or("unnamed").to_string()
}

/// Extract the message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{AtomicCounter, MutexMap, RwLockMap, UnguardedMap};
    use proptest::prelude::*;

    #[test]
    fn test_key_range() {
        assert_eq!(key_range(0, 1000), 0..1000);
        assert_eq!(key_range(3, 1000), 3000..4000);
        assert_eq!(key_range(2, 1), 2..3);
    }

    proptest! {
        #[test]
        fn test_key_ranges_never_intersect(
            a in 0u64..10_000,
            b in 0u64..10_000,
            ops in 1u64..100_000,
        ) {
            prop_assume!(a != b);
            let ra = key_range(a, ops);
            let rb = key_range(b, ops);
            prop_assert!(ra.end <= rb.start || rb.end <= ra.start);
            prop_assert_eq!(ra.end - ra.start, ops);
        }
    }

    #[test]
    fn test_writers_cover_every_key() {
        let map = MutexMap::new();
        let spec = WorkloadSpec::writers(10, 100);
        let report = run_workload(&map, &spec).unwrap();

        assert_eq!(report.workers.len(), 10);
        assert!(!report.has_faults());
        assert_eq!(map.size(), spec.total_ops());
        assert!(report.workers.iter().all(|w| w.ops == 100));
    }

    #[test]
    fn test_join_before_return() {
        let counter = AtomicCounter::new();
        let spec = WorkloadSpec::writers(16, 250);
        run_workload(&counter, &spec).unwrap();
        // Every worker has finished by the time run_workload returns
        assert_eq!(counter.size(), 4000);
    }

    #[test]
    fn test_readers_see_monotonic_size() {
        let map = RwLockMap::new();
        let spec = WorkloadSpec::writers(8, 2000).with_readers(4, 200, Duration::ZERO);
        let report = run_workload(&map, &spec).unwrap();

        assert_eq!(report.readers.len(), 4);
        assert_eq!(report.total_reads(), 800);
        assert_eq!(report.total_regressions(), 0);
        assert!(report.readers.iter().all(|r| r.last_size <= 16000));
    }

    #[test]
    fn test_panics_become_faults() {
        struct Exploding;
        impl SharedTarget for Exploding {
            fn write(&self, _key: u64, _value: u64) {
                panic!("boom");
            }
            fn size(&self) -> u64 {
                0
            }
        }

        let report = run_workload(&Exploding, &WorkloadSpec::writers(3, 1)).unwrap();
        assert_eq!(report.faults.len(), 3);
        assert!(report.workers.is_empty());
        assert_eq!(report.faults[0].message, "boom");
        assert!(report.faults[0].thread_name.starts_with("worker-"));
    }

    #[test]
    fn test_unguarded_map_single_worker_is_fine() {
        let map = UnguardedMap::new();
        let report = run_workload(&map, &WorkloadSpec::writers(1, 500)).unwrap();
        assert!(!report.has_faults());
        assert_eq!(map.size(), 500);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(&*payload), "static str");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*payload), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(&*payload), "unknown panic");
    }
}
