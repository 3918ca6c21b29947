//! Shared map targets
//!
//! Workers insert disjoint keys, so `size()` (the entry count) is the only
//! thing the correctness check looks at.

use std::collections::HashMap;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use super::target::SharedTarget;

/// Panic message raised when two writers meet inside an [`UnguardedMap`]
pub const CONCURRENT_WRITE_FAULT: &str = "concurrent map writes";

/// Panic message raised when a reader meets a writer inside an [`UnguardedMap`]
pub const CONCURRENT_READ_WRITE_FAULT: &str = "concurrent map read and map write";

/// Map with no coordination between workers
///
/// A plain `HashMap` cannot be mutated from several threads in safe Rust, so
/// this target models a container that is *not* mutation-safe: it keeps a
/// writer-in-progress flag (an uncontended `try_lock`) and treats a second
/// thread entering while the flag is held as memory corruption.
///
/// # Panics
///
/// `write` and `size` panic when another thread is inside the map at the
/// same moment. That is the expected failure mode of this strategy; the
/// experiment runner catches it at the join and reports the run as crashed.
#[derive(Debug, Default)]
pub struct UnguardedMap {
    entries: Mutex<HashMap<u64, u64>>,
}

impl UnguardedMap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedTarget for UnguardedMap {
    fn write(&self, key: u64, value: u64) {
        match self.entries.try_lock() {
            Some(mut entries) => {
                entries.insert(key, value);
            }
            None => panic!("{}", CONCURRENT_WRITE_FAULT),
        }
    }

    fn size(&self) -> u64 {
        match self.entries.try_lock() {
            Some(entries) => entries.len() as u64,
            None => panic!("{}", CONCURRENT_READ_WRITE_FAULT),
        }
    }
}

/// Map behind an exclusive lock for both writes and size reads
#[derive(Debug, Default)]
pub struct MutexMap {
    entries: Mutex<HashMap<u64, u64>>,
}

impl MutexMap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedTarget for MutexMap {
    #[inline]
    fn write(&self, key: u64, value: u64) {
        self.entries.lock().insert(key, value);
    }

    fn size(&self) -> u64 {
        self.entries.lock().len() as u64
    }
}

/// Map behind a reader/writer lock
///
/// Inserts hold the write lock for the whole insertion, so a reader under
/// the shared lock sees each key either fully present or absent.
#[derive(Debug, Default)]
pub struct RwLockMap {
    entries: RwLock<HashMap<u64, u64>>,
}

impl RwLockMap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedTarget for RwLockMap {
    #[inline]
    fn write(&self, key: u64, value: u64) {
        self.entries.write().insert(key, value);
    }

    fn size(&self) -> u64 {
        self.entries.read().len() as u64
    }
}

/// Sharded concurrent map
///
/// Keys are hashed onto shards, each with its own lock, so writers to
/// different shards never wait on each other. Every insert is atomic and
/// never lost.
///
/// `size()` walks the shards one after another and counts entries. With
/// writers still running the result is an approximation: shards visited
/// early may have grown by the time the walk ends. After all writers have
/// joined it is exact.
#[derive(Debug, Default)]
pub struct ShardedMap {
    entries: DashMap<u64, u64>,
}

impl ShardedMap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedTarget for ShardedMap {
    #[inline]
    fn write(&self, key: u64, value: u64) {
        self.entries.insert(key, value);
    }

    fn size(&self) -> u64 {
        self.entries.iter().count() as u64
    }
}
