//! Shared counter targets
//!
//! For counters `write(key, value)` is a single increment; key and value
//! are ignored. `size()` returns the current count.

use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use super::target::SharedTarget;

/// Unsynchronized counter
///
/// The increment is a separate load and store, so two workers that load the
/// same value both store `value + 1` and one increment is lost. The cell is
/// atomic only so that the race stays a lost update instead of undefined
/// behavior; no read-modify-write is ever atomic here.
#[derive(Debug, Default)]
pub struct RacyCounter {
    value: AtomicU64,
}

impl RacyCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedTarget for RacyCounter {
    #[inline]
    fn write(&self, _key: u64, _value: u64) {
        let current = self.value.load(Ordering::Relaxed);
        self.value.store(black_box(current) + 1, Ordering::Relaxed);
    }

    fn size(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Counter behind an exclusive lock for both writes and reads
#[derive(Debug, Default)]
pub struct MutexCounter {
    value: Mutex<u64>,
}

impl MutexCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedTarget for MutexCounter {
    #[inline]
    fn write(&self, _key: u64, _value: u64) {
        *self.value.lock() += 1;
    }

    fn size(&self) -> u64 {
        *self.value.lock()
    }
}

/// Counter behind a reader/writer lock
#[derive(Debug, Default)]
pub struct RwLockCounter {
    value: RwLock<u64>,
}

impl RwLockCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedTarget for RwLockCounter {
    #[inline]
    fn write(&self, _key: u64, _value: u64) {
        *self.value.write() += 1;
    }

    fn size(&self) -> u64 {
        *self.value.read()
    }
}

/// Hardware fetch-and-add counter
///
/// Relaxed ordering is enough: only the total matters, and the final read
/// happens after every worker has been joined.
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicU64,
}

impl AtomicCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedTarget for AtomicCounter {
    #[inline]
    fn write(&self, _key: u64, _value: u64) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    fn size(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}
