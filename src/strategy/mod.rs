//! Synchronization strategies
//!
//! A strategy is the policy that protects one shared target (a counter or a
//! map) from concurrent workers. Each (strategy, workload) pair maps to one
//! [`SharedTarget`] implementation:
//!
//! - `none`: no coordination. Counters lose updates; maps detect a second
//!   concurrent writer and fault.
//! - `mutex`: exclusive lock around every write and every size read.
//! - `rwmutex`: exclusive lock for writes, shared lock for size reads.
//! - `lockfree`: sharded map; size is an iteration count.
//! - `atomic`: hardware fetch-and-add counter.

pub mod counter;
pub mod map;
pub mod target;

use clap::ValueEnum;
use serde::Serialize;

pub use counter::{AtomicCounter, MutexCounter, RacyCounter, RwLockCounter};
pub use map::{MutexMap, RwLockMap, ShardedMap, UnguardedMap};
pub use target::{build_target, SharedTarget};

/// Selectable synchronization strategy
#[derive(ValueEnum, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// No synchronization at all
    None,
    /// Exclusive lock around every access
    Mutex,
    /// Exclusive writers, shared readers
    #[value(name = "rwmutex")]
    RwMutex,
    /// Sharded map with per-shard locking
    #[value(name = "lockfree")]
    LockFree,
    /// Single atomic fetch-and-add
    Atomic,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::None,
        StrategyKind::Mutex,
        StrategyKind::RwMutex,
        StrategyKind::LockFree,
        StrategyKind::Atomic,
    ];

    /// Get display name (same spelling as the CLI selector)
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::None => "none",
            StrategyKind::Mutex => "mutex",
            StrategyKind::RwMutex => "rwmutex",
            StrategyKind::LockFree => "lockfree",
            StrategyKind::Atomic => "atomic",
        }
    }

    /// Workload used when none is requested explicitly
    pub fn natural_workload(&self) -> WorkloadKind {
        match self {
            StrategyKind::None | StrategyKind::Atomic => WorkloadKind::Counter,
            StrategyKind::Mutex | StrategyKind::RwMutex | StrategyKind::LockFree => {
                WorkloadKind::Map
            }
        }
    }

    /// Check whether this strategy can protect the given workload
    pub fn supports(&self, workload: WorkloadKind) -> bool {
        !matches!(
            (self, workload),
            (StrategyKind::Atomic, WorkloadKind::Map)
                | (StrategyKind::LockFree, WorkloadKind::Counter)
        )
    }

    /// What happens when workers write concurrently under this strategy
    pub fn safety(&self, workload: WorkloadKind) -> SafetyClass {
        match (self, workload) {
            (StrategyKind::None, WorkloadKind::Counter) => SafetyClass::RacyButSafe,
            (StrategyKind::None, WorkloadKind::Map) => SafetyClass::Unsafe,
            _ => SafetyClass::Safe,
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shape of the shared target
#[derive(ValueEnum, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadKind {
    /// Every operation increments one shared integer
    Counter,
    /// Every operation inserts one unique key into a shared map
    Map,
}

impl WorkloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Counter => "counter",
            WorkloadKind::Map => "map",
        }
    }
}

impl std::fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Correctness claim a strategy makes under concurrent writers
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SafetyClass {
    /// Every write lands; the final count is exact
    Safe,
    /// Writes may be lost silently, the target itself stays intact
    RacyButSafe,
    /// Concurrent writers may corrupt the target; the run can fault
    Unsafe,
}

impl SafetyClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyClass::Safe => "safe",
            SafetyClass::RacyButSafe => "racy",
            SafetyClass::Unsafe => "unsafe",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strategy() {
        assert_eq!(
            StrategyKind::from_str("rwmutex", true),
            Ok(StrategyKind::RwMutex)
        );
        assert_eq!(
            StrategyKind::from_str("LOCKFREE", true),
            Ok(StrategyKind::LockFree)
        );
        assert!(StrategyKind::from_str("spinlock", true).is_err());
    }

    #[test]
    fn test_natural_workload() {
        assert_eq!(StrategyKind::None.natural_workload(), WorkloadKind::Counter);
        assert_eq!(StrategyKind::Atomic.natural_workload(), WorkloadKind::Counter);
        assert_eq!(StrategyKind::Mutex.natural_workload(), WorkloadKind::Map);
        assert_eq!(StrategyKind::LockFree.natural_workload(), WorkloadKind::Map);
    }

    #[test]
    fn test_natural_workload_is_supported() {
        for strategy in StrategyKind::ALL {
            assert!(strategy.supports(strategy.natural_workload()));
        }
    }

    #[test]
    fn test_unsupported_pairs() {
        assert!(!StrategyKind::Atomic.supports(WorkloadKind::Map));
        assert!(!StrategyKind::LockFree.supports(WorkloadKind::Counter));
        assert!(StrategyKind::Mutex.supports(WorkloadKind::Counter));
        assert!(StrategyKind::None.supports(WorkloadKind::Map));
    }

    #[test]
    fn test_safety_classes() {
        assert_eq!(
            StrategyKind::None.safety(WorkloadKind::Counter),
            SafetyClass::RacyButSafe
        );
        assert_eq!(
            StrategyKind::None.safety(WorkloadKind::Map),
            SafetyClass::Unsafe
        );
        assert_eq!(
            StrategyKind::RwMutex.safety(WorkloadKind::Map),
            SafetyClass::Safe
        );
    }

    #[test]
    fn test_display_matches_selector() {
        for strategy in StrategyKind::ALL {
            let parsed = StrategyKind::from_str(&strategy.to_string(), false);
            assert_eq!(parsed, Ok(strategy));
        }
    }
}
