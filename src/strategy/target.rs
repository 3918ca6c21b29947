//! The shared-target seam between strategies and workers

use super::counter::{AtomicCounter, MutexCounter, RacyCounter, RwLockCounter};
use super::map::{MutexMap, RwLockMap, ShardedMap, UnguardedMap};
use super::{StrategyKind, WorkloadKind};
use crate::utils::{BenchmarkError, Result};

/// State shared by every worker of one run
///
/// Implementations decide how (and whether) concurrent access is
/// coordinated. Writers call `write`; concurrent readers and the final
/// correctness check call `size`.
pub trait SharedTarget: Send + Sync {
    /// Apply one operation (an increment for counters, an insert for maps)
    fn write(&self, key: u64, value: u64);

    /// Current count (counter value or map entry count)
    fn size(&self) -> u64;
}

/// Build a fresh, empty target for one run
///
/// Fails with a configuration error when the strategy cannot protect the
/// requested workload (`atomic` maps, `lockfree` counters).
pub fn build_target(
    strategy: StrategyKind,
    workload: WorkloadKind,
) -> Result<Box<dyn SharedTarget>> {
    let target: Box<dyn SharedTarget> = match (strategy, workload) {
        (StrategyKind::None, WorkloadKind::Counter) => Box::new(RacyCounter::new()),
        (StrategyKind::None, WorkloadKind::Map) => Box::new(UnguardedMap::new()),
        (StrategyKind::Mutex, WorkloadKind::Counter) => Box::new(MutexCounter::new()),
        (StrategyKind::Mutex, WorkloadKind::Map) => Box::new(MutexMap::new()),
        (StrategyKind::RwMutex, WorkloadKind::Counter) => Box::new(RwLockCounter::new()),
        (StrategyKind::RwMutex, WorkloadKind::Map) => Box::new(RwLockMap::new()),
        (StrategyKind::LockFree, WorkloadKind::Map) => Box::new(ShardedMap::new()),
        (StrategyKind::Atomic, WorkloadKind::Counter) => Box::new(AtomicCounter::new()),
        (StrategyKind::LockFree, WorkloadKind::Counter)
        | (StrategyKind::Atomic, WorkloadKind::Map) => {
            return Err(BenchmarkError::config(format!(
                "strategy '{}' does not support the {} workload",
                strategy, workload
            )));
        }
    };
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_supported_targets() {
        for strategy in StrategyKind::ALL {
            for workload in [WorkloadKind::Counter, WorkloadKind::Map] {
                let built = build_target(strategy, workload);
                assert_eq!(built.is_ok(), strategy.supports(workload));
            }
        }
    }

    #[test]
    fn test_built_targets_start_empty() {
        for strategy in StrategyKind::ALL {
            let target = build_target(strategy, strategy.natural_workload()).unwrap();
            assert_eq!(target.size(), 0);
        }
    }

    #[test]
    fn test_unsupported_pair_is_config_error() {
        let err = build_target(StrategyKind::Atomic, WorkloadKind::Map)
            .err()
            .unwrap();
        assert!(err.is_config());
        assert!(err.to_string().contains("atomic"));
    }
}
