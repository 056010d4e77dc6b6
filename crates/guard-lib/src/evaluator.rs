//! Threshold evaluation
//!
//! Pure decision logic: given a record and the VM's usage, work out the
//! percentages, the memory action to take and how the record counts.

use crate::models::{RunCounters, ThresholdRecord, UsageSnapshot};

/// Memory allocations are rounded up to this granularity when optimizing
pub const MEMORY_ALIGNMENT_MB: u64 = 128;

/// Memory change chosen for a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryAction {
    /// Usage above threshold; allocation is set to current usage
    Raise { target_mb: u64 },
    /// Usage below threshold with optimize mode on
    Optimize { target_mb: u64 },
}

impl MemoryAction {
    pub fn target_mb(&self) -> u64 {
        match self {
            MemoryAction::Raise { target_mb } | MemoryAction::Optimize { target_mb } => *target_mb,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MemoryAction::Raise { .. } => "Memory increased",
            MemoryAction::Optimize { .. } => "Memory optimized",
        }
    }
}

impl std::fmt::Display for MemoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryAction::Raise { .. } => write!(f, "raise"),
            MemoryAction::Optimize { .. } => write!(f, "optimize"),
        }
    }
}

/// Outcome of evaluating one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub record: ThresholdRecord,
    pub usage: UsageSnapshot,
    pub memory_percent: u64,
    pub storage_percent: u64,
    pub action: Option<MemoryAction>,
    pub memory_exceeded: bool,
    pub storage_exceeded: bool,
    pub healthy: bool,
}

impl Evaluation {
    /// Counter delta contributed by this record
    pub fn counters(&self) -> RunCounters {
        RunCounters {
            total_items: 1,
            healthy_items: u64::from(self.healthy),
            memory_exceeded: u64::from(self.memory_exceeded),
            storage_exceeded: u64::from(self.storage_exceeded),
            api_errors: 0,
        }
    }
}

/// `floor(current * 100 / total)`, or 0 when total is 0
pub fn memory_percent(current_mb: u64, total_mb: u64) -> u64 {
    if total_mb > 0 {
        narrow(u128::from(current_mb) * 100 / u128::from(total_mb))
    } else {
        0
    }
}

/// Storage usage percent.
///
/// No capacity figure is queried; total storage is taken to be the current
/// usage, so the result is always 0 or 100.
pub fn storage_percent(current_mb: u64) -> u64 {
    let total_mb = current_mb;
    if total_mb > 0 {
        narrow(u128::from(current_mb) * 100 / u128::from(total_mb))
    } else {
        0
    }
}

/// 90% of current usage rounded up, then aligned up to [`MEMORY_ALIGNMENT_MB`]
pub fn optimized_target(current_mb: u64) -> u64 {
    let alignment = u128::from(MEMORY_ALIGNMENT_MB);
    let raw = (u128::from(current_mb) * 9).div_ceil(10);
    narrow(raw.div_ceil(alignment) * alignment)
}

/// Arithmetic runs in `u128` so absurd API values cannot overflow
fn narrow(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

pub fn evaluate(record: ThresholdRecord, usage: UsageSnapshot, optimize: bool) -> Evaluation {
    let memory_threshold = u64::from(record.memory_threshold_percent);
    let storage_threshold = u64::from(record.storage_threshold_percent);

    let memory_percent = memory_percent(usage.current_memory_mb, usage.total_memory_mb);
    let storage_percent = storage_percent(usage.current_storage_mb);

    let memory_exceeded = memory_percent > memory_threshold;
    let action = if memory_exceeded {
        // Target equals current usage, not usage plus headroom.
        Some(MemoryAction::Raise {
            target_mb: usage.current_memory_mb,
        })
    } else if optimize && memory_percent < memory_threshold {
        Some(MemoryAction::Optimize {
            target_mb: optimized_target(usage.current_memory_mb),
        })
    } else {
        None
    };

    let storage_exceeded = storage_percent > storage_threshold;

    Evaluation {
        record,
        usage,
        memory_percent,
        storage_percent,
        action,
        memory_exceeded,
        storage_exceeded,
        healthy: !memory_exceeded && !storage_exceeded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(memory: u32, storage: u32) -> ThresholdRecord {
        ThresholdRecord {
            vm_id: 101,
            memory_threshold_percent: memory,
            storage_threshold_percent: storage,
        }
    }

    fn usage(current: u64, total: u64, storage: u64) -> UsageSnapshot {
        UsageSnapshot {
            current_memory_mb: current,
            total_memory_mb: total,
            current_storage_mb: storage,
        }
    }

    #[test]
    fn test_memory_percent_truncates() {
        assert_eq!(memory_percent(781, 976), 80);
        assert_eq!(memory_percent(999, 1000), 99);
        assert_eq!(memory_percent(1, 3), 33);
        assert_eq!(memory_percent(500, 0), 0);
        assert_eq!(memory_percent(0, 1000), 0);
    }

    #[test]
    fn test_storage_percent_is_all_or_nothing() {
        assert_eq!(storage_percent(0), 0);
        assert_eq!(storage_percent(1), 100);
        assert_eq!(storage_percent(878), 100);
    }

    #[test]
    fn test_optimized_target_rounding() {
        assert_eq!(optimized_target(1000), 896);
        assert_eq!(optimized_target(500), 512);
        assert_eq!(optimized_target(1), 128);
        assert_eq!(optimized_target(0), 0);
        // 90% of 1423 is 1280.7, rounds to 1281, aligns to 1408
        assert_eq!(optimized_target(1423), 1408);
    }

    #[test]
    fn test_huge_values_do_not_overflow() {
        assert_eq!(memory_percent(u64::MAX, u64::MAX), 100);
        assert_eq!(memory_percent(u64::MAX, 1), u64::MAX);
        assert_eq!(storage_percent(u64::MAX), 100);
        assert_eq!(optimized_target(u64::MAX), 16_602_069_666_338_596_480);

        let eval = evaluate(record(80, 90), usage(u64::MAX, u64::MAX / 2, u64::MAX), false);
        assert_eq!(eval.memory_percent, 200);
        assert!(eval.memory_exceeded);
    }

    #[test]
    fn test_at_threshold_is_not_exceeded() {
        let eval = evaluate(record(80, 90), usage(781, 976, 878), false);

        assert_eq!(eval.memory_percent, 80);
        assert_eq!(eval.storage_percent, 100);
        assert_eq!(eval.action, None);
        assert!(!eval.memory_exceeded);
        assert!(eval.storage_exceeded);
        assert!(!eval.healthy);
        assert_eq!(
            eval.counters(),
            RunCounters {
                total_items: 1,
                storage_exceeded: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_raise_sets_current_usage() {
        let eval = evaluate(record(50, 100), usage(900, 1000, 10), true);

        assert_eq!(eval.memory_percent, 90);
        assert_eq!(eval.action, Some(MemoryAction::Raise { target_mb: 900 }));
        assert_eq!(eval.action.unwrap().label(), "Memory increased");
        assert!(eval.memory_exceeded);
        assert!(!eval.storage_exceeded);
        assert!(!eval.healthy);
    }

    #[test]
    fn test_optimize_only_when_enabled_and_below() {
        let below = usage(1000, 2000, 0);

        let eval = evaluate(record(90, 90), below, true);
        assert_eq!(eval.memory_percent, 50);
        assert_eq!(eval.action, Some(MemoryAction::Optimize { target_mb: 896 }));
        assert_eq!(eval.action.unwrap().label(), "Memory optimized");
        assert!(eval.healthy);

        let half = evaluate(record(90, 90), usage(500, 1000, 0), true);
        assert_eq!(half.memory_percent, 50);
        assert_eq!(half.action, Some(MemoryAction::Optimize { target_mb: 512 }));

        assert_eq!(evaluate(record(90, 90), below, false).action, None);
        // equal to threshold: neither raise nor optimize
        assert_eq!(evaluate(record(50, 90), below, true).action, None);
    }

    #[test]
    fn test_healthy_requires_both_within_threshold() {
        let eval = evaluate(record(80, 100), usage(100, 1000, 500), false);
        assert!(eval.healthy);
        assert_eq!(eval.counters().healthy_items, 1);

        let eval = evaluate(record(5, 100), usage(100, 1000, 500), false);
        assert!(!eval.healthy);
        assert_eq!(eval.counters().memory_exceeded, 1);
    }
}
