//! Core data models for the guard

use serde::Deserialize;

/// One input row binding a VM to its memory and storage alert percentages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdRecord {
    pub vm_id: u32,
    pub memory_threshold_percent: u32,
    pub storage_threshold_percent: u32,
}

/// Current status of a VM as reported by `status/current`
///
/// Wire values are KiB; the `*_mb` accessors truncate to MB.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VmStatus {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mem: u64,
    #[serde(default)]
    pub maxmem: u64,
    #[serde(default)]
    pub disk: u64,
}

impl VmStatus {
    pub fn memory_mb(&self) -> u64 {
        self.mem / 1024
    }

    pub fn max_memory_mb(&self) -> u64 {
        self.maxmem / 1024
    }

    pub fn disk_mb(&self) -> u64 {
        self.disk / 1024
    }

    /// `(current, total)` memory in MB
    pub fn memory_info(&self) -> (u64, u64) {
        (self.memory_mb(), self.max_memory_mb())
    }

    pub fn current_storage_mb(&self) -> u64 {
        self.disk_mb()
    }

    pub fn display_name(&self) -> &str {
        &self.name
    }

    pub fn usage(&self) -> UsageSnapshot {
        UsageSnapshot {
            current_memory_mb: self.memory_mb(),
            total_memory_mb: self.max_memory_mb(),
            current_storage_mb: self.disk_mb(),
        }
    }
}

/// Usage figures derived from a single status fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub current_memory_mb: u64,
    pub total_memory_mb: u64,
    pub current_storage_mb: u64,
}

/// Run-level counters, folded from per-record results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub total_items: u64,
    pub healthy_items: u64,
    pub memory_exceeded: u64,
    pub storage_exceeded: u64,
    /// Records whose status could not be fetched
    pub api_errors: u64,
}

impl RunCounters {
    pub fn merge(self, other: RunCounters) -> RunCounters {
        RunCounters {
            total_items: self.total_items + other.total_items,
            healthy_items: self.healthy_items + other.healthy_items,
            memory_exceeded: self.memory_exceeded + other.memory_exceeded,
            storage_exceeded: self.storage_exceeded + other.storage_exceeded,
            api_errors: self.api_errors + other.api_errors,
        }
    }

    /// Counter delta for a line that failed validation
    pub fn malformed() -> RunCounters {
        RunCounters {
            total_items: 1,
            ..Default::default()
        }
    }

    /// Counter delta for a record whose status fetch failed
    pub fn api_error() -> RunCounters {
        RunCounters {
            total_items: 1,
            api_errors: 1,
            ..Default::default()
        }
    }
}
