//! Host statistics read from the /proc filesystem.
//!
//! [`ProcfsHost`] is the production [`HostStats`] implementation. CPU usage is
//! derived from two `/proc/stat` snapshots taken one measurement window apart,
//! memory from `/proc/meminfo` and disk usage from `statvfs(3)`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::collectors::filesystem::read_statvfs;
use crate::sampler::{DiskUsage, HostStats, MemoryUsage, SampleError};

/// Default procfs mount point.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// CPU time counters of a single core, in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    /// Calculate total CPU time (all fields).
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Calculate non-active time (idle + iowait).
    pub fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }
}

/// Memory counters from /proc/meminfo, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemInfo {
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub buffers_bytes: u64,
    pub cached_bytes: u64,
    pub sreclaimable_bytes: u64,
}

impl MemInfo {
    /// Used memory as `total - free - buffers - cached`, where cached includes
    /// reclaimable slab. Falls back to `total - free` when the kernel reports
    /// caches larger than the non-free remainder.
    pub fn used_bytes(&self) -> u64 {
        let cache = self.buffers_bytes + self.cached_bytes + self.sreclaimable_bytes;
        let non_free = self.total_bytes.saturating_sub(self.free_bytes);
        match non_free.checked_sub(cache) {
            Some(used) => used,
            None => non_free,
        }
    }
}

/// Per-core counters keyed by core number.
pub type CoreStats = BTreeMap<usize, CpuStat>;

/// Parses per-core CPU counters from /proc/stat content.
///
/// The aggregate `cpu` line is skipped. Offline cores are absent from
/// /proc/stat, so the keys may have gaps.
pub fn parse_cpu_stats(content: &str) -> Result<CoreStats, SampleError> {
    let mut cores = CoreStats::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(index) = parts
            .first()
            .and_then(|name| name.strip_prefix("cpu"))
            .filter(|suffix| !suffix.is_empty())
        else {
            continue;
        };
        let Ok(index) = index.parse::<usize>() else {
            continue;
        };
        if parts.len() < 8 {
            continue;
        }

        let field = |i: usize| parts.get(i).and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);

        cores.insert(
            index,
            CpuStat {
                user: field(1),
                nice: field(2),
                system: field(3),
                idle: field(4),
                iowait: field(5),
                irq: field(6),
                softirq: field(7),
                steal: field(8),
            },
        );
    }

    if cores.is_empty() {
        return Err(SampleError::Parse {
            path: "/proc/stat".to_string(),
            reason: "no per-core cpu lines found".to_string(),
        });
    }

    Ok(cores)
}

/// Number of core slots covered by `cores` (highest core number + 1).
pub fn core_slots(cores: &CoreStats) -> usize {
    cores.keys().next_back().map_or(0, |last| last + 1)
}

/// Busy percentage per core between two snapshots.
///
/// Snapshots are joined on core number and the result is indexed by it,
/// covering every slot up to the highest core in `after`. A core missing
/// from either snapshot, or whose counters did not advance, reports 0.0.
pub fn cpu_percentages(before: &CoreStats, after: &CoreStats) -> Vec<f64> {
    (0..core_slots(after))
        .map(|core| match (before.get(&core), after.get(&core)) {
            (Some(previous), Some(current)) => busy_percent(previous, current),
            _ => 0.0,
        })
        .collect()
}

fn busy_percent(previous: &CpuStat, current: &CpuStat) -> f64 {
    let delta_total = current.total().saturating_sub(previous.total());
    let delta_idle = current.idle_total().saturating_sub(previous.idle_total());
    if delta_total == 0 {
        return 0.0;
    }
    let busy = delta_total.saturating_sub(delta_idle);
    busy as f64 / delta_total as f64 * 100.0
}
