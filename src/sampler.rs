//! Host sampling for the collection loop.
//!
//! A [`Sampler`] runs one round of OS queries through a [`HostStats`]
//! implementation and normalizes the answers into catalog samples. Each
//! subsystem (CPU, memory, disk) is queried independently: a failing query
//! only drops its own samples and is reported back as a [`SampleWarning`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::{MetricName, MetricSample};

/// Physical memory usage in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

/// Filesystem usage in bytes for a single mount point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

/// Errors raised while querying the host.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("{0}")]
    Unavailable(String),
}

/// Source of raw host statistics.
///
/// The exporter uses [`crate::system::ProcfsHost`]; tests plug in fakes.
pub trait HostStats: Send + Sync {
    /// Number of logical CPU cores.
    fn core_count(&self) -> Result<usize, SampleError>;

    /// Busy percentage of every logical core over `window`, ordered by core
    /// index. Blocks the caller for the duration of the window.
    fn cpu_percent_per_core(&self, window: Duration) -> Result<Vec<f64>, SampleError>;

    /// Total and used physical memory.
    fn memory(&self) -> Result<MemoryUsage, SampleError>;

    /// Total and used bytes of the filesystem mounted at `mount`.
    fn disk_usage(&self, mount: &Path) -> Result<DiskUsage, SampleError>;
}

/// Host subsystem a sample group comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Cpu,
    Memory,
    Disk,
}

impl Subsystem {
    pub fn as_str(self) -> &'static str {
        match self {
            Subsystem::Cpu => "cpu",
            Subsystem::Memory => "memory",
            Subsystem::Disk => "disk",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fatal failure of one subsystem query during a pass.
#[derive(Debug)]
pub struct SampleWarning {
    pub subsystem: Subsystem,
    pub error: SampleError,
}

/// Result of one sampling pass.
#[derive(Debug, Default)]
pub struct SampleBatch {
    pub samples: Vec<MetricSample>,
    pub warnings: Vec<SampleWarning>,
}

impl SampleBatch {
    /// True if the given subsystem failed during this pass.
    pub fn failed(&self, subsystem: Subsystem) -> bool {
        self.warnings.iter().any(|w| w.subsystem == subsystem)
    }
}

/// Queries the host and shapes the answers into catalog samples.
pub struct Sampler {
    host: Arc<dyn HostStats>,
    mount_path: PathBuf,
    cpu_window: Duration,
}

impl Sampler {
    pub fn new(
        host: Arc<dyn HostStats>,
        mount_path: impl Into<PathBuf>,
        cpu_window: Duration,
    ) -> Self {
        Self {
            host,
            mount_path: mount_path.into(),
            cpu_window,
        }
    }

    pub fn host(&self) -> &dyn HostStats {
        self.host.as_ref()
    }

    pub fn mount_path(&self) -> &Path {
        &self.mount_path
    }

    pub fn cpu_window(&self) -> Duration {
        self.cpu_window
    }

    /// Runs one sampling pass. Blocks for the CPU measurement window.
    pub fn sample(&self) -> SampleBatch {
        let mut batch = SampleBatch::default();

        match self.host.cpu_percent_per_core(self.cpu_window) {
            Ok(per_core) => {
                batch.samples.extend(per_core.into_iter().enumerate().map(|(core, percent)| {
                    MetricSample::cpu_core(core, normalize_percent(percent))
                }));
            }
            Err(error) => batch.warnings.push(SampleWarning {
                subsystem: Subsystem::Cpu,
                error,
            }),
        }

        match self.host.memory() {
            Ok(mem) => {
                batch.samples.push(MetricSample::gauge(
                    MetricName::MemoryTotalBytes,
                    mem.total_bytes as f64,
                ));
                batch.samples.push(MetricSample::gauge(
                    MetricName::MemoryUsedBytes,
                    mem.used_bytes as f64,
                ));
            }
            Err(error) => batch.warnings.push(SampleWarning {
                subsystem: Subsystem::Memory,
                error,
            }),
        }

        match self.host.disk_usage(&self.mount_path) {
            Ok(disk) => {
                batch.samples.push(MetricSample::gauge(
                    MetricName::DiskTotalBytes,
                    disk.total_bytes as f64,
                ));
                batch.samples.push(MetricSample::gauge(
                    MetricName::DiskUsedBytes,
                    disk.used_bytes as f64,
                ));
            }
            Err(error) => batch.warnings.push(SampleWarning {
                subsystem: Subsystem::Disk,
                error,
            }),
        }

        batch
    }
}

/// Clamps to [0, 100] and rounds to one decimal place.
fn normalize_percent(percent: f64) -> f64 {
    if !percent.is_finite() {
        return 0.0;
    }
    (percent.clamp(0.0, 100.0) * 10.0).round() / 10.0
}
