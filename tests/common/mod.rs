//! Shared fakes for the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use herakles_host_exporter::sampler::{DiskUsage, HostStats, MemoryUsage, SampleError, Sampler};

pub const GIB: u64 = 1024 * 1024 * 1024;

/// Deterministic host whose readings change with every CPU query.
///
/// Pass `n` (1-based) reports core `c` at `(n + c) % 100` percent, memory used
/// `n` GiB of 16 GiB and disk used `n` GiB of 100 GiB.
pub struct FakeHost {
    cores: usize,
    passes: AtomicUsize,
    memory_ok: AtomicBool,
    disk_ok: AtomicBool,
}

impl FakeHost {
    pub fn new(cores: usize) -> Arc<Self> {
        Arc::new(Self {
            cores,
            passes: AtomicUsize::new(0),
            memory_ok: AtomicBool::new(true),
            disk_ok: AtomicBool::new(true),
        })
    }

    pub fn set_disk_ok(&self, ok: bool) {
        self.disk_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_memory_ok(&self, ok: bool) {
        self.memory_ok.store(ok, Ordering::SeqCst);
    }

    pub fn passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }
}

impl HostStats for FakeHost {
    fn core_count(&self) -> Result<usize, SampleError> {
        Ok(self.cores)
    }

    fn cpu_percent_per_core(&self, _window: Duration) -> Result<Vec<f64>, SampleError> {
        let pass = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok((0..self.cores).map(|c| ((pass + c) % 100) as f64).collect())
    }

    fn memory(&self) -> Result<MemoryUsage, SampleError> {
        if !self.memory_ok.load(Ordering::SeqCst) {
            return Err(SampleError::Unavailable("meminfo unreadable".into()));
        }
        Ok(MemoryUsage {
            total_bytes: 16 * GIB,
            used_bytes: self.passes() as u64 * GIB,
        })
    }

    fn disk_usage(&self, mount: &Path) -> Result<DiskUsage, SampleError> {
        if !self.disk_ok.load(Ordering::SeqCst) {
            return Err(SampleError::Unavailable(format!(
                "{} is gone",
                mount.display()
            )));
        }
        Ok(DiskUsage {
            total_bytes: 100 * GIB,
            used_bytes: self.passes() as u64 * GIB,
        })
    }
}

/// Sampler over `host` with a zero CPU window.
pub fn sampler_for(host: Arc<FakeHost>) -> Arc<Sampler> {
    Arc::new(Sampler::new(host, "/", Duration::ZERO))
}
