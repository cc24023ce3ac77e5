//! Runtime statistics for the exporter itself.
//!
//! These counters describe how the collection loop and the scrape endpoint
//! are doing. They are not part of the exposed metric catalog; the collection
//! loop logs them at debug level and the binary prints a summary on shutdown.

use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::sampler::Subsystem;

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns (last, avg, max, min, count).
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Counters shared by the collection loop and the HTTP handlers.
pub struct ExporterStats {
    pub passes_completed: AtomicU64,
    pub passes_aborted: AtomicU64,
    pub cpu_failures: AtomicU64,
    pub memory_failures: AtomicU64,
    pub disk_failures: AtomicU64,
    pub rejected_samples: AtomicU64,
    pub samples_written: AtomicU64,
    pub pass_duration_seconds: Stat,

    pub scrapes_served: AtomicU64,
    pub render_failures: AtomicU64,
    pub not_found: AtomicU64,
    pub render_duration_ms: Stat,

    start_time: Instant,
}

impl Default for ExporterStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ExporterStats {
    pub fn new() -> Self {
        Self {
            passes_completed: AtomicU64::new(0),
            passes_aborted: AtomicU64::new(0),
            cpu_failures: AtomicU64::new(0),
            memory_failures: AtomicU64::new(0),
            disk_failures: AtomicU64::new(0),
            rejected_samples: AtomicU64::new(0),
            samples_written: AtomicU64::new(0),
            pass_duration_seconds: Stat::default(),
            scrapes_served: AtomicU64::new(0),
            render_failures: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
            render_duration_ms: Stat::default(),
            start_time: Instant::now(),
        }
    }

    pub fn record_pass(&self, written: u64, duration_seconds: f64) {
        self.passes_completed.fetch_add(1, Ordering::Relaxed);
        self.samples_written.fetch_add(written, Ordering::Relaxed);
        self.pass_duration_seconds.add_sample(duration_seconds);
    }

    pub fn record_pass_aborted(&self) {
        self.passes_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subsystem_failure(&self, subsystem: Subsystem) {
        let counter = match subsystem {
            Subsystem::Cpu => &self.cpu_failures,
            Subsystem::Memory => &self.memory_failures,
            Subsystem::Disk => &self.disk_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_sample(&self) {
        self.rejected_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scrape(&self, render_ms: f64) {
        self.scrapes_served.fetch_add(1, Ordering::Relaxed);
        self.render_duration_ms.add_sample(render_ms);
    }

    pub fn record_render_failure(&self) {
        self.render_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subsystem_failures(&self, subsystem: Subsystem) -> u64 {
        match subsystem {
            Subsystem::Cpu => self.cpu_failures.load(Ordering::Relaxed),
            Subsystem::Memory => self.memory_failures.load(Ordering::Relaxed),
            Subsystem::Disk => self.disk_failures.load(Ordering::Relaxed),
        }
    }

    pub fn passes(&self) -> u64 {
        self.passes_completed.load(Ordering::Relaxed)
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Renders a plain-text summary table.
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let (pass_last, pass_avg, pass_max, pass_min, _) = self.pass_duration_seconds.snapshot();
        let (render_last, render_avg, render_max, render_min, _) =
            self.render_duration_ms.snapshot();

        writeln!(out, "EXPORTER STATISTICS").ok();
        writeln!(out, "===================").ok();
        writeln!(out, "Uptime:                {}s", self.get_uptime_seconds()).ok();
        writeln!(out).ok();
        writeln!(
            out,
            "{:28} | {:>10} | {:>10} | {:>10} | {:>10}",
            "Timing", "last", "avg", "max", "min"
        )
        .ok();
        writeln!(out, "{}", "-".repeat(80)).ok();
        writeln!(
            out,
            "{:28} | {:>10.3} | {:>10.3} | {:>10.3} | {:>10.3}",
            "pass duration (s)", pass_last, pass_avg, pass_max, pass_min
        )
        .ok();
        writeln!(
            out,
            "{:28} | {:>10.3} | {:>10.3} | {:>10.3} | {:>10.3}",
            "render duration (ms)", render_last, render_avg, render_max, render_min
        )
        .ok();
        writeln!(out).ok();

        let counters = [
            ("passes completed", self.passes()),
            ("passes aborted", self.passes_aborted.load(Ordering::Relaxed)),
            ("samples written", self.samples_written.load(Ordering::Relaxed)),
            ("samples rejected", self.rejected_samples.load(Ordering::Relaxed)),
            ("cpu failures", self.subsystem_failures(Subsystem::Cpu)),
            ("memory failures", self.subsystem_failures(Subsystem::Memory)),
            ("disk failures", self.subsystem_failures(Subsystem::Disk)),
            ("scrapes served", self.scrapes_served.load(Ordering::Relaxed)),
            ("render failures", self.render_failures.load(Ordering::Relaxed)),
            ("not found", self.not_found.load(Ordering::Relaxed)),
        ];
        for (name, value) in counters {
            writeln!(out, "{:28} | {:>10}", name, value).ok();
        }
        out
    }
}
