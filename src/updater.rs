//! Background collection loop.
//!
//! Every iteration runs one sampling pass on the blocking pool (the CPU
//! measurement window sleeps), writes the batch into the registry and then
//! sleeps for the configured interval. Failures never end the loop: failed
//! subsystems keep their last written values and the next tick retries.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::health_stats::ExporterStats;
use crate::metrics::MetricsRegistry;
use crate::sampler::{SampleBatch, Sampler, Subsystem};

/// Outcome of writing one batch into the registry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub written: usize,
    pub rejected: usize,
    pub failed_subsystems: Vec<Subsystem>,
}

/// Writes every sample of `batch` into `registry`.
///
/// A rejected sample is logged and skipped; the rest of the batch still lands.
pub fn apply_batch(
    batch: SampleBatch,
    registry: &MetricsRegistry,
    stats: &ExporterStats,
) -> PassReport {
    let mut report = PassReport::default();

    for warning in &batch.warnings {
        warn!(
            "Skipping {} metrics this pass: {}",
            warning.subsystem, warning.error
        );
        stats.record_subsystem_failure(warning.subsystem);
        report.failed_subsystems.push(warning.subsystem);
    }

    for sample in &batch.samples {
        match registry.set(sample) {
            Ok(()) => report.written += 1,
            Err(e) => {
                warn!("Rejected sample for {}: {}", sample.name, e);
                stats.record_rejected_sample();
                report.rejected += 1;
            }
        }
    }

    report
}

/// Runs one sampling pass and applies it to the registry.
///
/// Returns `None` if the sampling task panicked; the registry is untouched in
/// that case.
#[instrument(skip_all)]
pub async fn run_collection_pass(
    sampler: Arc<Sampler>,
    registry: &MetricsRegistry,
    stats: &ExporterStats,
) -> Option<PassReport> {
    let start = Instant::now();

    let batch = match tokio::task::spawn_blocking(move || sampler.sample()).await {
        Ok(batch) => batch,
        Err(e) => {
            error!("Sampling pass aborted: {}", e);
            stats.record_pass_aborted();
            return None;
        }
    };

    let report = apply_batch(batch, registry, stats);
    let duration = start.elapsed().as_secs_f64();
    stats.record_pass(report.written as u64, duration);

    debug!(
        "Collection pass completed: {} written, {} rejected, {} failed subsystems, {:.2}ms",
        report.written,
        report.rejected,
        report.failed_subsystems.len(),
        duration * 1000.0
    );

    Some(report)
}

/// Runs collection passes until `shutdown` flips to `true` or its sender is
/// dropped.
pub async fn run_collection_loop(
    sampler: Arc<Sampler>,
    registry: Arc<MetricsRegistry>,
    stats: Arc<ExporterStats>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(
        "Collection loop started: interval {:?}, cpu window {:?}, mount {}",
        interval,
        sampler.cpu_window(),
        sampler.mount_path().display()
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        run_collection_pass(sampler.clone(), &registry, &stats).await;

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!(
        "Collection loop stopped after {} passes",
        stats.passes()
    );
}
