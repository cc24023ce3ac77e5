//! Integration tests for the background collection loop.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{sampler_for, FakeHost, GIB};
use herakles_host_exporter::health_stats::ExporterStats;
use herakles_host_exporter::metrics::{MetricName, MetricsRegistry, CORE_LABEL};
use herakles_host_exporter::sampler::Subsystem;
use herakles_host_exporter::updater::{run_collection_loop, run_collection_pass};
use tokio::sync::watch;

#[tokio::test]
async fn test_passes_populate_full_catalog() {
    let cores = 12;
    let host = FakeHost::new(cores);
    let sampler = sampler_for(host.clone());
    let registry = MetricsRegistry::new(cores).unwrap();
    let stats = ExporterStats::new();

    for _ in 0..3 {
        let report = run_collection_pass(sampler.clone(), &registry, &stats)
            .await
            .unwrap();
        assert_eq!(report.written, cores + 4);
        assert!(report.failed_subsystems.is_empty());
    }

    assert_eq!(registry.series_count(), cores + 4);
    assert_eq!(stats.passes(), 3);

    let core_labels: Vec<String> = registry
        .snapshot()
        .iter()
        .filter_map(|s| s.label(CORE_LABEL).map(str::to_string))
        .collect();
    let expected: Vec<String> = (0..cores).map(|c| c.to_string()).collect();
    assert_eq!(core_labels, expected);

    // Values reflect the third pass.
    assert_eq!(registry.value(MetricName::CpuUsagePercentage, Some(0)), Some(3.0));
    assert_eq!(registry.value(MetricName::CpuUsagePercentage, Some(11)), Some(14.0));
    assert_eq!(
        registry.value(MetricName::MemoryUsedBytes, None),
        Some((3 * GIB) as f64)
    );
}

#[tokio::test]
async fn test_disk_failure_keeps_last_value() {
    let host = FakeHost::new(2);
    let sampler = sampler_for(host.clone());
    let registry = MetricsRegistry::new(2).unwrap();
    let stats = ExporterStats::new();

    run_collection_pass(sampler.clone(), &registry, &stats).await.unwrap();
    assert_eq!(registry.value(MetricName::DiskUsedBytes, None), Some(GIB as f64));

    host.set_disk_ok(false);
    let report = run_collection_pass(sampler.clone(), &registry, &stats)
        .await
        .unwrap();

    assert_eq!(report.failed_subsystems, vec![Subsystem::Disk]);
    assert_eq!(report.written, 2 + 2);
    assert_eq!(registry.value(MetricName::DiskUsedBytes, None), Some(GIB as f64));
    assert_eq!(
        registry.value(MetricName::DiskTotalBytes, None),
        Some((100 * GIB) as f64)
    );
    assert_eq!(
        registry.value(MetricName::MemoryUsedBytes, None),
        Some((2 * GIB) as f64)
    );
    assert_eq!(registry.value(MetricName::CpuUsagePercentage, Some(1)), Some(3.0));
    assert_eq!(stats.subsystem_failures(Subsystem::Disk), 1);
}

#[tokio::test]
async fn test_disk_failure_from_start_leaves_disk_absent() {
    let host = FakeHost::new(4);
    host.set_disk_ok(false);
    let sampler = sampler_for(host.clone());
    let registry = MetricsRegistry::new(4).unwrap();
    let stats = ExporterStats::new();

    run_collection_pass(sampler, &registry, &stats).await.unwrap();

    assert_eq!(registry.series_count(), 4 + 2);
    let text = String::from_utf8(registry.render().unwrap()).unwrap();
    assert!(!text.contains("disk_total_bytes"));
    assert!(!text.contains("disk_used_bytes"));
    assert!(text.contains("memory_total_bytes"));
}

#[tokio::test]
async fn test_loop_runs_until_shutdown() {
    let cores = 3;
    let host = FakeHost::new(cores);
    let registry = Arc::new(MetricsRegistry::new(cores).unwrap());
    let stats = Arc::new(ExporterStats::new());
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(run_collection_loop(
        sampler_for(host.clone()),
        registry.clone(),
        stats.clone(),
        Duration::from_millis(10),
        rx,
    ));

    tokio::time::timeout(Duration::from_secs(10), async {
        while stats.passes() < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("collection loop did not complete three passes");

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("collection loop did not stop")
        .unwrap();

    let passes_at_stop = host.passes();
    assert!(passes_at_stop >= 3);
    assert_eq!(registry.series_count(), cores + 4);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(host.passes(), passes_at_stop);
}

#[tokio::test]
async fn test_loop_stops_when_sender_dropped() {
    let host = FakeHost::new(1);
    let registry = Arc::new(MetricsRegistry::new(1).unwrap());
    let stats = Arc::new(ExporterStats::new());
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(run_collection_loop(
        sampler_for(host),
        registry,
        stats,
        Duration::from_secs(3600),
        rx,
    ));

    drop(tx);
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("collection loop ignored dropped sender")
        .unwrap();
}
