//! Prometheus metric catalog and registry for herakles-host-exporter.
//!
//! The catalog is closed: every series the exporter can publish is one of the
//! [`MetricName`] variants. Each catalog entry is backed by a `GaugeVec`, so a
//! series only shows up in the exposition after its first successful write and
//! every individual value is an atomic `f64` cell. No lock spans more than one
//! series.

use prometheus::proto::Metric;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::fmt;

/// Label key carrying the logical core index of `cpu_usage_percentage`.
pub const CORE_LABEL: &str = "core";

/// Content type of the rendered exposition (text format 0.0.4).
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Initial capacity of the render buffer.
const BUFFER_CAP: usize = 4 * 1024;

/// The fixed set of metrics this exporter knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricName {
    CpuUsagePercentage,
    MemoryTotalBytes,
    MemoryUsedBytes,
    DiskTotalBytes,
    DiskUsedBytes,
}

impl MetricName {
    /// All catalog entries, in registration order.
    pub const ALL: [MetricName; 5] = [
        MetricName::CpuUsagePercentage,
        MetricName::MemoryTotalBytes,
        MetricName::MemoryUsedBytes,
        MetricName::DiskTotalBytes,
        MetricName::DiskUsedBytes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricName::CpuUsagePercentage => "cpu_usage_percentage",
            MetricName::MemoryTotalBytes => "memory_total_bytes",
            MetricName::MemoryUsedBytes => "memory_used_bytes",
            MetricName::DiskTotalBytes => "disk_total_bytes",
            MetricName::DiskUsedBytes => "disk_used_bytes",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            MetricName::CpuUsagePercentage => "CPU usage percentage per logical core",
            MetricName::MemoryTotalBytes => "Total physical memory in bytes",
            MetricName::MemoryUsedBytes => "Used physical memory in bytes",
            MetricName::DiskTotalBytes => "Total size of the monitored filesystem in bytes",
            MetricName::DiskUsedBytes => "Used space on the monitored filesystem in bytes",
        }
    }

    /// Label keys every sample of this metric must carry, in order.
    pub fn label_names(self) -> &'static [&'static str] {
        match self {
            MetricName::CpuUsagePercentage => &[CORE_LABEL],
            _ => &[],
        }
    }

    /// Looks up a catalog entry by its exposition name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered label key/value pairs of a single series.
pub type LabelSet = Vec<(&'static str, String)>;

/// A single gauge reading destined for the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: MetricName,
    pub labels: LabelSet,
    pub value: f64,
}

impl MetricSample {
    /// Creates an unlabelled sample.
    pub fn gauge(name: MetricName, value: f64) -> Self {
        Self {
            name,
            labels: Vec::new(),
            value,
        }
    }

    /// Creates a `cpu_usage_percentage{core="<core>"}` sample.
    pub fn cpu_core(core: usize, value: f64) -> Self {
        Self {
            name: MetricName::CpuUsagePercentage,
            labels: vec![(CORE_LABEL, core.to_string())],
            value,
        }
    }

    /// Returns the value of label `key`, if present.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Errors raised by [`MetricsRegistry`].
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("metric {metric} expects labels {expected:?}, got {got:?}")]
    Labels {
        metric: MetricName,
        expected: &'static [&'static str],
        got: Vec<String>,
    },

    #[error("invalid core label '{0}'")]
    InvalidCore(String),

    #[error("core index {core} out of range (host has {cores} logical cores)")]
    CoreOutOfRange { core: usize, cores: usize },

    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("failed to encode metrics: {0}")]
    Encode(String),
}

/// Concurrency-safe store of the latest value per (metric, label set).
pub struct MetricsRegistry {
    registry: Registry,
    gauges: Vec<GaugeVec>,
    core_count: usize,
}

impl MetricsRegistry {
    /// Creates an empty registry for a host with `core_count` logical cores.
    pub fn new(core_count: usize) -> Result<Self, RegistryError> {
        let registry = Registry::new();
        let mut gauges = Vec::with_capacity(MetricName::ALL.len());

        for name in MetricName::ALL {
            let vec = GaugeVec::new(Opts::new(name.as_str(), name.help()), name.label_names())?;
            registry.register(Box::new(vec.clone()))?;
            gauges.push(vec);
        }

        Ok(Self {
            registry,
            gauges,
            core_count,
        })
    }

    /// Number of logical cores the CPU series are bounded by.
    pub fn core_count(&self) -> usize {
        self.core_count
    }

    /// Upserts the value of a single series.
    pub fn set(&self, sample: &MetricSample) -> Result<(), RegistryError> {
        let expected = sample.name.label_names();
        let keys_match = sample.labels.len() == expected.len()
            && sample
                .labels
                .iter()
                .zip(expected)
                .all(|((key, _), want)| key == want);

        if !keys_match {
            return Err(RegistryError::Labels {
                metric: sample.name,
                expected,
                got: sample.labels.iter().map(|(k, _)| k.to_string()).collect(),
            });
        }

        let gauge_vec = &self.gauges[sample.name.index()];

        if sample.name == MetricName::CpuUsagePercentage {
            let raw = sample.label(CORE_LABEL).unwrap_or_default();
            let core: usize = raw
                .parse()
                .map_err(|_| RegistryError::InvalidCore(raw.to_string()))?;
            if core >= self.core_count {
                return Err(RegistryError::CoreOutOfRange {
                    core,
                    cores: self.core_count,
                });
            }
            // Canonical form so "01" and "1" cannot become two series.
            let core_label = core.to_string();
            let values: Vec<&str> = vec![core_label.as_str()];
            gauge_vec
                .get_metric_with_label_values(values.as_slice())?
                .set(sample.value);
            return Ok(());
        }

        let values: Vec<&str> = sample.labels.iter().map(|(_, v)| v.as_str()).collect();
        gauge_vec
            .get_metric_with_label_values(values.as_slice())?
            .set(sample.value);
        Ok(())
    }

    /// Renders every held series in the Prometheus text exposition format.
    ///
    /// Families are ordered by name; CPU series by ascending numeric core index.
    pub fn render(&self) -> Result<Vec<u8>, RegistryError> {
        let mut families = self.registry.gather();
        for family in families.iter_mut() {
            if family.name() == MetricName::CpuUsagePercentage.as_str() {
                family.mut_metric().sort_by_key(core_index);
            }
        }

        let mut buffer = Vec::with_capacity(BUFFER_CAP);
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| RegistryError::Encode(e.to_string()))?;
        Ok(buffer)
    }

    /// Number of series currently held.
    pub fn series_count(&self) -> usize {
        self.registry
            .gather()
            .iter()
            .map(|f| f.get_metric().len())
            .sum()
    }

    /// Point-in-time copy of every held series, CPU series ordered by core.
    pub fn snapshot(&self) -> Vec<MetricSample> {
        let mut out = Vec::new();
        for family in self.registry.gather() {
            let Some(name) = MetricName::from_name(family.name()) else {
                continue;
            };
            let mut metrics: Vec<&Metric> = family.get_metric().iter().collect();
            metrics.sort_by_key(|m| core_index(m));

            for metric in metrics {
                let labels: LabelSet = name
                    .label_names()
                    .iter()
                    .map(|key| {
                        let value = metric
                            .get_label()
                            .iter()
                            .find(|l| l.name() == *key)
                            .map(|l| l.value().to_string())
                            .unwrap_or_default();
                        (*key, value)
                    })
                    .collect();
                out.push(MetricSample {
                    name,
                    labels,
                    value: metric.get_gauge().value(),
                });
            }
        }
        out
    }

    /// Latest value of one series, if it has ever been written.
    pub fn value(&self, name: MetricName, core: Option<usize>) -> Option<f64> {
        let core_label = core.map(|c| c.to_string());
        self.snapshot()
            .into_iter()
            .find(|s| s.name == name && s.label(CORE_LABEL) == core_label.as_deref())
            .map(|s| s.value)
    }
}

/// Source of the exposition served on `/`.
pub trait Exposition: Send + Sync {
    fn render(&self) -> Result<Vec<u8>, RegistryError>;
}

impl Exposition for MetricsRegistry {
    fn render(&self) -> Result<Vec<u8>, RegistryError> {
        MetricsRegistry::render(self)
    }
}

/// Numeric core index of a gathered series; unlabelled series sort last.
fn core_index(metric: &Metric) -> usize {
    metric
        .get_label()
        .iter()
        .find(|l| l.name() == CORE_LABEL)
        .and_then(|l| l.value().parse().ok())
        .unwrap_or(usize::MAX)
}
