//! Herakles Host Exporter Library
//!
//! Samples per-core CPU utilization, physical memory and the disk usage of
//! one mount point on a fixed interval, and serves the latest values over
//! HTTP in the Prometheus text exposition format.
//!
//! # Architecture
//!
//! - [`sampler::Sampler`] queries a [`sampler::HostStats`] implementation
//!   ([`system::ProcfsHost`] on Linux) and normalizes the results.
//! - [`updater::run_collection_loop`] writes every pass into the shared
//!   [`metrics::MetricsRegistry`].
//! - [`handlers::router`] renders the registry on `/`.
//!
//! # Usage
//!
//! ```rust
//! use herakles_host_exporter::metrics::{MetricName, MetricSample, MetricsRegistry};
//!
//! let registry = MetricsRegistry::new(2).unwrap();
//! registry.set(&MetricSample::cpu_core(1, 42.0)).unwrap();
//! registry
//!     .set(&MetricSample::gauge(MetricName::MemoryTotalBytes, 8.0e9))
//!     .unwrap();
//!
//! let text = String::from_utf8(registry.render().unwrap()).unwrap();
//! assert!(text.contains("cpu_usage_percentage{core=\"1\"} 42"));
//! ```

pub mod cli;
pub mod collectors;
pub mod commands;
pub mod config;
pub mod handlers;
pub mod health_stats;
pub mod metrics;
pub mod sampler;
pub mod state;
pub mod system;
pub mod updater;

// Re-export main types for convenience
pub use config::{Config, ConfigError};
pub use health_stats::ExporterStats;
pub use metrics::{MetricName, MetricSample, MetricsRegistry, RegistryError};
pub use sampler::{HostStats, SampleBatch, SampleError, Sampler};
pub use state::{AppState, SharedState};
