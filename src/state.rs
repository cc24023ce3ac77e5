//! Application state shared between the HTTP handlers and the collection loop.

use std::sync::Arc;

use crate::config::Config;
use crate::health_stats::ExporterStats;
use crate::metrics::{Exposition, MetricsRegistry};

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests and background tasks.
pub struct AppState {
    pub registry: Arc<MetricsRegistry>,
    /// What `/` renders. Defaults to `registry`.
    pub exposition: Arc<dyn Exposition>,
    pub stats: Arc<ExporterStats>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(registry: Arc<MetricsRegistry>, stats: Arc<ExporterStats>, config: Config) -> Self {
        Self {
            exposition: registry.clone(),
            registry,
            stats,
            config: Arc::new(config),
        }
    }

    /// Serves `exposition` on `/` instead of the registry.
    pub fn with_exposition(mut self, exposition: Arc<dyn Exposition>) -> Self {
        self.exposition = exposition;
        self
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}
