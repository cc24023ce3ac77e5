//! HTTP endpoint handlers for the exporter.
//!
//! - `/`: Prometheus text exposition of the registry
//! - anything else: 404

use axum::{routing::get, Router};

use crate::state::SharedState;

pub mod metrics;
pub mod not_found;

// Re-export handlers
pub use metrics::metrics_handler;
pub use not_found::not_found_handler;

/// Builds the exporter's router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(metrics_handler))
        .fallback(not_found_handler)
        .with_state(state)
}
