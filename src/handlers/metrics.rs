//! Exposition endpoint.
//!
//! Serves the registry's current contents on `/` in the Prometheus text
//! format. The handler only reads the registry; it never triggers a sample.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::time::Instant;

use crate::metrics::CONTENT_TYPE;
use crate::state::SharedState;

/// Body sent when the exposition cannot be produced.
pub const RENDER_FAILED_BODY: &str = "Error generating metrics";

/// Error type for exposition failures. Details stay server-side.
#[derive(Debug)]
pub enum MetricsError {
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, RENDER_FAILED_BODY).into_response()
    }
}

/// Handler for `GET /` (axum answers `HEAD` with the same headers).
pub async fn metrics_handler(State(state): State<SharedState>) -> Result<Response, MetricsError> {
    let start = Instant::now();

    let body = match state.exposition.render() {
        Ok(body) => body,
        Err(_) => {
            state.stats.record_render_failure();
            return Err(MetricsError::EncodingFailed);
        }
    };

    state
        .stats
        .record_scrape(start.elapsed().as_secs_f64() * 1000.0);

    let content_length = body.len().to_string();
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, CONTENT_TYPE.to_string()),
            (header::CONTENT_LENGTH, content_length),
        ],
        body,
    )
        .into_response())
}
