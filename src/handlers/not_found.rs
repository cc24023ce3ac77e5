//! Fallback for every path other than `/`.

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::state::SharedState;

pub const NOT_FOUND_BODY: &str = "Page not found";

pub async fn not_found_handler(State(state): State<SharedState>) -> impl IntoResponse {
    state.stats.record_not_found();
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}
