//! Integration tests for the exposition server.
//!
//! The router is served on an ephemeral port and queried with plain HTTP/1.1
//! requests, so the tests see exactly what a scraper sees.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use common::{sampler_for, FakeHost};
use herakles_host_exporter::config::Config;
use herakles_host_exporter::handlers::{self, metrics::MetricsError, metrics_handler};
use herakles_host_exporter::health_stats::ExporterStats;
use herakles_host_exporter::metrics::{Exposition, MetricsRegistry, RegistryError, CONTENT_TYPE};
use herakles_host_exporter::state::{AppState, SharedState};
use herakles_host_exporter::updater::run_collection_pass;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Exposition that can never be encoded.
struct BrokenExposition;

impl Exposition for BrokenExposition {
    fn render(&self) -> Result<Vec<u8>, RegistryError> {
        Err(RegistryError::Encode("buffer rejected write".into()))
    }
}

struct RawResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl RawResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn state_with(cores: usize) -> SharedState {
    AppState::new(
        Arc::new(MetricsRegistry::new(cores).unwrap()),
        Arc::new(ExporterStats::new()),
        Config::default(),
    )
    .shared()
}

async fn serve(state: SharedState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = handlers::router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn request(addr: SocketAddr, method: &str, path: &str) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let req = format!(
        "{} {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        method, path
    );
    stream.write_all(req.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();

    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no header terminator");
    let head = String::from_utf8_lossy(&raw[..split]).to_string();
    let body = raw[split + 4..].to_vec();

    let mut lines = head.lines();
    let status = lines
        .next()
        .and_then(|l| l.split(' ').nth(1))
        .and_then(|s| s.parse().ok())
        .expect("malformed status line");
    let headers = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    RawResponse {
        status,
        headers,
        body,
    }
}

#[tokio::test]
async fn test_root_before_first_pass_is_empty() {
    let addr = serve(state_with(4)).await;
    let resp = request(addr, "GET", "/").await;

    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("content-type"), Some(CONTENT_TYPE));
    assert_eq!(resp.header("content-length"), Some("0"));
    assert!(resp.body.is_empty());
}

#[tokio::test]
async fn test_root_serves_registry_contents() {
    let cores = 2;
    let state = state_with(cores);
    let host = FakeHost::new(cores);
    run_collection_pass(sampler_for(host), &state.registry, &state.stats)
        .await
        .unwrap();

    let addr = serve(state.clone()).await;
    let resp = request(addr, "GET", "/").await;

    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("content-type"), Some("text/plain; version=0.0.4"));
    assert_eq!(
        resp.header("content-length"),
        Some(resp.body.len().to_string().as_str())
    );

    let body = String::from_utf8(resp.body.clone()).unwrap();
    assert_eq!(body.as_bytes(), state.registry.render().unwrap().as_slice());
    assert!(body.contains("cpu_usage_percentage{core=\"0\"} 1\n"));
    assert!(body.contains("cpu_usage_percentage{core=\"1\"} 2\n"));
    assert!(body.contains("disk_total_bytes "));

    // A scrape never triggers sampling.
    let again = request(addr, "GET", "/").await;
    assert_eq!(again.body, resp.body);
}

#[tokio::test]
async fn test_unknown_paths_are_not_found() {
    let state = state_with(1);
    let addr = serve(state.clone()).await;

    for path in ["/nonexistent", "/metrics", "/index.html"] {
        let resp = request(addr, "GET", path).await;
        assert_eq!(resp.status, 404, "path {}", path);
        assert_eq!(resp.body, b"Page not found");
    }

    // Same answer once the registry holds data.
    run_collection_pass(sampler_for(FakeHost::new(1)), &state.registry, &state.stats)
        .await
        .unwrap();
    let resp = request(addr, "GET", "/nonexistent").await;
    assert_eq!(resp.status, 404);
    assert_eq!(
        state
            .stats
            .not_found
            .load(std::sync::atomic::Ordering::Relaxed),
        4
    );
}

#[tokio::test]
async fn test_head_root_has_headers_only() {
    let addr = serve(state_with(1)).await;
    let resp = request(addr, "HEAD", "/").await;

    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("content-type"), Some(CONTENT_TYPE));
    assert!(resp.body.is_empty());
}

#[tokio::test]
async fn test_post_root_is_method_not_allowed() {
    let addr = serve(state_with(1)).await;
    let resp = request(addr, "POST", "/").await;
    assert_eq!(resp.status, 405);
}

#[tokio::test]
async fn test_handler_records_scrapes() {
    let state = state_with(1);
    let resp = metrics_handler(State(state.clone())).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        CONTENT_TYPE
    );
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert!(body.is_empty());
    assert_eq!(
        state
            .stats
            .scrapes_served
            .load(std::sync::atomic::Ordering::Relaxed),
        1
    );
}

#[tokio::test]
async fn test_render_failure_maps_to_generic_500() {
    let resp = MetricsError::EncodingFailed.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"Error generating metrics");
}

#[tokio::test]
async fn test_render_failure_returns_500_and_keeps_serving() {
    let registry = Arc::new(MetricsRegistry::new(1).unwrap());
    let stats = Arc::new(ExporterStats::new());
    let state = AppState::new(registry, stats.clone(), Config::default())
        .with_exposition(Arc::new(BrokenExposition))
        .shared();
    let addr = serve(state).await;

    for _ in 0..2 {
        let resp = request(addr, "GET", "/").await;
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body, b"Error generating metrics");
    }

    // The listener is still up for other paths.
    let resp = request(addr, "GET", "/nonexistent").await;
    assert_eq!(resp.status, 404);

    assert_eq!(
        stats
            .render_failures
            .load(std::sync::atomic::Ordering::Relaxed),
        2
    );
    assert_eq!(
        stats
            .scrapes_served
            .load(std::sync::atomic::Ordering::Relaxed),
        0
    );
}
