//! Origin simulator
//!
//! Answers every request with `200 OK` and a body echoing method, Host and
//! path. Each request served bumps a shared counter, which is how callers
//! check whether traffic reached the origin.

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

use crate::error::ProxyResult;
use crate::server::{spawn_server, ServerHandle};

/// Number of requests the origin has served
#[derive(Debug, Clone, Default)]
pub struct HitCounter(Arc<AtomicU64>);

impl HitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Echo application counting into `hits`
pub fn origin_app(hits: HitCounter) -> Router {
    Router::new().fallback(echo).with_state(hits)
}

async fn echo(
    State(hits): State<HitCounter>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> impl IntoResponse {
    let count = hits.increment();
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    trace!("origin request #{}: {} {}{}", count, method, host, path);

    (StatusCode::OK, format!("{} {}{}\n", method, host, path))
}

/// A running origin
pub struct OriginServer {
    handle: ServerHandle,
    hits: HitCounter,
}

impl OriginServer {
    /// Start on `bind`; port 0 picks a free port
    pub async fn start(bind: SocketAddr) -> ProxyResult<Self> {
        let hits = HitCounter::new();
        let handle = spawn_server("origin", bind, origin_app(hits.clone())).await?;
        Ok(Self { handle, hits })
    }

    pub fn url(&self) -> String {
        self.handle.url()
    }

    /// Requests served so far
    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    pub async fn shutdown(self) {
        self.handle.shutdown().await;
    }
}
