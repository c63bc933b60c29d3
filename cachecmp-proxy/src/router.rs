//! Host-dispatching forwarder
//!
//! The upstream is chosen from the request's `Host` header, never from the
//! address the connection was made to.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap},
    response::Response,
    Router,
};
use std::sync::Arc;
use tracing::debug;

use crate::error::{ProxyError, ProxyResult};
use crate::relayer::{strip_port, Relayer};

/// Headers that describe a single connection and are never forwarded.
/// Content-Length is recomputed from the buffered body.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

/// Shared state of the forwarding router
#[derive(Clone)]
pub struct RouterState {
    relayer: Arc<dyn Relayer>,
    client: reqwest::Client,
}

/// Router forwarding every request to the relayer's upstream for its host
pub fn forwarding_router(relayer: Arc<dyn Relayer>, client: reqwest::Client) -> Router {
    Router::new()
        .fallback(forward)
        .with_state(RouterState { relayer, client })
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

async fn forward(
    State(state): State<RouterState>,
    request: Request,
) -> ProxyResult<Response> {
    let (parts, body) = request.into_parts();

    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .ok_or(ProxyError::MissingHost)?;
    let upstream = state
        .relayer
        .upstream(strip_port(host))
        .ok_or_else(|| ProxyError::UnknownHost(host.to_string()))?;

    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", upstream, path);

    let body = to_bytes(body, usize::MAX)
        .await
        .map_err(|e| ProxyError::Body(e.to_string()))?;

    // Host stays as received so the upstream sees the virtual host
    let mut headers = parts.headers.clone();
    strip_hop_by_hop(&mut headers);

    debug!("Forwarding {} {} (host {}) to {}", parts.method, path, host, url);
    let upstream_response = state
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|source| ProxyError::Upstream {
            url: url.clone(),
            source,
        })?;

    let status = upstream_response.status();
    let mut response_headers = upstream_response.headers().clone();
    strip_hop_by_hop(&mut response_headers);

    let bytes = upstream_response
        .bytes()
        .await
        .map_err(|source| ProxyError::Upstream { url, source })?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    Ok(response)
}
