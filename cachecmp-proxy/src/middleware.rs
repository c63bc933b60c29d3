//! Response cache middleware
//!
//! Wraps the forwarding router. GET responses are keyed by virtual host and
//! path with query; successful ones are stored and served again without
//! reaching the router. Every response carries the cache-status header.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use cachecmp_caching::{CachedResponse, ResponseCache, ResponseKey};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::error::{ProxyError, ProxyResult};
use crate::relayer::strip_port;

/// Served from the upstream; stored when cacheable
pub const MISS: &str = "MISS";

/// Not eligible for caching (method other than GET, or no Host)
pub const BYPASS: &str = "BYPASS";

/// State for [`cache_middleware`]
#[derive(Clone)]
pub struct CacheLayerState {
    cache: Arc<ResponseCache>,
    header: HeaderName,
}

impl CacheLayerState {
    pub fn new(cache: Arc<ResponseCache>, cache_status_header: &str) -> ProxyResult<Self> {
        let header = HeaderName::from_str(cache_status_header)
            .map_err(|_| ProxyError::InvalidHeader(cache_status_header.to_string()))?;
        Ok(Self { cache, header })
    }

    fn annotate(&self, mut response: Response, status: &'static str) -> Response {
        response
            .headers_mut()
            .insert(self.header.clone(), HeaderValue::from_static(status));
        response
    }
}

/// Cache lookup in front of the wrapped service
pub async fn cache_middleware(
    State(state): State<CacheLayerState>,
    request: Request,
    next: Next,
) -> Response {
    let key = if request.method() == Method::GET {
        let path = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        request
            .headers()
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(|host| ResponseKey::new(strip_port(host), path))
    } else {
        None
    };

    let Some(key) = key else {
        let response = next.run(request).await;
        return state.annotate(response, BYPASS);
    };

    match state.cache.get(&key).await {
        Ok(Some(cached)) => {
            trace!("Cache hit for {}{}", key.host, key.path);
            return state.annotate(replay(&cached), cachecmp_http::HIT);
        }
        Ok(None) => {}
        Err(e) => warn!("Cache lookup failed for {}{}: {}", key.host, key.path, e),
    }

    let response = next.run(request).await;
    if !response.status().is_success() {
        return state.annotate(response, MISS);
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to buffer upstream body for {}{}: {}", key.host, key.path, e);
            let response = ProxyError::Body(e.to_string()).into_response();
            return state.annotate(response, MISS);
        }
    };

    let stored = CachedResponse::new(
        parts.status.as_u16(),
        parts
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect(),
        bytes.to_vec(),
    );
    debug!("Caching {}{} ({} bytes)", key.host, key.path, bytes.len());
    if let Err(e) = state.cache.put(key, stored).await {
        debug!("Response not cached: {}", e);
    }

    state.annotate(Response::from_parts(parts, Body::from(bytes)), MISS)
}

/// Rebuild a response from a stored entry
fn replay(cached: &CachedResponse) -> Response {
    let mut response = Response::new(Body::from(cached.body.clone()));
    *response.status_mut() = StatusCode::from_u16(cached.status).unwrap_or(StatusCode::OK);

    let headers = response.headers_mut();
    for (name, value) in &cached.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_bytes(value),
        ) {
            headers.append(name, value);
        }
    }
    response
}
