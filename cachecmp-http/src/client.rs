//! Probe client implementation

use crate::config::HttpConfig;
use crate::errors::{HttpError, HttpResult};
use crate::types::{ProbeResult, RequestDescriptor};
use reqwest::{
    header::{HeaderName, CONNECTION, HOST},
    Client,
};
use std::str::FromStr;
use tracing::{debug, trace};

/// Build a client that never keeps idle connections and never follows redirects
pub fn build_client(config: &HttpConfig) -> HttpResult<Client> {
    debug!(
        "Creating HTTP client with {}s timeout, {}s connect timeout",
        config.timeout.as_secs(),
        config.connect_timeout.as_secs()
    );

    let client = Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent)
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    Ok(client)
}

/// Issues probes against a caching proxy and reads one cache-status header
#[derive(Debug, Clone)]
pub struct ProbeClient {
    client: Client,
    cache_status_header: HeaderName,
}

impl ProbeClient {
    /// Create a probe client reading `cache_status_header` from responses
    pub fn new(config: &HttpConfig, cache_status_header: &str) -> HttpResult<Self> {
        let cache_status_header = HeaderName::from_str(cache_status_header)
            .map_err(|_| HttpError::InvalidHeaderName(cache_status_header.to_string()))?;

        Ok(Self {
            client: build_client(config)?,
            cache_status_header,
        })
    }

    /// Header inspected on every response
    pub fn cache_status_header(&self) -> &str {
        self.cache_status_header.as_str()
    }

    /// Send one GET. Any response that arrives is `Ok`, whatever its status.
    pub async fn probe(&self, request: &RequestDescriptor) -> HttpResult<ProbeResult> {
        let mut builder = self
            .client
            .get(&request.url)
            .header(HOST, request.host.as_str());
        if request.close {
            builder = builder.header(CONNECTION, "close");
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let cache_status = response
            .headers()
            .get(&self.cache_status_header)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

        // Read the body so the exchange completes before the connection closes
        let body = response.bytes().await?;
        trace!(
            "{} {} -> {} ({} bytes, {}={:?})",
            request.host,
            request.url,
            status,
            body.len(),
            self.cache_status_header,
            cache_status
        );

        Ok(ProbeResult {
            status,
            cache_status,
        })
    }

    /// Send one GET and fail unless the status is 2xx
    pub async fn fetch_ok(&self, request: &RequestDescriptor) -> HttpResult<ProbeResult> {
        let result = self.probe(request).await?;
        if !result.is_success() {
            return Err(HttpError::UnexpectedStatus {
                status: result.status,
                url: request.url.clone(),
            });
        }
        Ok(result)
    }
}
