//! System under test: variant description and lifecycle

use cachecmp_caching::{CacheStats, ResponseCache, ResponseCacheConfig};
use cachecmp_config::{DeploymentConfig, SutConfig, VariantKind};
use cachecmp_http::{HttpConfig, RequestDescriptor};
use cachecmp_proxy::{caching_proxy_app, spawn_server, OriginServer, ServerHandle, StaticRelayer};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{HarnessError, HarnessResult};

/// Cache-status header of the NGINX-style baseline
pub const BASELINE_HEADER: &str = "X-Nginx-Cache";

/// Cache-status header of the custom cache middleware
pub const CUSTOM_HEADER: &str = "X-Cache";

/// One caching proxy as the harness sees it.
///
/// The harness is driven entirely by these fields; both variants share the
/// same code paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SutVariant {
    pub kind: VariantKind,
    pub base_url: String,
    pub virtual_host: String,
    pub cache_status_header: String,
    pub populate_concurrency: usize,
}

impl SutVariant {
    /// Preset header and concurrency for `kind`
    pub fn preset(kind: VariantKind, base_url: impl Into<String>) -> Self {
        let (header, concurrency) = match kind {
            VariantKind::Baseline => (BASELINE_HEADER, 1),
            VariantKind::Custom => (CUSTOM_HEADER, 100),
        };

        Self {
            kind,
            base_url: base_url.into(),
            virtual_host: "a.example.com".to_string(),
            cache_status_header: header.to_string(),
            populate_concurrency: concurrency,
        }
    }

    pub fn baseline(base_url: impl Into<String>) -> Self {
        Self::preset(VariantKind::Baseline, base_url)
    }

    pub fn custom(base_url: impl Into<String>) -> Self {
        Self::preset(VariantKind::Custom, base_url)
    }

    pub fn with_virtual_host(mut self, host: impl Into<String>) -> Self {
        self.virtual_host = host.into();
        self
    }

    pub fn with_cache_status_header(mut self, header: impl Into<String>) -> Self {
        self.cache_status_header = header.into();
        self
    }

    pub fn with_populate_concurrency(mut self, concurrency: usize) -> Self {
        self.populate_concurrency = concurrency;
        self
    }

    /// Preset for the configured kind with the configured overrides applied
    pub fn from_config(config: &SutConfig, base_url: impl Into<String>) -> Self {
        let mut variant =
            Self::preset(config.variant, base_url).with_virtual_host(&config.virtual_host);
        if let Some(ref header) = config.cache_status_header {
            variant.cache_status_header = header.clone();
        }
        if let Some(concurrency) = config.populate_concurrency {
            variant.populate_concurrency = concurrency;
        }
        variant
    }

    /// GET `path` on this proxy for the virtual host, without connection reuse
    pub fn request(&self, path: &str) -> RequestDescriptor {
        RequestDescriptor::new(&self.base_url, path, self.virtual_host.as_str())
    }
}

/// Servers started by the harness for an in-process run
struct OwnedServers {
    origin: OriginServer,
    proxy: ServerHandle,
    store: Arc<ResponseCache>,
}

/// A proxy ready to receive traffic.
///
/// Owned servers stop on [`Deployment::teardown`] or when dropped.
pub struct Deployment {
    variant: SutVariant,
    owned: Option<OwnedServers>,
}

impl Deployment {
    /// Bring up the proxy described by `config`
    pub async fn start(config: &SutConfig, http: &HttpConfig) -> HarnessResult<Self> {
        match &config.deployment {
            DeploymentConfig::External { base_url } => {
                let variant = SutVariant::from_config(config, base_url.as_str());
                info!(
                    "Using external {} proxy at {}",
                    variant.kind, variant.base_url
                );
                Ok(Self::external(variant))
            }
            DeploymentConfig::InProcess {
                bind_address,
                store,
            } => {
                let ip: IpAddr = bind_address.parse().map_err(|e| {
                    HarnessError::Setup(format!("invalid bind address '{}': {}", bind_address, e))
                })?;
                let template = SutVariant::from_config(config, "");
                Self::in_process(template, SocketAddr::new(ip, 0), store.clone().into(), http)
                    .await
            }
        }
    }

    /// Wrap a proxy the harness does not own
    pub fn external(variant: SutVariant) -> Self {
        Self {
            variant,
            owned: None,
        }
    }

    /// Start the reference origin, then the caching proxy in front of it.
    ///
    /// `template.base_url` is replaced by the proxy's address.
    pub async fn in_process(
        template: SutVariant,
        bind: SocketAddr,
        store: ResponseCacheConfig,
        http: &HttpConfig,
    ) -> HarnessResult<Self> {
        let origin = OriginServer::start(bind).await?;
        debug!("Origin for {} at {}", template.virtual_host, origin.url());

        let relayer = StaticRelayer::new().with_route(&template.virtual_host, origin.url());
        let cache = Arc::new(ResponseCache::from_config(store)?);
        let app = caching_proxy_app(
            Arc::new(relayer),
            cache.clone(),
            &template.cache_status_header,
            http,
        )?;
        let proxy = spawn_server("proxy", bind, app).await?;

        let variant = SutVariant {
            base_url: proxy.url(),
            ..template
        };
        info!(
            "Started in-process {} proxy at {} (header {})",
            variant.kind, variant.base_url, variant.cache_status_header
        );

        Ok(Self {
            variant,
            owned: Some(OwnedServers {
                origin,
                proxy,
                store: cache,
            }),
        })
    }

    pub fn variant(&self) -> &SutVariant {
        &self.variant
    }

    /// Requests the owned origin has served; `None` for external proxies
    pub fn origin_hits(&self) -> Option<u64> {
        self.owned.as_ref().map(|servers| servers.origin.hits())
    }

    /// Counters of the owned proxy's response store; `None` for external proxies
    pub async fn store_stats(&self) -> HarnessResult<Option<CacheStats>> {
        match &self.owned {
            Some(servers) => Ok(Some(servers.store.stats().await?)),
            None => Ok(None),
        }
    }

    /// Stop owned servers, proxy first
    pub async fn teardown(self) {
        if let Some(OwnedServers { origin, proxy, .. }) = self.owned {
            proxy.shutdown().await;
            origin.shutdown().await;
            debug!("In-process servers stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let baseline = SutVariant::baseline("http://127.0.0.1:8080");
        assert_eq!(baseline.cache_status_header, "X-Nginx-Cache");
        assert_eq!(baseline.populate_concurrency, 1);

        let custom = SutVariant::custom("http://127.0.0.1:8081");
        assert_eq!(custom.cache_status_header, "X-Cache");
        assert_eq!(custom.populate_concurrency, 100);
    }

    #[test]
    fn test_config_overrides() {
        let config = SutConfig {
            variant: VariantKind::Baseline,
            virtual_host: "b.example.com".to_string(),
            cache_status_header: Some("X-Proxy-Cache".to_string()),
            populate_concurrency: Some(8),
            ..Default::default()
        };

        let variant = SutVariant::from_config(&config, "http://127.0.0.1:9000");
        assert_eq!(variant.kind, VariantKind::Baseline);
        assert_eq!(variant.virtual_host, "b.example.com");
        assert_eq!(variant.cache_status_header, "X-Proxy-Cache");
        assert_eq!(variant.populate_concurrency, 8);
    }

    #[test]
    fn test_request_descriptor() {
        let variant = SutVariant::custom("http://127.0.0.1:9000/");
        let request = variant.request("/cache/42");
        assert_eq!(request.url, "http://127.0.0.1:9000/cache/42");
        assert_eq!(request.host, "a.example.com");
        assert!(request.close);
    }

    #[tokio::test]
    async fn test_external_owns_nothing() {
        let config = SutConfig {
            deployment: DeploymentConfig::External {
                base_url: "http://127.0.0.1:8080".to_string(),
            },
            ..Default::default()
        };
        let deployment = Deployment::start(&config, &HttpConfig::default())
            .await
            .unwrap();
        assert_eq!(deployment.variant().base_url, "http://127.0.0.1:8080");
        assert_eq!(deployment.origin_hits(), None);
        deployment.teardown().await;
    }
}
