//! Spawned servers with owned shutdown

use axum::{middleware::from_fn_with_state, Router};
use cachecmp_caching::ResponseCache;
use cachecmp_http::{build_client, HttpConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tracing::{debug, error, info};

use crate::error::{ProxyError, ProxyResult};
use crate::middleware::{cache_middleware, CacheLayerState};
use crate::relayer::Relayer;
use crate::router::forwarding_router;

/// Cache middleware wrapping the host-dispatching router
pub fn caching_proxy_app(
    relayer: Arc<dyn Relayer>,
    cache: Arc<ResponseCache>,
    cache_status_header: &str,
    http: &HttpConfig,
) -> ProxyResult<Router> {
    let state = CacheLayerState::new(cache, cache_status_header)?;
    let client = build_client(http)?;
    Ok(forwarding_router(relayer, client).layer(from_fn_with_state(state, cache_middleware)))
}

/// A server running on a background task.
///
/// Dropping the handle signals shutdown; [`ServerHandle::shutdown`] also
/// waits for the server task to finish.
pub struct ServerHandle {
    name: &'static str,
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

/// Bind `bind` and serve `app` until the returned handle shuts it down
pub async fn spawn_server(
    name: &'static str,
    bind: SocketAddr,
    app: Router,
) -> ProxyResult<ServerHandle> {
    let bind_error = |source| ProxyError::Bind {
        addr: bind.to_string(),
        source,
    };
    let listener = TcpListener::bind(bind).await.map_err(bind_error)?;
    let addr = listener.local_addr().map_err(bind_error)?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let shutdown = async move {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("{} server error: {}", name, e);
        }
        debug!("{} server on {} stopped", name, addr);
    });

    info!("{} listening on {}", name, addr);
    Ok(ServerHandle {
        name,
        addr,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

impl ServerHandle {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Signal shutdown and wait for in-flight connections to finish
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("{} server task failed: {}", self.name, e);
            }
        }
    }

    /// Serve until `signal` resolves, then shut down
    pub async fn run_until<F>(self, signal: F)
    where
        F: std::future::Future<Output = ()>,
    {
        signal.await;
        info!("Stopping {} on {}", self.name, self.addr);
        self.shutdown().await;
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
