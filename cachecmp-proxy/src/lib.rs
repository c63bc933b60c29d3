//! Reference collaborators for the cachecmp harness
//!
//! - [`origin`]: echo server counting every request it serves
//! - [`relayer`]: virtual host to upstream mapping
//! - [`router`]: forwards by `Host` header to the relayer's upstream
//! - [`middleware`]: response cache in front of the router, annotating a
//!   configurable cache-status header
//! - [`server`]: spawned axum servers with owned shutdown

pub mod error;
pub mod middleware;
pub mod origin;
pub mod relayer;
pub mod router;
pub mod server;

pub use error::{ProxyError, ProxyResult};
pub use middleware::{cache_middleware, CacheLayerState, BYPASS, MISS};
pub use origin::{origin_app, HitCounter, OriginServer};
pub use relayer::{parse_route, strip_port, Relayer, StaticRelayer};
pub use router::{forwarding_router, RouterState};
pub use server::{caching_proxy_app, spawn_server, ServerHandle};
