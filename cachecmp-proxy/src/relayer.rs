//! Virtual host to upstream mapping

use crate::error::{ProxyError, ProxyResult};
use std::collections::HashMap;

/// Resolves the upstream base URL serving a virtual host
pub trait Relayer: Send + Sync {
    /// Upstream for `host`; the host is already stripped of any port
    fn upstream(&self, host: &str) -> Option<&str>;
}

/// Relayer backed by a fixed host map
#[derive(Debug, Clone, Default)]
pub struct StaticRelayer {
    routes: HashMap<String, String>,
}

impl StaticRelayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route; hosts match case-insensitively
    pub fn with_route(mut self, host: impl AsRef<str>, upstream: impl Into<String>) -> Self {
        let upstream: String = upstream.into();
        self.routes.insert(
            host.as_ref().to_ascii_lowercase(),
            upstream.trim_end_matches('/').to_string(),
        );
        self
    }

    /// Build from `HOST=URL` pairs; at least one is required
    pub fn from_routes<I, S>(routes: I) -> ProxyResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let relayer = routes.into_iter().try_fold(Self::new(), |relayer, route| {
            let (host, upstream) = parse_route(route.as_ref())?;
            Ok::<_, ProxyError>(relayer.with_route(host, upstream))
        })?;

        if relayer.is_empty() {
            return Err(ProxyError::InvalidRoute("no routes given".to_string()));
        }
        Ok(relayer)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Relayer for StaticRelayer {
    fn upstream(&self, host: &str) -> Option<&str> {
        self.routes
            .get(&host.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Split `HOST=URL`
pub fn parse_route(route: &str) -> ProxyResult<(&str, &str)> {
    match route.split_once('=') {
        Some((host, upstream)) if !host.trim().is_empty() && !upstream.trim().is_empty() => {
            Ok((host.trim(), upstream.trim()))
        }
        _ => Err(ProxyError::InvalidRoute(route.to_string())),
    }
}

/// Drop a trailing `:port` from a Host header value
pub fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        // Bracketed IPv6 literal
        return match rest.split_once(']') {
            Some((addr, _)) => addr,
            None => host,
        };
    }

    match host.rsplit_once(':') {
        Some((name, port))
            if !name.contains(':')
                && !port.is_empty()
                && port.bytes().all(|b| b.is_ascii_digit()) =>
        {
            name
        }
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("a.example.com"), "a.example.com");
        assert_eq!(strip_port("a.example.com:8080"), "a.example.com");
        assert_eq!(strip_port("[::1]:8080"), "::1");
        assert_eq!(strip_port("::1"), "::1");
        assert_eq!(strip_port("a.example.com:"), "a.example.com:");
    }

    #[test]
    fn test_static_lookup() {
        let relayer = StaticRelayer::new()
            .with_route("A.example.com", "http://127.0.0.1:9000/")
            .with_route("b.example.com", "http://127.0.0.1:9001");

        assert_eq!(relayer.upstream("a.example.com"), Some("http://127.0.0.1:9000"));
        assert_eq!(relayer.upstream("B.EXAMPLE.COM"), Some("http://127.0.0.1:9001"));
        assert_eq!(relayer.upstream("c.example.com"), None);
        assert_eq!(relayer.len(), 2);
    }

    #[test]
    fn test_from_routes() {
        let relayer =
            StaticRelayer::from_routes(["a.example.com=http://127.0.0.1:9000"]).unwrap();
        assert_eq!(relayer.upstream("a.example.com"), Some("http://127.0.0.1:9000"));

        assert!(matches!(
            StaticRelayer::from_routes(["a.example.com"]),
            Err(ProxyError::InvalidRoute(_))
        ));
        assert!(matches!(
            StaticRelayer::from_routes(["=http://127.0.0.1:9000"]),
            Err(ProxyError::InvalidRoute(_))
        ));
        assert!(matches!(
            StaticRelayer::from_routes(Vec::<String>::new()),
            Err(ProxyError::InvalidRoute(_))
        ));
    }
}
