//! Compiled routes and upstream targets.

use std::fmt;
use std::time::Duration;

use axum::http::HeaderValue;
use url::{Host, Url};

use crate::config::{ConfigError, RouteSpec};
use crate::routing::pattern::PathPattern;

/// Backend address a route forwards to.
///
/// Only plain `http` origins are accepted; the request path is forwarded
/// unchanged, so the upstream URI must not carry a path of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    url: Url,
    authority: String,
    host_header: HeaderValue,
}

impl Upstream {
    /// Parse an upstream base address such as `http://localhost:8003`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let url = Url::parse(raw).map_err(|e| e.to_string())?;

        if url.scheme() != "http" {
            return Err(format!("unsupported scheme `{}`", url.scheme()));
        }
        if !matches!(url.path(), "" | "/") || url.query().is_some() {
            return Err("upstream must not contain a path or query".to_string());
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err("upstream must not contain credentials".to_string());
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => format!("[{}]", addr),
            None => return Err("missing host".to_string()),
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| "missing port".to_string())?;

        let authority = format!("{}:{}", host, port);
        let host_header = HeaderValue::from_str(&authority).map_err(|e| e.to_string())?;

        Ok(Self {
            url,
            authority,
            host_header,
        })
    }

    /// `host:port`, used as the pool key and for address resolution.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Value sent as the `Host` header on forwarded requests.
    pub fn host_header(&self) -> &HeaderValue {
        &self.host_header
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http://{}", self.authority)
    }
}

/// A route compiled from a [`RouteSpec`]. Immutable once built.
#[derive(Debug, Clone)]
pub struct Route {
    id: String,
    pattern: PathPattern,
    upstream: Upstream,
    timeout: Duration,
    group: Option<String>,
}

impl Route {
    /// Compile a spec, using `default_timeout` when the spec sets none.
    pub fn compile(spec: &RouteSpec, default_timeout: Duration) -> Result<Self, ConfigError> {
        if spec.id.trim().is_empty() {
            return Err(ConfigError::EmptyRouteId);
        }

        let pattern = PathPattern::parse(&spec.path).map_err(|source| ConfigError::MalformedPattern {
            id: spec.id.clone(),
            pattern: spec.path.clone(),
            source,
        })?;

        let upstream = Upstream::parse(&spec.upstream).map_err(|reason| ConfigError::InvalidUpstream {
            id: spec.id.clone(),
            upstream: spec.upstream.clone(),
            reason,
        })?;

        let timeout = spec
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(default_timeout);
        if timeout.is_zero() {
            return Err(ConfigError::Validation(vec![format!(
                "route `{}`: timeout must be greater than zero",
                spec.id
            )]));
        }

        Ok(Self {
            id: spec.id.clone(),
            pattern,
            upstream,
            timeout,
            group: spec.group.clone(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    /// Budget from dispatch start to the first upstream response byte.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Logical backend group, if the route is tagged with one.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }
}
