//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream connection settings shared by all routes.
    pub upstream: UpstreamConfig,

    /// Route definitions, in precedence order.
    pub routes: Vec<RouteSpec>,

    /// Degraded responses served when dispatch fails.
    pub fallback: FallbackConfig,

    /// Cross-cutting filters applied around dispatch.
    pub filters: FilterConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl GatewayConfig {
    /// Default per-route timeout applied when a route omits `timeout_ms`.
    pub fn default_route_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream.default_timeout_ms)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream connection and pooling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Timeout from dispatch start to first response byte, in milliseconds.
    pub default_timeout_ms: u64,

    /// Maximum idle connections kept per upstream.
    pub max_idle_per_upstream: usize,

    /// Idle connections older than this are discarded, in seconds.
    pub idle_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
            max_idle_per_upstream: 32,
            idle_timeout_secs: 60,
        }
    }
}

/// A single route: path pattern mapped to an upstream address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RouteSpec {
    /// Unique route identifier for logging/metrics.
    pub id: String,

    /// Path template, e.g. "/delete-document/{document_id}".
    pub path: String,

    /// Upstream base address, e.g. "http://localhost:8003".
    pub upstream: String,

    /// Per-route timeout; falls back to `upstream.default_timeout_ms`.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Logical backend group, selects a service-scoped fallback body.
    #[serde(default)]
    pub group: Option<String>,
}

impl RouteSpec {
    pub fn new(id: impl Into<String>, path: impl Into<String>, upstream: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            upstream: upstream.into(),
            timeout_ms: None,
            group: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Fallback response configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Body served for failures on routes without a service fallback.
    pub generic_body: String,

    /// Endpoint serving the generic body when `expose_endpoints` is set.
    pub generic_endpoint: String,

    /// Serve fallback bodies at their endpoints with 200 OK.
    pub expose_endpoints: bool,

    /// Body served for unmatched paths.
    pub not_found_body: String,

    /// Service-scoped fallbacks keyed by route group.
    pub services: Vec<ServiceFallbackConfig>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            generic_body: "Generic fallback".to_string(),
            generic_endpoint: "/fallback".to_string(),
            expose_endpoints: false,
            not_found_body: "No matching route found".to_string(),
            services: Vec::new(),
        }
    }
}

/// Fallback body for one backend group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceFallbackConfig {
    /// Route group this fallback applies to.
    pub group: String,

    /// Response body.
    pub body: String,

    /// Optional endpoint exposing the body directly.
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Filter chain configuration. The logging filter is always installed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Assign and propagate `x-request-id`.
    pub request_id: bool,

    /// Add `X-Forwarded-*` headers to upstream requests.
    pub forwarded_headers: bool,

    pub cors: CorsConfig,

    pub rate_limit: RateLimitConfig,

    pub headers: HeaderRewriteConfig,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            request_id: true,
            forwarded_headers: true,
            cors: CorsConfig::default(),
            rate_limit: RateLimitConfig::default(),
            headers: HeaderRewriteConfig::default(),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,

    /// Allowed origins; "*" allows any.
    pub allow_origins: Vec<String>,

    pub allow_methods: Vec<String>,

    pub allow_headers: Vec<String>,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allow_origins: vec!["*".to_string()],
            allow_methods: vec!["*".to_string()],
            allow_headers: vec!["*".to_string()],
            max_age_secs: 600,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per second per client.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 100,
            burst_size: 50,
        }
    }
}

/// Static header rewrites applied to every proxied request/response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderRewriteConfig {
    pub request_set: BTreeMap<String, String>,
    pub request_remove: Vec<String>,
    pub response_set: BTreeMap<String, String>,
    pub response_remove: Vec<String>,
}

impl HeaderRewriteConfig {
    pub fn is_empty(&self) -> bool {
        self.request_set.is_empty()
            && self.request_remove.is_empty()
            && self.response_set.is_empty()
            && self.response_remove.is_empty()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
