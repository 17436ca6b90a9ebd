//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile the route table once so pattern and upstream errors surface at load
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect fallback endpoints shadowed by routes
//!
//! # Design Decisions
//! - Route table errors are returned as-is, they already name the route
//! - Everything else is collected and returned together

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::error::ConfigError;
use crate::config::schema::GatewayConfig;
use crate::filters::headers::parse_name;
use crate::routing::RouteTable;

/// Validate a configuration before it is accepted.
pub fn validate_config(config: &GatewayConfig) -> Result<(), ConfigError> {
    let table = RouteTable::load_with_default_timeout(&config.routes, config.default_route_timeout())?;

    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(format!(
            "listener.bind_address `{}` is not a socket address",
            config.listener.bind_address
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(format!(
            "observability.metrics_address `{}` is not a socket address",
            config.observability.metrics_address
        ));
    }

    if config.upstream.default_timeout_ms == 0 {
        errors.push("upstream.default_timeout_ms must be greater than 0".to_string());
    }

    if config.filters.rate_limit.enabled && config.filters.rate_limit.requests_per_second == 0 {
        errors.push("filters.rate_limit.requests_per_second must be greater than 0".to_string());
    }

    let fallback = &config.fallback;
    let mut endpoints = vec![fallback.generic_endpoint.as_str()];
    let mut groups = HashSet::new();
    for service in &fallback.services {
        if !groups.insert(service.group.as_str()) {
            errors.push(format!("fallback group `{}` is defined more than once", service.group));
        }
        if let Some(endpoint) = &service.endpoint {
            endpoints.push(endpoint);
        }
    }

    for endpoint in &endpoints {
        if !endpoint.starts_with('/') {
            errors.push(format!("fallback endpoint `{endpoint}` must start with '/'"));
        } else if fallback.expose_endpoints {
            if let Some(matched) = table.match_path(endpoint) {
                errors.push(format!(
                    "fallback endpoint `{endpoint}` shadows route `{}`",
                    matched.route.id()
                ));
            }
        }
    }

    let headers = &config.filters.headers;
    let names = headers
        .request_set
        .keys()
        .chain(headers.response_set.keys())
        .chain(headers.request_remove.iter())
        .chain(headers.response_remove.iter());
    for name in names {
        if let Err(e) = parse_name(name) {
            errors.push(e.to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors))
    }
}
