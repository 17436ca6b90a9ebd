//! Header manipulation filters.
//!
//! # Responsibilities
//! - Add X-Forwarded-For, X-Forwarded-Proto, X-Forwarded-Host
//! - Apply configured set/remove rewrites to requests and responses
//!
//! # Design Decisions
//! - Preserve the existing X-Forwarded-For chain and append the client IP
//! - Header names and values are validated at load, not per request

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request};

use crate::config::{ConfigError, HeaderRewriteConfig};
use crate::dispatch::UpstreamResult;
use crate::filters::{Filter, FilterContext};

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Adds `X-Forwarded-*` headers describing the original request.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForwardedHeadersFilter;

impl Filter for ForwardedHeadersFilter {
    fn name(&self) -> &'static str {
        "forwarded_headers"
    }

    fn before(&self, ctx: &mut FilterContext, mut request: Request<Body>) -> Request<Body> {
        let host = request.headers().get(header::HOST).cloned();
        let headers = request.headers_mut();

        if let Some(addr) = ctx.client_addr() {
            let client = addr.ip().to_string();
            let chain = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
                Some(existing) if !existing.trim().is_empty() => format!("{}, {}", existing, client),
                _ => client,
            };
            if let Ok(value) = HeaderValue::from_str(&chain) {
                headers.insert(X_FORWARDED_FOR, value);
            }
        }

        if let Some(host) = host {
            headers.insert(X_FORWARDED_HOST, host);
        }
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
        request
    }
}

/// Static header rewrites.
#[derive(Debug, Clone, Default)]
pub struct HeaderRewriteFilter {
    request_set: Vec<(HeaderName, HeaderValue)>,
    request_remove: Vec<HeaderName>,
    response_set: Vec<(HeaderName, HeaderValue)>,
    response_remove: Vec<HeaderName>,
}

impl HeaderRewriteFilter {
    pub fn from_config(config: &HeaderRewriteConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            request_set: parse_pairs(config.request_set.iter())?,
            request_remove: parse_names(&config.request_remove)?,
            response_set: parse_pairs(config.response_set.iter())?,
            response_remove: parse_names(&config.response_remove)?,
        })
    }
}

fn apply(headers: &mut HeaderMap, remove: &[HeaderName], set: &[(HeaderName, HeaderValue)]) {
    for name in remove {
        headers.remove(name);
    }
    for (name, value) in set {
        headers.insert(name.clone(), value.clone());
    }
}

impl Filter for HeaderRewriteFilter {
    fn name(&self) -> &'static str {
        "header_rewrite"
    }

    fn before(&self, _ctx: &mut FilterContext, mut request: Request<Body>) -> Request<Body> {
        apply(request.headers_mut(), &self.request_remove, &self.request_set);
        request
    }

    fn after(&self, _ctx: &mut FilterContext, result: UpstreamResult) -> UpstreamResult {
        let mut response = result?;
        apply(response.headers_mut(), &self.response_remove, &self.response_set);
        Ok(response)
    }
}

pub(crate) fn parse_name(name: &str) -> Result<HeaderName, ConfigError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn parse_names(names: &[String]) -> Result<Vec<HeaderName>, ConfigError> {
    names.iter().map(|n| parse_name(n)).collect()
}

fn parse_pairs<'a>(
    pairs: impl Iterator<Item = (&'a String, &'a String)>,
) -> Result<Vec<(HeaderName, HeaderValue)>, ConfigError> {
    pairs
        .map(|(name, value)| {
            let value = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            Ok((parse_name(name)?, value))
        })
        .collect()
}
