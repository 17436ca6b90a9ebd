//! Filter chain subsystem.
//!
//! # Data Flow
//! ```text
//! Matched request
//!     → before hooks, in list order      (request_id → logging → cors → ...)
//!     → dispatcher (skipped if a filter short-circuited)
//!     → after hooks, in reverse order    (... → cors → logging → request_id)
//! ```
//!
//! # Design Decisions
//! - Onion model: the first filter in is the last filter out
//! - Hooks are total; a filter rejects a request by short-circuiting the
//!   context, not by returning an error
//! - Only filters whose `before` ran get their `after` called

pub mod context;
pub mod cors;
pub mod headers;
pub mod logging;
pub mod rate_limit;
pub mod request_id;

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;

use crate::config::{ConfigError, FilterConfig};
use crate::dispatch::UpstreamResult;

pub use context::FilterContext;
pub use cors::CorsFilter;
pub use headers::{ForwardedHeadersFilter, HeaderRewriteFilter};
pub use logging::{LoggingFilter, RequestStamp};
pub use rate_limit::RateLimitFilter;
pub use request_id::{RequestIdFilter, X_REQUEST_ID};

/// A cross-cutting hook run around dispatch.
pub trait Filter: Send + Sync + std::fmt::Debug {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Runs before dispatch, in chain order.
    fn before(&self, _ctx: &mut FilterContext, request: Request<Body>) -> Request<Body> {
        request
    }

    /// Runs after dispatch, in reverse chain order.
    fn after(&self, _ctx: &mut FilterContext, result: UpstreamResult) -> UpstreamResult {
        result
    }
}

/// Ordered list of filters.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn Filter>>,
}

/// Number of filters whose `before` hook ran; pass it back to [`FilterChain::after`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entered(usize);

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn push(&mut self, filter: Arc<dyn Filter>) {
        self.filters.push(filter);
    }

    /// Build the standard chain from configuration.
    ///
    /// Order: request id, logging, CORS, rate limit, forwarded headers,
    /// header rewrite. Disabled filters are left out.
    pub fn from_config(config: &FilterConfig) -> Result<Self, ConfigError> {
        let mut chain = FilterChain::new();

        if config.request_id {
            chain = chain.with(RequestIdFilter);
        }
        chain = chain.with(LoggingFilter);
        if config.cors.enabled {
            chain = chain.with(CorsFilter::from_config(&config.cors)?);
        }
        if config.rate_limit.enabled {
            chain = chain.with(RateLimitFilter::from_config(&config.rate_limit));
        }
        if config.forwarded_headers {
            chain = chain.with(ForwardedHeadersFilter);
        }
        if !config.headers.is_empty() {
            chain = chain.with(HeaderRewriteFilter::from_config(&config.headers)?);
        }

        Ok(chain)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run `before` hooks in order, stopping after a short-circuit.
    pub fn before(&self, ctx: &mut FilterContext, mut request: Request<Body>) -> (Request<Body>, Entered) {
        for (i, filter) in self.filters.iter().enumerate() {
            request = filter.before(ctx, request);
            if ctx.is_short_circuited() {
                tracing::debug!(filter = filter.name(), route = %ctx.route().id(), "Request short-circuited");
                return (request, Entered(i + 1));
            }
        }
        (request, Entered(self.filters.len()))
    }

    /// Run `after` hooks of entered filters in reverse order.
    pub fn after(&self, ctx: &mut FilterContext, entered: Entered, mut result: UpstreamResult) -> UpstreamResult {
        for filter in self.filters[..entered.0].iter().rev() {
            result = filter.after(ctx, result);
        }
        result
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::http::{Response, StatusCode};

    use super::test_support::{context_for, request};
    use super::*;

    #[derive(Debug)]
    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        short_circuit: bool,
    }

    impl Filter for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn before(&self, ctx: &mut FilterContext, request: Request<Body>) -> Request<Body> {
            self.log.lock().unwrap().push(format!("before:{}", self.name));
            if self.short_circuit {
                ctx.short_circuit(
                    Response::builder()
                        .status(StatusCode::FORBIDDEN)
                        .body(Body::empty())
                        .unwrap(),
                );
            }
            request
        }

        fn after(&self, _ctx: &mut FilterContext, result: UpstreamResult) -> UpstreamResult {
            self.log.lock().unwrap().push(format!("after:{}", self.name));
            result
        }
    }

    fn chain(log: &Arc<Mutex<Vec<String>>>, short_at: Option<&'static str>) -> FilterChain {
        ["a", "b", "c"].into_iter().fold(FilterChain::new(), |chain, name| {
            chain.with(Recording {
                name,
                log: log.clone(),
                short_circuit: short_at == Some(name),
            })
        })
    }

    #[test]
    fn onion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain(&log, None);
        let req = request("/x");
        let mut ctx = context_for(&req);

        let (_req, entered) = chain.before(&mut ctx, req);
        assert_eq!(entered, Entered(3));
        let result = chain.after(&mut ctx, entered, Ok(Response::new(Body::empty())));
        assert!(result.is_ok());

        assert_eq!(
            *log.lock().unwrap(),
            vec!["before:a", "before:b", "before:c", "after:c", "after:b", "after:a"]
        );
    }

    #[test]
    fn short_circuit_skips_remaining_before_hooks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain(&log, Some("b"));
        let req = request("/x");
        let mut ctx = context_for(&req);

        let (_req, entered) = chain.before(&mut ctx, req);
        assert!(ctx.is_short_circuited());
        assert_eq!(entered, Entered(2));

        let response = ctx.take_short_circuit().unwrap();
        let result = chain.after(&mut ctx, entered, Ok(response));
        assert_eq!(result.unwrap().status(), StatusCode::FORBIDDEN);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["before:a", "before:b", "after:b", "after:a"]
        );
    }

    #[test]
    fn default_config_chain() {
        let chain = FilterChain::from_config(&FilterConfig::default()).unwrap();
        assert_eq!(chain.names(), vec!["request_id", "logging", "forwarded_headers"]);
    }

    #[test]
    fn full_config_chain_order() {
        let mut config = FilterConfig::default();
        config.cors.enabled = true;
        config.rate_limit.enabled = true;
        config
            .headers
            .request_set
            .insert("x-gateway".into(), "api-gateway".into());

        let chain = FilterChain::from_config(&config).unwrap();
        assert_eq!(
            chain.names(),
            vec![
                "request_id",
                "logging",
                "cors",
                "rate_limit",
                "forwarded_headers",
                "header_rewrite"
            ]
        );
    }
}
