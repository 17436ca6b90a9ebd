//! Request logging filter.

use std::time::SystemTime;

use axum::body::Body;
use axum::http::{Request, Uri};

use crate::filters::{Filter, FilterContext};

/// What the logging filter saw when the request entered the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestStamp {
    pub uri: Uri,
    pub at: SystemTime,
}

/// Records the request URI and arrival time into the context.
///
/// The gateway reads the stamp back when it writes the access entry, so the
/// logged URI is the one that entered the chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingFilter;

impl Filter for LoggingFilter {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn before(&self, ctx: &mut FilterContext, request: Request<Body>) -> Request<Body> {
        tracing::debug!(
            route = %ctx.route().id(),
            method = %request.method(),
            uri = %request.uri(),
            "Request entered filter chain"
        );
        ctx.extensions_mut().insert(RequestStamp {
            uri: request.uri().clone(),
            at: SystemTime::now(),
        });
        request
    }
}
