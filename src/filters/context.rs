//! Per-request filter state.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Extensions, Method, Request, Response, Uri};

use crate::routing::{PathParams, Route, RouteMatch};

/// Scratch state shared by every filter for a single request.
///
/// Created when the route is resolved, dropped once the response has been
/// produced. Never shared between requests.
#[derive(Debug)]
pub struct FilterContext {
    route: Arc<Route>,
    params: PathParams,
    method: Method,
    uri: Uri,
    client_addr: Option<SocketAddr>,
    started: Instant,
    received_at: SystemTime,
    request_id: Option<String>,
    upstream: Option<String>,
    connection_reused: Option<bool>,
    short_circuit: Option<Response<Body>>,
    short_circuited: bool,
    extensions: Extensions,
}

impl FilterContext {
    pub fn new(matched: RouteMatch, request: &Request<Body>) -> Self {
        let client_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            route: matched.route,
            params: matched.params,
            method: request.method().clone(),
            uri: request.uri().clone(),
            client_addr,
            started: Instant::now(),
            received_at: SystemTime::now(),
            request_id: None,
            upstream: None,
            connection_reused: None,
            short_circuit: None,
            short_circuited: false,
            extensions: Extensions::new(),
        }
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    /// Values captured from `{name}` segments of the route pattern.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI as received, before any filter rewrites.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn client_addr(&self) -> Option<SocketAddr> {
        self.client_addr
    }

    pub fn received_at(&self) -> SystemTime {
        self.received_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn set_request_id(&mut self, id: impl Into<String>) {
        self.request_id = Some(id.into());
    }

    /// Upstream the dispatcher forwarded to, if dispatch got that far.
    pub fn upstream(&self) -> Option<&str> {
        self.upstream.as_deref()
    }

    pub fn connection_reused(&self) -> Option<bool> {
        self.connection_reused
    }

    pub(crate) fn record_upstream(&mut self, upstream: String, reused: bool) {
        self.upstream = Some(upstream);
        self.connection_reused = Some(reused);
    }

    /// Answer the request with `response` instead of dispatching upstream.
    ///
    /// Remaining `before` hooks are skipped; `after` hooks of the filters that
    /// already ran still see the response.
    pub fn short_circuit(&mut self, response: Response<Body>) {
        self.short_circuit = Some(response);
        self.short_circuited = true;
    }

    /// True once a filter has short-circuited, even after the response was taken.
    pub fn is_short_circuited(&self) -> bool {
        self.short_circuited
    }

    pub(crate) fn take_short_circuit(&mut self) -> Option<Response<Body>> {
        self.short_circuit.take()
    }

    /// Typed scratch values for filters to hand data from `before` to `after`.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}
