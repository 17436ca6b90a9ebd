//! Forwarding a request to its route's upstream.
//!
//! # Responsibilities
//! - Check out a pooled connection (or open one)
//! - Rewrite the request into origin form for the upstream
//! - Enforce the route timeout up to the response head
//! - Stream the response body back without buffering
//!
//! # Design Decisions
//! - Any upstream response is a success, whatever its status
//! - Hop-by-hop headers are connection-scoped and never forwarded
//! - No retries: a failure is reported once. A request a closed pooled
//!   connection hands back unsent goes out on a new connection

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Request, Response, Uri, Version};
use hyper::body::Body as _;

use crate::dispatch::body::PooledBody;
use crate::dispatch::failure::{Failure, UpstreamResult};
use crate::dispatch::pool::{ConnectionPool, PoolConfig, PooledConnection, SendError};
use crate::filters::FilterContext;
use crate::observability::metrics;
use crate::routing::{Route, Upstream};

/// Headers that describe a single connection rather than the message.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Sends requests upstream over pooled connections.
#[derive(Debug)]
pub struct Dispatcher {
    pool: ConnectionPool,
}

impl Dispatcher {
    pub fn new(pool_config: PoolConfig) -> Self {
        Self {
            pool: ConnectionPool::new(pool_config),
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Forward `request` to `route`'s upstream.
    ///
    /// Returns the short-circuit response instead when a filter set one.
    pub async fn dispatch(
        &self,
        route: &Route,
        request: Request<Body>,
        ctx: &mut FilterContext,
    ) -> UpstreamResult {
        if let Some(response) = ctx.take_short_circuit() {
            tracing::debug!(route = %route.id(), status = %response.status(), "Dispatch skipped by filter");
            return Ok(response);
        }

        let outbound = prepare_outbound(route.upstream(), request)?;
        let timeout = route.timeout();

        match tokio::time::timeout(timeout, self.forward(route.upstream(), outbound, ctx)).await {
            Ok(result) => result,
            // The forward future is dropped here, discarding its connection.
            Err(_) => Err(Failure::timeout(timeout)),
        }
    }

    async fn forward(
        &self,
        upstream: &Upstream,
        request: Request<Body>,
        ctx: &mut FilterContext,
    ) -> UpstreamResult {
        let mut request = request;
        let (mut connection, response) = loop {
            let mut connection = self.checkout(upstream).await?;
            ctx.record_upstream(upstream.to_string(), connection.is_reused());
            metrics::record_upstream_connection(upstream.authority(), connection.is_reused());

            match connection.send(request).await {
                Ok(response) => break (connection, response),
                // Nothing reached the upstream: the idle connection was already
                // closed by the peer. Sending on a new one is not a retry.
                Err(SendError {
                    failure,
                    unsent: Some(unsent),
                }) if connection.is_reused() => {
                    tracing::debug!(upstream = %upstream, error = %failure, "Pooled connection closed before send, reconnecting");
                    request = unsent;
                }
                Err(e) => return Err(e.failure),
            }
        };
        let (mut parts, incoming) = response.into_parts();

        if !keeps_alive(parts.version, &parts.headers) {
            connection.mark_not_reusable();
        }
        strip_hop_by_hop(&mut parts.headers);

        let body = if incoming.is_end_stream() {
            connection.release();
            Body::new(incoming)
        } else {
            Body::new(PooledBody::new(incoming, connection))
        };
        Ok(Response::from_parts(parts, body))
    }

    /// Acquire a ready connection. Idle connections that turn out to be
    /// closed are dropped and replaced.
    async fn checkout(&self, upstream: &Upstream) -> Result<PooledConnection, Failure> {
        loop {
            let mut connection = self.pool.acquire(upstream).await?;
            match connection.ready().await {
                Ok(()) => return Ok(connection),
                Err(e) if connection.is_reused() => {
                    tracing::debug!(upstream = %upstream, error = %e, "Discarding stale pooled connection");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Turn an inbound request into an origin-form request for `upstream`.
fn prepare_outbound(upstream: &Upstream, request: Request<Body>) -> Result<Request<Body>, Failure> {
    let (mut parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    parts.uri = Uri::try_from(path_and_query)
        .map_err(|e| Failure::transport(format!("invalid request target: {}", e)))?;
    parts.version = Version::HTTP_11;

    strip_hop_by_hop(&mut parts.headers);
    parts
        .headers
        .insert(header::HOST, upstream.host_header().clone());

    Ok(Request::from_parts(parts, body))
}

fn connection_tokens(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn keeps_alive(version: Version, headers: &HeaderMap) -> bool {
    let tokens = connection_tokens(headers);
    if tokens.iter().any(|t| t == "close") {
        return false;
    }
    version != Version::HTTP_10 || tokens.iter().any(|t| t == "keep-alive")
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub(crate) fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for token in connection_tokens(headers) {
        if let Ok(name) = HeaderName::from_bytes(token.as_bytes()) {
            headers.remove(name);
        }
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}
