//! Request pipeline.
//!
//! # Responsibilities
//! - Resolve the route against the table snapshot taken at request start
//! - Run filter `before` hooks, dispatch, filter `after` hooks
//! - Substitute fallback responses for failures and unmatched paths
//! - Write exactly one access entry per request
//!
//! # Design Decisions
//! - Nothing on this path returns an error: every request ends in a response
//! - A reload never affects a request that already resolved its route

use std::sync::Arc;
use std::time::{Instant, SystemTime};

use axum::body::Body;
use axum::http::{HeaderValue, Request, Response};

use crate::config::validation::validate_config;
use crate::config::{ConfigError, GatewayConfig};
use crate::dispatch::{Dispatcher, PoolConfig};
use crate::fallback::{FallbackCause, FallbackHandler};
use crate::filters::{FilterChain, FilterContext, RequestStamp, X_REQUEST_ID};
use crate::observability::{metrics, AccessLogEntry, LogSink, Outcome};
use crate::routing::{RouteTable, RouteTableHandle};

/// The gateway engine: routes, filters, dispatcher, fallback, access log.
#[derive(Debug)]
pub struct Gateway {
    routes: RouteTableHandle,
    filters: FilterChain,
    dispatcher: Dispatcher,
    fallback: FallbackHandler,
    sink: Arc<dyn LogSink>,
}

impl Gateway {
    pub fn new(
        table: RouteTable,
        filters: FilterChain,
        dispatcher: Dispatcher,
        fallback: FallbackHandler,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            routes: RouteTableHandle::new(table),
            filters,
            dispatcher,
            fallback,
            sink,
        }
    }

    /// Validate `config` and assemble every component from it.
    pub fn from_config(config: &GatewayConfig, sink: Arc<dyn LogSink>) -> Result<Self, ConfigError> {
        validate_config(config)?;

        let table = RouteTable::load_with_default_timeout(&config.routes, config.default_route_timeout())?;
        let filters = FilterChain::from_config(&config.filters)?;
        let dispatcher = Dispatcher::new(PoolConfig::from(&config.upstream));
        let fallback = FallbackHandler::from_config(&config.fallback);

        tracing::info!(
            routes = table.len(),
            filters = ?filters.names(),
            "Gateway initialized"
        );

        Ok(Self::new(table, filters, dispatcher, fallback, sink))
    }

    pub fn routes(&self) -> &RouteTableHandle {
        &self.routes
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Replace the route table from a new configuration.
    ///
    /// Fallback endpoints are fixed at startup and answered before routing,
    /// so a table with a route behind one of them is rejected. On error the
    /// current table stays active.
    pub fn reload(&self, config: &GatewayConfig) -> Result<(), ConfigError> {
        let table = RouteTable::load_with_default_timeout(&config.routes, config.default_route_timeout())?;

        let shadowed: Vec<String> = self
            .fallback
            .endpoint_paths()
            .filter_map(|endpoint| {
                table.match_path(endpoint).map(|matched| {
                    format!("fallback endpoint `{endpoint}` shadows route `{}`", matched.route.id())
                })
            })
            .collect();
        if !shadowed.is_empty() {
            return Err(ConfigError::Validation(shadowed));
        }

        self.dispatcher.pool().retain(|authority| {
            table
                .routes()
                .iter()
                .any(|route| route.upstream().authority() == authority)
        });
        self.routes.replace(table);
        Ok(())
    }

    /// Serve one request.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let started = Instant::now();
        let received_at = SystemTime::now();
        let path = request.uri().path().to_string();

        if let Some(response) = self.fallback.endpoint(&path) {
            self.record(AccessLogEntry {
                request_id: None,
                method: request.method().to_string(),
                uri: request.uri().to_string(),
                route_id: None,
                upstream: None,
                status: response.status().as_u16(),
                outcome: Outcome::FallbackEndpoint,
                detail: None,
                received_at,
                elapsed: started.elapsed(),
            });
            return response;
        }

        let Some(matched) = self.routes.snapshot().match_path(&path) else {
            tracing::warn!(method = %request.method(), uri = %request.uri(), "No route matched");
            let response = self.fallback.handle(FallbackCause::NoRouteMatch);
            self.record(AccessLogEntry {
                request_id: None,
                method: request.method().to_string(),
                uri: request.uri().to_string(),
                route_id: None,
                upstream: None,
                status: response.status().as_u16(),
                outcome: Outcome::NoRoute,
                detail: None,
                received_at,
                elapsed: started.elapsed(),
            });
            return response;
        };

        let route = matched.route.clone();
        let mut ctx = FilterContext::new(matched, &request);

        let (request, entered) = self.filters.before(&mut ctx, request);
        let result = self.dispatcher.dispatch(&route, request, &mut ctx).await;
        let result = self.filters.after(&mut ctx, entered, result);

        let (response, outcome, detail) = match result {
            Ok(response) if ctx.is_short_circuited() => (response, Outcome::ShortCircuited, None),
            Ok(response) => (response, Outcome::Proxied, None),
            Err(failure) => {
                tracing::warn!(
                    route = %route.id(),
                    upstream = %route.upstream(),
                    kind = %failure.kind,
                    detail = %failure.detail,
                    "Dispatch failed, serving fallback"
                );
                let mut response = self.fallback.handle(FallbackCause::Failure {
                    failure: &failure,
                    group: route.group(),
                });
                if let Some(id) = ctx.request_id().and_then(|id| HeaderValue::from_str(id).ok()) {
                    response.headers_mut().insert(X_REQUEST_ID, id);
                }
                (response, Outcome::Fallback(failure.kind), Some(failure.detail))
            }
        };

        let (uri, received_at) = match ctx.extensions().get::<RequestStamp>() {
            Some(stamp) => (stamp.uri.to_string(), stamp.at),
            None => (ctx.uri().to_string(), ctx.received_at()),
        };
        self.record(AccessLogEntry {
            request_id: ctx.request_id().map(str::to_string),
            method: ctx.method().to_string(),
            uri,
            route_id: Some(route.id().to_string()),
            upstream: ctx.upstream().map(str::to_string),
            status: response.status().as_u16(),
            outcome,
            detail,
            received_at,
            elapsed: ctx.elapsed(),
        });

        response
    }

    fn record(&self, entry: AccessLogEntry) {
        metrics::record_request(
            entry.route_id.as_deref().unwrap_or("none"),
            entry.status,
            entry.outcome.as_str(),
            entry.elapsed,
        );
        self.sink.record(&entry);
    }
}
