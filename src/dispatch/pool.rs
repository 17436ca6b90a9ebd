//! Upstream connection pool.
//!
//! # Responsibilities
//! - Keep idle HTTP/1.1 connections per upstream
//! - Hand out a connection exclusively to one request at a time
//! - Return connections only after their response completed cleanly
//!
//! # Design Decisions
//! - One pool per upstream authority in a sharded map, so different
//!   upstreams never contend on the same lock
//! - The per-upstream lock is held only to push/pop, never across an await
//! - A connection guard that is dropped without `release` (timeout,
//!   cancellation, body error) is discarded as broken

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, Response};
use dashmap::DashMap;
use hyper::body::Incoming;
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use crate::config::UpstreamConfig;
use crate::dispatch::failure::Failure;
use crate::routing::Upstream;

/// Pool sizing and expiry.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_idle_per_upstream: usize,
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from(&UpstreamConfig::default())
    }
}

impl From<&UpstreamConfig> for PoolConfig {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            max_idle_per_upstream: config.max_idle_per_upstream,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        }
    }
}

/// Idle connections for every upstream the gateway has talked to.
#[derive(Debug)]
pub struct ConnectionPool {
    upstreams: DashMap<String, Arc<UpstreamPool>>,
    config: PoolConfig,
}

impl ConnectionPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            upstreams: DashMap::new(),
            config,
        }
    }

    /// Take an idle connection to `upstream`, or open a new one.
    pub async fn acquire(&self, upstream: &Upstream) -> Result<PooledConnection, Failure> {
        let pool = self.upstream_pool(upstream);

        if let Some(sender) = pool.take_idle() {
            tracing::trace!(upstream = %upstream, "Reusing pooled connection");
            return Ok(PooledConnection::new(sender, pool, true));
        }

        let sender = connect(upstream).await?;
        tracing::trace!(upstream = %upstream, "Opened upstream connection");
        Ok(PooledConnection::new(sender, pool, false))
    }

    /// Number of idle connections currently held for `upstream`.
    pub fn idle_count(&self, upstream: &Upstream) -> usize {
        self.upstreams
            .get(upstream.authority())
            .map(|pool| pool.idle_len())
            .unwrap_or(0)
    }

    /// Drop the idle connections of every upstream for which `keep` is false.
    ///
    /// Connections checked out at the time finish their exchange and are then closed.
    pub fn retain(&self, mut keep: impl FnMut(&str) -> bool) {
        self.upstreams.retain(|authority, _| {
            let kept = keep(authority);
            if !kept {
                tracing::debug!(upstream = %authority, "Dropping pool of removed upstream");
            }
            kept
        });
    }

    fn upstream_pool(&self, upstream: &Upstream) -> Arc<UpstreamPool> {
        if let Some(pool) = self.upstreams.get(upstream.authority()) {
            return pool.value().clone();
        }
        let max_idle = self.config.max_idle_per_upstream;
        let idle_timeout = self.config.idle_timeout;
        self.upstreams
            .entry(upstream.authority().to_string())
            .or_insert_with(|| Arc::new(UpstreamPool::new(max_idle, idle_timeout)))
            .value()
            .clone()
    }
}

#[derive(Debug)]
struct IdleConnection {
    sender: SendRequest<Body>,
    idle_since: Instant,
}

impl IdleConnection {
    fn is_usable(&self, idle_timeout: Duration) -> bool {
        !self.sender.is_closed() && self.idle_since.elapsed() < idle_timeout
    }
}

#[derive(Debug)]
struct UpstreamPool {
    idle: Mutex<Vec<IdleConnection>>,
    max_idle: usize,
    idle_timeout: Duration,
}

impl UpstreamPool {
    fn new(max_idle: usize, idle_timeout: Duration) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
            idle_timeout,
        }
    }

    fn take_idle(&self) -> Option<SendRequest<Body>> {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(conn) = idle.pop() {
            if conn.is_usable(self.idle_timeout) {
                return Some(conn.sender);
            }
        }
        None
    }

    fn put_idle(&self, sender: SendRequest<Body>) -> bool {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        // Entries below the top of the stack are never popped under light load.
        idle.retain(|conn| conn.is_usable(self.idle_timeout));
        if idle.len() >= self.max_idle {
            return false;
        }
        idle.push(IdleConnection {
            sender,
            idle_since: Instant::now(),
        });
        true
    }

    fn idle_len(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// A failed send. `unsent` holds the request when nothing of it reached the upstream.
#[derive(Debug)]
pub struct SendError {
    pub failure: Failure,
    pub unsent: Option<Request<Body>>,
}

/// A connection checked out of the pool.
///
/// Dropping the guard discards the connection unless [`release`](Self::release)
/// was called first.
#[derive(Debug)]
pub struct PooledConnection {
    sender: Option<SendRequest<Body>>,
    pool: Arc<UpstreamPool>,
    reused: bool,
    reusable: bool,
    healthy: bool,
}

impl PooledConnection {
    fn new(sender: SendRequest<Body>, pool: Arc<UpstreamPool>, reused: bool) -> Self {
        Self {
            sender: Some(sender),
            pool,
            reused,
            reusable: true,
            healthy: false,
        }
    }

    /// True when the connection came from the idle pool.
    pub fn is_reused(&self) -> bool {
        self.reused
    }

    /// Wait until the connection can accept a request.
    pub async fn ready(&mut self) -> Result<(), Failure> {
        let sender = self
            .sender
            .as_mut()
            .ok_or_else(|| Failure::transport("connection already released"))?;
        sender
            .ready()
            .await
            .map_err(|e| Failure::transport(format!("upstream connection closed: {}", e)))
    }

    /// Send the request and wait for the response head.
    ///
    /// When the connection turns out to be closed before any of the request
    /// was written, the request is handed back in the error.
    pub async fn send(&mut self, request: Request<Body>) -> Result<Response<Incoming>, SendError> {
        let Some(sender) = self.sender.as_mut() else {
            return Err(SendError {
                failure: Failure::transport("connection already released"),
                unsent: Some(request),
            });
        };
        sender.try_send_request(request).await.map_err(|mut e| {
            let unsent = e.take_message();
            SendError {
                failure: Failure::transport(format!("upstream request failed: {}", e.error())),
                unsent,
            }
        })
    }

    /// The upstream asked to close the connection after this exchange.
    pub fn mark_not_reusable(&mut self) {
        self.reusable = false;
    }

    /// The exchange completed cleanly; hand the connection back.
    pub fn release(mut self) {
        self.healthy = true;
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(sender) = self.sender.take() else {
            return;
        };
        if self.healthy && self.reusable && !sender.is_closed() && self.pool.put_idle(sender) {
            tracing::trace!("Connection returned to pool");
        } else {
            tracing::trace!(healthy = self.healthy, "Connection discarded");
        }
    }
}

async fn connect(upstream: &Upstream) -> Result<SendRequest<Body>, Failure> {
    let authority = upstream.authority();

    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(authority)
        .await
        .map_err(|e| Failure::unreachable(format!("failed to resolve {}: {}", authority, e)))?
        .collect();
    if addrs.is_empty() {
        return Err(Failure::unreachable(format!("no addresses for {}", authority)));
    }

    let stream = TcpStream::connect(&addrs[..])
        .await
        .map_err(|e| Failure::from_connect_error(authority, &e))?;
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(upstream = %authority, error = %e, "Failed to set TCP_NODELAY");
    }

    let (sender, connection) = http1::handshake::<_, Body>(TokioIo::new(stream))
        .await
        .map_err(|e| Failure::transport(format!("handshake with {} failed: {}", authority, e)))?;

    let authority = authority.to_string();
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::debug!(upstream = %authority, error = %e, "Upstream connection closed with error");
        }
    });

    Ok(sender)
}
