//! Per-request access log.
//!
//! The gateway writes exactly one [`AccessLogEntry`] per request through an
//! injected [`LogSink`]. Production uses [`TracingSink`]; tests inject a
//! [`MemorySink`] and assert on what was recorded.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use crate::dispatch::FailureKind;

/// How a request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Upstream responded (any status).
    Proxied,
    /// A filter answered without dispatching.
    ShortCircuited,
    /// Dispatch failed and a fallback body was served.
    Fallback(FailureKind),
    /// No route matched the path.
    NoRoute,
    /// A fallback endpoint was requested directly.
    FallbackEndpoint,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Proxied => "proxied",
            Outcome::ShortCircuited => "short_circuited",
            Outcome::Fallback(FailureKind::Timeout) => "fallback_timeout",
            Outcome::Fallback(FailureKind::Unreachable) => "fallback_unreachable",
            Outcome::Fallback(FailureKind::Transport) => "fallback_transport",
            Outcome::NoRoute => "no_route",
            Outcome::FallbackEndpoint => "fallback_endpoint",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the access log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessLogEntry {
    pub request_id: Option<String>,
    pub method: String,
    /// Request URI as received by the gateway.
    pub uri: String,
    pub route_id: Option<String>,
    /// Upstream the request was forwarded to, if dispatch started.
    pub upstream: Option<String>,
    pub status: u16,
    pub outcome: Outcome,
    /// Failure detail for fallback outcomes.
    pub detail: Option<String>,
    pub received_at: SystemTime,
    pub elapsed: Duration,
}

/// Destination for access log entries.
pub trait LogSink: Send + Sync + fmt::Debug {
    fn record(&self, entry: &AccessLogEntry);
}

/// Writes entries as `tracing` events under the `access` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, entry: &AccessLogEntry) {
        tracing::info!(
            target: "api_gateway::access",
            request_id = entry.request_id.as_deref().unwrap_or("-"),
            method = %entry.method,
            uri = %entry.uri,
            route = entry.route_id.as_deref().unwrap_or("-"),
            upstream = entry.upstream.as_deref().unwrap_or("-"),
            status = entry.status,
            outcome = %entry.outcome,
            detail = entry.detail.as_deref().unwrap_or(""),
            elapsed_ms = entry.elapsed.as_millis() as u64,
            "Incoming request"
        );
    }
}

/// Keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<AccessLogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AccessLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for MemorySink {
    fn record(&self, entry: &AccessLogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
    }
}
