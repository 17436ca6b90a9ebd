//! Rate limiting filter.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};

use crate::config::RateLimitConfig;
use crate::filters::{Filter, FilterContext};

/// Tracked clients before full buckets are evicted.
const DEFAULT_MAX_TRACKED: usize = 10_000;

/// A simple token bucket rate limiter.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    /// A bucket that has refilled to capacity holds no state worth keeping.
    fn is_full(&self, now: Instant, capacity: f64, refill_rate: f64) -> bool {
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens + elapsed * refill_rate >= capacity
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Per-client token bucket. Over-limit requests are answered with 429
/// without reaching the upstream.
#[derive(Debug)]
pub struct RateLimitFilter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    rps: f64,
    burst: f64,
    max_tracked: usize,
}

impl RateLimitFilter {
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            rps: requests_per_second as f64,
            burst: burst_size.max(1) as f64,
            max_tracked: DEFAULT_MAX_TRACKED,
        }
    }

    /// Evict idle clients once more than `max_tracked` are held.
    pub fn with_max_tracked(mut self, max_tracked: usize) -> Self {
        self.max_tracked = max_tracked;
        self
    }

    /// Number of clients with a bucket.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_second, config.burst_size)
    }

    fn check(&self, key: String) -> bool {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        if buckets.len() >= self.max_tracked && !buckets.contains_key(&key) {
            let now = Instant::now();
            buckets.retain(|_, bucket| !bucket.is_full(now, self.burst, self.rps));
        }
        let bucket = buckets
            .entry(key)
            .or_insert_with(|| TokenBucket::new(self.burst));
        bucket.try_acquire(self.burst, self.rps)
    }
}

impl Filter for RateLimitFilter {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn before(&self, ctx: &mut FilterContext, request: Request<Body>) -> Request<Body> {
        let key = ctx
            .client_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        if !self.check(key.clone()) {
            tracing::warn!(client = %key, route = %ctx.route().id(), "Rate limit exceeded");
            let mut response = Response::new(Body::from("Rate limit exceeded"));
            *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
            ctx.short_circuit(response);
        }
        request
    }
}
