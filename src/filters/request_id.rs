//! Request ID propagation.
//!
//! # Responsibilities
//! - Generate a UUID v4 `x-request-id` when the client sent none
//! - Forward it upstream and echo it on the response
//! - Make it available to the access log through the context

use axum::body::Body;
use axum::http::{HeaderValue, Request};
use uuid::Uuid;

use crate::dispatch::UpstreamResult;
use crate::filters::{Filter, FilterContext};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Default, Clone, Copy)]
pub struct RequestIdFilter;

impl Filter for RequestIdFilter {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn before(&self, ctx: &mut FilterContext, mut request: Request<Body>) -> Request<Body> {
        let existing = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let id = match existing {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                if let Ok(value) = HeaderValue::from_str(&id) {
                    request.headers_mut().insert(X_REQUEST_ID, value);
                }
                id
            }
        };
        ctx.set_request_id(id);
        request
    }

    fn after(&self, ctx: &mut FilterContext, result: UpstreamResult) -> UpstreamResult {
        let mut response = result?;
        if let Some(value) = ctx.request_id().and_then(|id| HeaderValue::from_str(id).ok()) {
            response.headers_mut().insert(X_REQUEST_ID, value);
        }
        Ok(response)
    }
}
