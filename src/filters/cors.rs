//! Cross-origin resource sharing.
//!
//! Preflight requests are answered by the gateway itself through a
//! short-circuit. Actual requests are forwarded and the allow-origin header is
//! added to the upstream response on the way out.

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Request, Response, StatusCode};

use crate::config::{ConfigError, CorsConfig};
use crate::dispatch::UpstreamResult;
use crate::filters::{Filter, FilterContext};

/// Origin allowed for the current request, handed from `before` to `after`.
#[derive(Debug, Clone)]
struct AllowedOrigin(HeaderValue);

#[derive(Debug, Clone)]
pub struct CorsFilter {
    any_origin: bool,
    origins: Vec<HeaderValue>,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    max_age: HeaderValue,
}

impl CorsFilter {
    pub fn from_config(config: &CorsConfig) -> Result<Self, ConfigError> {
        let invalid = |name: &str, reason: String| ConfigError::InvalidHeader {
            name: name.to_string(),
            reason,
        };

        let any_origin = config.allow_origins.iter().any(|o| o == "*");
        let origins = config
            .allow_origins
            .iter()
            .filter(|o| o.as_str() != "*")
            .map(|o| HeaderValue::from_str(o).map_err(|e| invalid("access-control-allow-origin", e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        let allow_methods = HeaderValue::from_str(&config.allow_methods.join(", "))
            .map_err(|e| invalid("access-control-allow-methods", e.to_string()))?;
        let allow_headers = HeaderValue::from_str(&config.allow_headers.join(", "))
            .map_err(|e| invalid("access-control-allow-headers", e.to_string()))?;

        Ok(Self {
            any_origin,
            origins,
            allow_methods,
            allow_headers,
            max_age: HeaderValue::from(config.max_age_secs),
        })
    }

    fn allowed(&self, origin: &HeaderValue) -> Option<HeaderValue> {
        if self.any_origin {
            Some(HeaderValue::from_static("*"))
        } else if self.origins.contains(origin) {
            Some(origin.clone())
        } else {
            None
        }
    }

    fn preflight(&self, origin: HeaderValue) -> Response<Body> {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
        response
    }
}

impl Filter for CorsFilter {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn before(&self, ctx: &mut FilterContext, request: Request<Body>) -> Request<Body> {
        let Some(allowed) = request
            .headers()
            .get(header::ORIGIN)
            .and_then(|origin| self.allowed(origin))
        else {
            return request;
        };

        let is_preflight = request.method() == Method::OPTIONS
            && request
                .headers()
                .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);

        if is_preflight {
            ctx.short_circuit(self.preflight(allowed));
        } else {
            ctx.extensions_mut().insert(AllowedOrigin(allowed));
        }
        request
    }

    fn after(&self, ctx: &mut FilterContext, result: UpstreamResult) -> UpstreamResult {
        let mut response = result?;
        if let Some(AllowedOrigin(origin)) = ctx.extensions_mut().remove::<AllowedOrigin>() {
            response
                .headers_mut()
                .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        }
        Ok(response)
    }
}
