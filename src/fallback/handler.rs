//! Degraded responses for failed dispatches and unmatched paths.

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};

use crate::config::FallbackConfig;
use crate::dispatch::{Failure, FailureKind};

/// Header naming the failure category on fallback responses.
pub const X_GATEWAY_FAILURE: &str = "x-gateway-failure";

/// Why a fallback response is being produced.
#[derive(Debug, Clone, Copy)]
pub enum FallbackCause<'a> {
    /// Dispatch failed for a route, optionally tagged with a backend group.
    Failure {
        failure: &'a Failure,
        group: Option<&'a str>,
    },
    /// No route matched the request path.
    NoRouteMatch,
}

/// Maps failures to fixed plain-text responses.
#[derive(Debug, Clone)]
pub struct FallbackHandler {
    generic_body: String,
    not_found_body: String,
    services: HashMap<String, String>,
    /// Endpoint path -> body, served with 200 when enabled.
    endpoints: HashMap<String, String>,
}

impl FallbackHandler {
    pub fn from_config(config: &FallbackConfig) -> Self {
        let services = config
            .services
            .iter()
            .map(|s| (s.group.clone(), s.body.clone()))
            .collect();

        let mut endpoints = HashMap::new();
        if config.expose_endpoints {
            endpoints.insert(config.generic_endpoint.clone(), config.generic_body.clone());
            for service in &config.services {
                if let Some(endpoint) = &service.endpoint {
                    endpoints.insert(endpoint.clone(), service.body.clone());
                }
            }
        }

        Self {
            generic_body: config.generic_body.clone(),
            not_found_body: config.not_found_body.clone(),
            services,
            endpoints,
        }
    }

    /// Status used for each failure category.
    pub fn status_for(kind: FailureKind) -> StatusCode {
        match kind {
            FailureKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            FailureKind::Unreachable => StatusCode::SERVICE_UNAVAILABLE,
            FailureKind::Transport => StatusCode::BAD_GATEWAY,
        }
    }

    /// Build the degraded response for `cause`.
    pub fn handle(&self, cause: FallbackCause<'_>) -> Response<Body> {
        match cause {
            FallbackCause::NoRouteMatch => {
                text_response(StatusCode::NOT_FOUND, self.not_found_body.clone())
            }
            FallbackCause::Failure { failure, group } => {
                let body = group
                    .and_then(|g| self.services.get(g))
                    .unwrap_or(&self.generic_body)
                    .clone();
                let mut response = text_response(Self::status_for(failure.kind), body);
                response.headers_mut().insert(
                    X_GATEWAY_FAILURE,
                    HeaderValue::from_static(failure.kind.as_str()),
                );
                response
            }
        }
    }

    /// Response for a directly requested fallback endpoint, if `path` is one.
    pub fn endpoint(&self, path: &str) -> Option<Response<Body>> {
        self.endpoints
            .get(path)
            .map(|body| text_response(StatusCode::OK, body.clone()))
    }

    pub fn endpoint_paths(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }
}

fn text_response(status: StatusCode, body: String) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceFallbackConfig;

    fn handler(expose: bool) -> FallbackHandler {
        FallbackHandler::from_config(&FallbackConfig {
            expose_endpoints: expose,
            services: vec![ServiceFallbackConfig {
                group: "documents".into(),
                body: "Document service fallback".into(),
                endpoint: Some("/fallback/documentServiceFallback".into()),
            }],
            ..FallbackConfig::default()
        })
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn generic_body_per_failure_kind() {
        let handler = handler(false);
        for (failure, status) in [
            (Failure::timeout(std::time::Duration::from_secs(1)), StatusCode::GATEWAY_TIMEOUT),
            (Failure::unreachable("refused"), StatusCode::SERVICE_UNAVAILABLE),
            (Failure::transport("reset"), StatusCode::BAD_GATEWAY),
        ] {
            let response = handler.handle(FallbackCause::Failure {
                failure: &failure,
                group: None,
            });
            assert_eq!(response.status(), status);
            assert_eq!(response.headers()[X_GATEWAY_FAILURE], failure.kind.as_str());
            assert_eq!(body_text(response).await, "Generic fallback");
        }
    }

    #[tokio::test]
    async fn service_body_for_tagged_group() {
        let handler = handler(false);
        let failure = Failure::unreachable("refused");

        let response = handler.handle(FallbackCause::Failure {
            failure: &failure,
            group: Some("documents"),
        });
        assert_eq!(body_text(response).await, "Document service fallback");

        // Unknown groups fall back to the generic body.
        let response = handler.handle(FallbackCause::Failure {
            failure: &failure,
            group: Some("labels"),
        });
        assert_eq!(body_text(response).await, "Generic fallback");
    }

    #[tokio::test]
    async fn no_route_is_not_found() {
        let response = handler(false).handle(FallbackCause::NoRouteMatch);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(X_GATEWAY_FAILURE).is_none());
        let body = body_text(response).await;
        assert_ne!(body, "Generic fallback");
        assert_ne!(body, "Document service fallback");
    }

    #[tokio::test]
    async fn endpoints_only_when_exposed() {
        assert!(handler(false).endpoint("/fallback").is_none());

        let handler = handler(true);
        let response = handler.endpoint("/fallback").unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Generic fallback");

        let response = handler.endpoint("/fallback/documentServiceFallback").unwrap();
        assert_eq!(body_text(response).await, "Document service fallback");
        assert!(handler.endpoint("/fallback/other").is_none());
    }
}
