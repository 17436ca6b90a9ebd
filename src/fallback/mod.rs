//! Fallback subsystem.
//!
//! # Data Flow
//! ```text
//! Failure{Timeout}      → 504 + generic or service body
//! Failure{Unreachable}  → 503 + generic or service body
//! Failure{Transport}    → 502 + generic or service body
//! NoRouteMatch          → 404 + not-found body (never a fallback body)
//! ```
//!
//! # Design Decisions
//! - Bodies are fixed per category; failure detail goes to logs, not clients
//! - Service bodies are keyed by the failed route's group tag

pub mod handler;

pub use handler::{FallbackCause, FallbackHandler, X_GATEWAY_FAILURE};
