//! Reverse-proxy API gateway library.

// Core subsystems
pub mod config;
pub mod dispatch;
pub mod http;
pub mod routing;

// Request handling around dispatch
pub mod fallback;
pub mod filters;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::GatewayConfig;
pub use http::{Gateway, HttpServer};
pub use lifecycle::Shutdown;
