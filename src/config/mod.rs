//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, route table compile)
//!     → GatewayConfig (validated, immutable)
//!
//! On reload signal (file change or SIGHUP):
//!     watcher.rs loads and validates the file
//!     → Gateway::reload builds a new route table
//!     → atomic swap; in-flight requests keep their snapshot
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Invalid configs are rejected whole, the running table is never partially updated

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use error::ConfigError;
pub use loader::{load_config, parse_config};
pub use schema::{
    CorsConfig, FallbackConfig, FilterConfig, GatewayConfig, HeaderRewriteConfig, ListenerConfig,
    ObservabilityConfig, RateLimitConfig, RouteSpec, ServiceFallbackConfig, UpstreamConfig,
};
pub use watcher::ConfigWatcher;
