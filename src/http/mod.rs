//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all route, trace layer)
//!     → gateway.rs (match → filters → dispatch → filters → fallback)
//!     → Send to client
//! ```

pub mod gateway;
pub mod server;

pub use gateway::Gateway;
pub use server::HttpServer;
