//! Upstream dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Matched route + filtered request
//!     → dispatcher.rs (short-circuit check, origin-form rewrite)
//!     → pool.rs (idle connection or new TCP + HTTP/1.1 handshake)
//!     → send, bounded by the route timeout up to the response head
//!     → body.rs (stream body, release connection on clean end)
//!     → UpstreamResult: Response or Failure{Timeout|Unreachable|Transport}
//! ```
//!
//! # Design Decisions
//! - Connectivity problems are failures; HTTP error statuses are not
//! - Timed-out or failed connections never re-enter the idle pool
//! - Retry policy belongs to filters, not to the dispatcher

pub mod body;
pub mod dispatcher;
pub mod failure;
pub mod pool;

pub use dispatcher::Dispatcher;
pub use failure::{Failure, FailureKind, UpstreamResult};
pub use pool::{ConnectionPool, PoolConfig, PooledConnection, SendError};
