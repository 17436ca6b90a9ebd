//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Gateway pipeline produces:
//!     → sink.rs (one access entry per request, injected LogSink)
//! ```
//!
//! # Design Decisions
//! - Access logging goes through an injected sink, never a fixed stream
//! - Request ID flows from the filter context into the access entry
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
pub mod sink;

pub use sink::{AccessLogEntry, LogSink, MemorySink, Outcome, TracingSink};
