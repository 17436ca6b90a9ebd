//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → table.rs (snapshot of the active table)
//!     → matcher.rs (literal lookup, then templates in order)
//!     → Return: RouteMatch (route + captured params) or no match
//!
//! Route Compilation (at startup and on reload):
//!     RouteSpec[]
//!     → pattern.rs (parse templates)
//!     → route.rs (parse upstream, resolve timeout)
//!     → Freeze as immutable RouteTable
//!     → atomic swap into RouteTableHandle
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Literal beats template, then first registered wins
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod pattern;
pub mod route;
pub mod table;

pub use matcher::{match_route, RouteMatch};
pub use pattern::{PathParams, PathPattern, PatternError};
pub use route::{Route, Upstream};
pub use table::{RouteTable, RouteTableHandle, DEFAULT_ROUTE_TIMEOUT};
