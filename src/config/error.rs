//! Load-time configuration errors.
//!
//! Every variant is fatal at startup: the gateway never serves traffic with a
//! table or filter setup that failed to load. On hot reload the same errors
//! cause the new configuration to be discarded.

use crate::routing::pattern::PatternError;

/// Error raised while loading or validating gateway configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("route id must not be empty")]
    EmptyRouteId,

    #[error("duplicate route id `{0}`")]
    DuplicateRouteId(String),

    #[error("route `{id}`: pattern `{pattern}` is already registered by route `{existing}`")]
    DuplicatePattern {
        id: String,
        pattern: String,
        existing: String,
    },

    #[error("route `{id}`: malformed pattern `{pattern}`: {source}")]
    MalformedPattern {
        id: String,
        pattern: String,
        #[source]
        source: PatternError,
    },

    #[error("route `{id}`: invalid upstream `{upstream}`: {reason}")]
    InvalidUpstream {
        id: String,
        upstream: String,
        reason: String,
    },

    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
}
