//! Connectivity-level dispatch failures.

use std::fmt;
use std::io;
use std::time::Duration;

use axum::body::Body;
use axum::http::Response;

/// Outcome of a dispatch: any upstream response, or a connectivity failure.
pub type UpstreamResult = Result<Response<Body>, Failure>;

/// Category of a dispatch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No response head within the route timeout.
    Timeout,
    /// Connection refused or name resolution failed.
    Unreachable,
    /// Any other network or protocol error.
    Transport,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Unreachable => "unreachable",
            FailureKind::Transport => "transport",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed dispatch. Reported once, never retried by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct Failure {
    pub kind: FailureKind,
    pub detail: String,
}

impl Failure {
    pub fn timeout(after: Duration) -> Self {
        Self {
            kind: FailureKind::Timeout,
            detail: format!("no response within {}ms", after.as_millis()),
        }
    }

    pub fn unreachable(detail: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Unreachable,
            detail: detail.into(),
        }
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transport,
            detail: detail.into(),
        }
    }

    /// Classify a socket error raised while connecting to `authority`.
    pub fn from_connect_error(authority: &str, err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrNotAvailable => {
                Self::unreachable(format!("connect to {} failed: {}", authority, err))
            }
            _ => Self::transport(format!("connect to {} failed: {}", authority, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_errors_are_classified() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(
            Failure::from_connect_error("a:1", &refused).kind,
            FailureKind::Unreachable
        );

        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        assert_eq!(
            Failure::from_connect_error("a:1", &reset).kind,
            FailureKind::Transport
        );
    }

    #[test]
    fn display_includes_kind() {
        let f = Failure::timeout(Duration::from_millis(250));
        assert_eq!(f.to_string(), "timeout: no response within 250ms");
    }
}
