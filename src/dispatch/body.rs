//! Streaming response body bound to its pooled connection.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Bytes;
use hyper::body::{Body, Frame, Incoming, SizeHint};

use crate::dispatch::pool::PooledConnection;

/// Upstream body that returns its connection to the pool once the last
/// frame has been read. An error or an early drop discards the connection.
#[derive(Debug)]
pub struct PooledBody {
    inner: Incoming,
    connection: Option<PooledConnection>,
}

impl PooledBody {
    pub fn new(inner: Incoming, connection: PooledConnection) -> Self {
        Self {
            inner,
            connection: Some(connection),
        }
    }
}

impl Body for PooledBody {
    type Data = Bytes;
    type Error = hyper::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(None) => {
                if let Some(connection) = this.connection.take() {
                    connection.release();
                }
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                drop(this.connection.take());
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(Some(Ok(frame))) => {
                // Consumers may stop polling once the length is satisfied.
                if this.inner.is_end_stream() {
                    if let Some(connection) = this.connection.take() {
                        connection.release();
                    }
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
