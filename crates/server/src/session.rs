//! Per-request context
//!
//! Each request carries the sender half of its connection's response
//! channel, so the processor answers the connection that asked without any
//! shared table of connections.

use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::error::{Result, ServerError};
use crate::protocol::OrderEntryResponse;

/// A unique identifier for each order-entry connection
pub type ConnectionId = u64;

#[derive(Debug, Clone)]
pub struct RequestContext {
    connection_id: ConnectionId,
    peer_addr: SocketAddr,
    responder: mpsc::Sender<OrderEntryResponse>,
    received_at: Instant,
}

impl RequestContext {
    pub fn new(
        connection_id: ConnectionId,
        peer_addr: SocketAddr,
        responder: mpsc::Sender<OrderEntryResponse>,
    ) -> Self {
        Self {
            connection_id,
            peer_addr,
            responder,
            received_at: Instant::now(),
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Time since the request was read off the connection
    pub fn elapsed(&self) -> Duration {
        self.received_at.elapsed()
    }

    /// Hand the response to the connection
    ///
    /// Fails with `ConnectionClosed` once the connection has gone away.
    pub async fn respond(&self, response: OrderEntryResponse) -> Result<()> {
        self.responder
            .send(response)
            .await
            .map_err(|_| ServerError::ConnectionClosed {
                connection_id: self.connection_id,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn peer() -> SocketAddr {
        "127.0.0.1:5000".parse().unwrap()
    }

    #[tokio::test]
    async fn test_respond_reaches_connection() {
        let (tx, mut rx) = mpsc::channel(1);
        let ctx = RequestContext::new(3, peer(), tx);

        ctx.respond(OrderEntryResponse::malformed("bad")).await.unwrap();
        let response = rx.recv().await.unwrap();
        assert!(response.is_rejected());
        assert_eq!(ctx.connection_id(), 3);
    }

    #[tokio::test]
    async fn test_respond_after_disconnect() {
        let (tx, rx) = mpsc::channel(1);
        let ctx = RequestContext::new(4, peer(), tx);
        drop(rx);

        let err = ctx.respond(OrderEntryResponse::malformed("bad")).await.unwrap_err();
        assert_matches!(err, ServerError::ConnectionClosed { connection_id: 4 });
    }
}
