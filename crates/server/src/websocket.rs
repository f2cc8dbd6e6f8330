//! Order-entry WebSocket server using Tokio-Tungstenite
//!
//! Each connection reads one JSON request per text frame, queues it for the
//! [`RequestProcessor`](crate::processor::RequestProcessor) and writes the
//! response before reading the next frame.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use observability::OrderEntryMetrics;
use parking_lot::RwLock as SyncRwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::job::OrderEntryJob;
use crate::processor::ProcessorJob;
use crate::protocol::{parse_request, OrderEntryResponse};
use crate::session::{ConnectionId, RequestContext};
use crate::traits::Server;

/// Responses outstanding per connection; requests are answered one at a time
const RESPONSE_CHANNEL_CAPACITY: usize = 4;

/// Information about an active order-entry connection
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub peer_addr: SocketAddr,
    pub connected_at: std::time::Instant,
}

/// Order-entry server with connection tracking
///
/// # Example
///
/// ```ignore
/// let (queue, receiver) = server::processor::request_queue(4096);
/// let server = OrderEntryServer::new(config, queue, OrderEntryMetrics::new());
/// ```
#[derive(Clone)]
pub struct OrderEntryServer {
    config: ServerConfig,
    running: Arc<AtomicBool>,
    bound_addr: Arc<SyncRwLock<Option<SocketAddr>>>,
    next_conn_id: Arc<AtomicU64>,
    connections: Arc<RwLock<HashMap<ConnectionId, ConnectionInfo>>>,
    queue: mpsc::Sender<ProcessorJob>,
    metrics: OrderEntryMetrics,
}

impl OrderEntryServer {
    pub fn new(config: ServerConfig, queue: mpsc::Sender<ProcessorJob>, metrics: OrderEntryMetrics) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            bound_addr: Arc::new(SyncRwLock::new(None)),
            next_conn_id: Arc::new(AtomicU64::new(1)),
            connections: Arc::new(RwLock::new(HashMap::new())),
            queue,
            metrics,
        }
    }

    /// Get the bind address, returning an error if the order-entry port is not configured
    fn bind_addr(&self) -> Result<SocketAddr> {
        self.config
            .order_entry_addr()
            .ok_or_else(|| ServerError::ConfigError("Order-entry port not configured".into()))?
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn active_connections(&self) -> Vec<ConnectionInfo> {
        self.connections.read().await.values().cloned().collect()
    }

    fn next_connection_id(&self) -> ConnectionId {
        self.next_conn_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn register_connection(&self, id: ConnectionId, peer_addr: SocketAddr) {
        let info = ConnectionInfo {
            id,
            peer_addr,
            connected_at: std::time::Instant::now(),
        };
        self.connections.write().await.insert(id, info);
        self.metrics.connection_opened();
    }

    async fn unregister_connection(&self, id: ConnectionId) {
        self.connections.write().await.remove(&id);
        self.metrics.connection_closed();
    }

    /// Handle a single order-entry connection
    async fn handle_connection(
        &self,
        conn_id: ConnectionId,
        stream: TcpStream,
        peer_addr: SocketAddr,
        conn_token: CancellationToken,
    ) -> Result<()> {
        debug!(conn_id, %peer_addr, "Order-entry connection established");

        let ws_stream = accept_async(stream).await.map_err(ServerError::WebSocket)?;

        self.register_connection(conn_id, peer_addr).await;
        let mut job = OrderEntryJob::new(conn_id);
        let result = self
            .serve_requests(&mut job, ws_stream, peer_addr, conn_token)
            .await;
        if !job.is_done() {
            let _ = job.finish();
        }
        self.unregister_connection(conn_id).await;

        debug!(conn_id, completed = job.completed(), "Order-entry connection closed");
        result
    }

    async fn serve_requests(
        &self,
        job: &mut OrderEntryJob,
        ws_stream: WebSocketStream<TcpStream>,
        peer_addr: SocketAddr,
        conn_token: CancellationToken,
    ) -> Result<()> {
        let conn_id = job.connection_id();
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (responder, mut responses) = mpsc::channel::<OrderEntryResponse>(RESPONSE_CHANNEL_CAPACITY);

        loop {
            tokio::select! {
                _ = conn_token.cancelled() => {
                    debug!(conn_id, "Connection shutting down due to server shutdown");
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                }

                // Only read the next frame once the previous response is written
                msg = ws_receiver.next(), if job.is_awaiting_request() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            job.request_received()?;
                            let ctx = RequestContext::new(conn_id, peer_addr, responder.clone());
                            match parse_request(&text) {
                                Ok(request) => {
                                    if self.queue.send((ctx, request)).await.is_err() {
                                        error!(conn_id, "Request processor is not accepting requests");
                                        let _ = ws_sender.send(Message::Close(None)).await;
                                        return Err(ServerError::ProcessorStopped);
                                    }
                                }
                                Err(e) => {
                                    warn!(conn_id, %e, "Malformed order-entry frame");
                                    self.metrics.record_malformed();
                                    ctx.respond(OrderEntryResponse::malformed(e.to_string())).await?;
                                }
                            }
                        }
                        Some(Ok(Message::Binary(_))) => {
                            job.request_received()?;
                            self.metrics.record_malformed();
                            let ctx = RequestContext::new(conn_id, peer_addr, responder.clone());
                            ctx.respond(OrderEntryResponse::malformed("binary frames are not supported")).await?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            debug!(conn_id, "Order-entry client disconnected gracefully");
                            break;
                        }
                        // Ping/pong are answered by tungstenite
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!(conn_id, %e, "WebSocket error");
                            break;
                        }
                        None => {
                            debug!(conn_id, "WebSocket stream ended");
                            break;
                        }
                    }
                }

                Some(response) = responses.recv() => {
                    job.processed()?;
                    let text = response.to_text()?;
                    if let Err(e) = ws_sender.send(Message::Text(text)).await {
                        error!(conn_id, %e, "Failed to send order-entry response");
                        break;
                    }
                    job.sent()?;
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Server for OrderEntryServer {
    fn name(&self) -> &str {
        "order-entry"
    }

    fn address(&self) -> Option<SocketAddr> {
        *self.bound_addr.read()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn run(&self, shutdown_token: CancellationToken) -> Result<()> {
        let addr = self.bind_addr()?;

        info!(%addr, "Starting order-entry server");

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::bind(addr.to_string(), e))?;

        let local_addr = listener.local_addr().map_err(ServerError::Io)?;
        *self.bound_addr.write() = Some(local_addr);

        info!(%local_addr, "Order-entry server listening");

        self.running.store(true, Ordering::SeqCst);

        let mut connection_handles: Vec<tokio::task::JoinHandle<()>> = Vec::new();

        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => {
                    info!("Order-entry server received shutdown signal");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let conn_id = self.next_connection_id();
                            let server = self.clone();
                            let conn_token = shutdown_token.child_token();

                            let handle = tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(
                                    conn_id,
                                    stream,
                                    peer_addr,
                                    conn_token
                                ).await {
                                    error!(conn_id, %e, "Order-entry connection error");
                                }
                            });

                            connection_handles.push(handle);
                            connection_handles.retain(|h| !h.is_finished());
                        }
                        Err(e) => {
                            error!(%e, "Failed to accept order-entry connection");
                        }
                    }
                }
            }
        }

        let connection_count = connection_handles.len();
        if connection_count > 0 {
            info!(connection_count, "Waiting for active order-entry connections to close...");

            let timeout = tokio::time::timeout(
                std::time::Duration::from_secs(10),
                futures::future::join_all(connection_handles),
            );

            match timeout.await {
                Ok(_) => {
                    info!("All order-entry connections closed gracefully");
                }
                Err(_) => {
                    warn!("Timed out waiting for order-entry connections to close");
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        *self.bound_addr.write() = None;

        info!("Order-entry server shutdown complete");

        Ok(())
    }
}
