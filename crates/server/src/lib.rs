//! Order-entry and market data server for the trade server
//!
//! This crate exposes the matching engine over a WebSocket order-entry
//! stream and a read-only HTTP market data surface, with unified lifecycle
//! management and graceful shutdown.
//!
// Allow large error types - WebSocket errors are unavoidably large
#![allow(clippy::result_large_err)]
//!
//! # Architecture
//!
//! ```text
//!  ws client ──► OrderEntryServer ──(RequestContext, request)──► RequestProcessor ──► OrderBookManager
//!      ▲            (per-connection job)        bounded queue            │                  ▲
//!      └──────────────── response channel ◄──────────────────────────────┘                  │
//!                                                                                           │
//!  http client ──► HttpServer (market_data routes) ──────────────────────────── read-only ───┘
//! ```
//!
//! All listeners implement the [`Server`] trait. Shutdown coordination uses
//! `CancellationToken` from `tokio_util`; cancelling the parent token stops
//! the processor, both listeners and every open connection.
//!
//! # Quick Start
//!
//! ```ignore
//! use server::{ServerConfig, ServerExt, TradeServer};
//!
//! let manager = Arc::new(OrderBookManager::new());
//! manager.create_order_book(InstrumentId(0))?;
//!
//! let server = TradeServer::new(ServerConfig::default(), manager);
//! server.validate_ports().await?;
//! server.run_with_ctrl_c().await?;
//! ```

use matching_engine::OrderBookManager;
use observability::OrderEntryMetrics;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

// Core modules
pub mod config;
pub mod error;
pub mod shutdown;
pub mod traits;

// Order entry
pub mod job;
pub mod processor;
pub mod protocol;
pub mod session;

// Server implementations
pub mod http;
pub mod market_data;
pub mod port_validator;
pub mod websocket;

pub use config::{ports, ServerConfig};
pub use error::{Result, ServerError};
pub use http::HttpServer;
pub use job::{JobEvent, JobState, OrderEntryJob};
pub use port_validator::{validate_config_ports, validate_ports_available};
pub use processor::{request_queue, ProcessorJob, RequestProcessor};
pub use protocol::{parse_request, OrderEntryRequest, OrderEntryResponse};
pub use session::{ConnectionId, RequestContext};
pub use shutdown::ShutdownController;
pub use traits::{Server, ServerExt};
pub use websocket::OrderEntryServer;

/// Runs the request processor, the order-entry listener and the market data
/// listener under one shutdown token
pub struct TradeServer {
    name: String,
    config: ServerConfig,
    manager: Arc<OrderBookManager>,
    metrics: OrderEntryMetrics,
    queue: Mutex<Option<mpsc::Receiver<ProcessorJob>>>,
    order_entry: Option<OrderEntryServer>,
    http: Option<HttpServer>,
}

impl TradeServer {
    pub fn new(config: ServerConfig, manager: Arc<OrderBookManager>) -> Self {
        Self::with_name("tradeserver", config, manager)
    }

    pub fn with_name(name: impl Into<String>, config: ServerConfig, manager: Arc<OrderBookManager>) -> Self {
        let metrics = OrderEntryMetrics::new();
        let (sender, receiver) = request_queue(config.request_queue_capacity);

        let order_entry = config
            .order_entry_port
            .map(|_| OrderEntryServer::new(config.clone(), sender, metrics.clone()));
        let http = config
            .http_port
            .map(|_| HttpServer::market_data(config.clone(), manager.clone()));

        Self {
            name: name.into(),
            config,
            manager,
            metrics,
            queue: Mutex::new(Some(receiver)),
            order_entry,
            http,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<OrderBookManager> {
        &self.manager
    }

    pub fn order_entry_address(&self) -> Option<SocketAddr> {
        self.order_entry.as_ref().and_then(|s| s.address())
    }

    pub fn http_address(&self) -> Option<SocketAddr> {
        self.http.as_ref().and_then(|s| s.address())
    }

    /// Check port ranges and that every configured port can be bound
    pub async fn validate_ports(&self) -> Result<()> {
        validate_config_ports(&self.config)?;
        validate_ports_available(&self.config).await
    }
}

#[async_trait::async_trait]
impl Server for TradeServer {
    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> Option<SocketAddr> {
        self.order_entry_address().or_else(|| self.http_address())
    }

    fn is_running(&self) -> bool {
        self.order_entry
            .as_ref()
            .map(|s| s.is_running())
            .unwrap_or(false)
            || self.http.as_ref().map(|s| s.is_running()).unwrap_or(false)
    }

    async fn run(&self, shutdown_token: CancellationToken) -> Result<()> {
        let receiver = self.queue.lock().take().ok_or(ServerError::AlreadyRunning)?;

        info!(server = %self.name, books = self.manager.book_count(), "Starting trade server...");

        let mut handles: Vec<tokio::task::JoinHandle<Result<()>>> = Vec::new();

        if let Some(ref order_entry) = self.order_entry {
            let processor = RequestProcessor::new(self.manager.clone(), self.metrics.clone());
            handles.push(tokio::spawn(processor.run(receiver, shutdown_token.child_token())));

            let order_entry = order_entry.clone();
            let token = shutdown_token.child_token();
            if let Some(port) = self.config.order_entry_port {
                info!(port, "Starting order-entry server");
            }
            handles.push(tokio::spawn(async move { order_entry.run(token).await }));
        } else {
            warn!("Order-entry listener disabled; the books will not change");
        }

        if let Some(ref http) = self.http {
            let http = http.clone();
            let token = shutdown_token.child_token();
            if let Some(port) = self.config.http_port {
                info!(port, "Starting HTTP server");
            }
            handles.push(tokio::spawn(async move { http.run(token).await }));
        }

        if handles.is_empty() {
            warn!("No servers configured to start");
            return Ok(());
        }

        info!(server = %self.name, "All server components started");

        // Stop on the shutdown token, or as soon as any component exits
        tokio::select! {
            _ = shutdown_token.cancelled() => {
                info!("Shutdown signal received");
            }
            result = wait_for_first_completion(&mut handles) => {
                match result {
                    Some(Ok(Ok(()))) => {
                        warn!("A server component exited unexpectedly (but successfully)");
                    }
                    Some(Ok(Err(e))) => {
                        error!(%e, "A server component exited with error");
                    }
                    Some(Err(e)) => {
                        error!(%e, "A server task panicked");
                    }
                    None => {}
                }
                shutdown_token.cancel();
            }
        }

        info!("Waiting for all server components to shut down...");
        let shutdown_timeout = std::time::Duration::from_secs(30);

        match tokio::time::timeout(shutdown_timeout, futures::future::join_all(handles)).await {
            Ok(results) => {
                let errors: Vec<_> = results
                    .into_iter()
                    .filter_map(|r| match r {
                        Ok(Ok(())) => None,
                        Ok(Err(e)) => Some(e.to_string()),
                        Err(e) => Some(format!("Task panicked: {}", e)),
                    })
                    .collect();

                if errors.is_empty() {
                    info!(server = %self.name, "All server components shut down successfully");
                } else {
                    warn!(?errors, "Some server components had errors during shutdown");
                }
            }
            Err(_) => {
                warn!("Timed out waiting for server components to shut down");
            }
        }

        info!(server = %self.name, "Trade server shutdown complete");
        Ok(())
    }
}

/// Wait for the first handle to complete
async fn wait_for_first_completion(
    handles: &mut [tokio::task::JoinHandle<Result<()>>],
) -> Option<std::result::Result<Result<()>, tokio::task::JoinError>> {
    if handles.is_empty() {
        return None;
    }

    let (result, _index, _remaining) =
        futures::future::select_all(handles.iter_mut().map(Box::pin)).await;

    Some(result)
}
