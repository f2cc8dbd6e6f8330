//! Server configuration
//!
//! This module provides the listener configuration for the trade server and
//! its default port assignments.

use crate::error::{Result, ServerError};
use std::net::SocketAddr;

/// Default port assignments
pub mod ports {
    /// WebSocket order-entry stream
    pub const ORDER_ENTRY: u16 = 7083;
    /// Read-only market data over HTTP
    pub const HTTP: u16 = 8083;
    /// Prometheus exporter
    pub const METRICS: u16 = 9090;
}

/// Default bound of the request queue feeding the processor
pub const DEFAULT_REQUEST_QUEUE_CAPACITY: usize = 4096;

/// Default number of levels per side served by the market data surface
pub const DEFAULT_DEPTH: usize = 10;

/// Listener and queue configuration
///
/// Each listener is optional, so the order-entry stream and the market data
/// surface can be run independently.
///
/// # Example
///
/// ```
/// use server::config::ServerConfig;
///
/// let config = ServerConfig::new("0.0.0.0", 7083, 8083);
/// assert!(config.has_servers());
///
/// let config = ServerConfig::order_entry_only("127.0.0.1", 7083).with_queue_capacity(128);
/// assert_eq!(config.http_port, None);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    pub order_entry_port: Option<u16>,
    pub http_port: Option<u16>,
    /// Bound of the queue between connections and the request processor
    pub request_queue_capacity: usize,
    /// Depth served by `/api/v1/books/{id}` when the request names none
    pub default_depth: usize,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, order_entry: u16, http: u16) -> Self {
        Self {
            host: host.into(),
            order_entry_port: Some(order_entry),
            http_port: Some(http),
            request_queue_capacity: DEFAULT_REQUEST_QUEUE_CAPACITY,
            default_depth: DEFAULT_DEPTH,
        }
    }

    pub fn order_entry_only(host: impl Into<String>, port: u16) -> Self {
        Self {
            http_port: None,
            ..Self::new(host, port, ports::HTTP)
        }
    }

    pub fn http_only(host: impl Into<String>, port: u16) -> Self {
        Self {
            order_entry_port: None,
            ..Self::new(host, ports::ORDER_ENTRY, port)
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.request_queue_capacity = capacity;
        self
    }

    pub fn with_default_depth(mut self, depth: usize) -> Self {
        self.default_depth = depth;
        self
    }

    pub fn order_entry_addr(&self) -> Option<Result<SocketAddr>> {
        self.order_entry_port.map(|p| self.parse_addr(p))
    }

    pub fn http_addr(&self) -> Option<Result<SocketAddr>> {
        self.http_port.map(|p| self.parse_addr(p))
    }

    /// Check if any listener is configured
    pub fn has_servers(&self) -> bool {
        self.order_entry_port.is_some() || self.http_port.is_some()
    }

    fn parse_addr(&self, port: u16) -> Result<SocketAddr> {
        format!("{}:{}", self.host, port)
            .parse()
            .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", self.host, port)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", ports::ORDER_ENTRY, ports::HTTP)
    }
}
