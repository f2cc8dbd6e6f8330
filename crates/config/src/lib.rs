//! Configuration for the trade server
//!
//! A single YAML document with four sections. Every section and most fields
//! are optional; missing values fall back to the constants in [`defaults`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TradeServerConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Network listeners
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    /// WebSocket order-entry stream
    #[serde(default = "default_order_entry_port")]
    pub order_entry_port: u16,
    /// Read-only market data over HTTP; `null` disables it
    #[serde(default = "default_http_port")]
    pub http_port: Option<u16>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            order_entry_port: default_order_entry_port(),
            http_port: default_http_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatSetting {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl LogFormatSetting {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormatSetting::Pretty => "pretty",
            LogFormatSetting::Json => "json",
            LogFormatSetting::Compact => "compact",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormatSetting,
    /// Write log events to this file instead of stdout
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Prometheus exporter
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    pub port: Option<u16>,
}

impl MetricsConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_METRICS_PORT)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// One order book is created per instrument id at startup
    #[serde(default)]
    pub instruments: Vec<u64>,
    /// Bound of the queue between connections and the request processor
    pub request_queue_capacity: Option<usize>,
    /// Depth served by the market data surface when a request names none
    pub default_depth: Option<usize>,
}

impl EngineConfig {
    pub fn request_queue_capacity(&self) -> usize {
        self.request_queue_capacity.unwrap_or(DEFAULT_REQUEST_QUEUE_CAPACITY)
    }

    pub fn default_depth(&self) -> usize {
        self.default_depth.unwrap_or(DEFAULT_DEPTH)
    }
}
