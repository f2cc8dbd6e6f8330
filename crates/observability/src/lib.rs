//! Observability infrastructure for the trade server
//!
//! This crate provides:
//! - Structured logging via tracing, to stdout or a log file
//! - Prometheus metrics
//! - Order-entry metric helpers
//!
//! # Quick Start
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("tradeserver", LogFormat::Pretty, None)?;
//!
//! // Optional
//! observability::metrics::init_metrics(9090)?;
//! ```

pub mod logging;
pub mod metrics;

pub use crate::logging::{init_default_logging, init_logging, LogFormat};
pub use crate::metrics::{init_metrics, OrderEntryMetrics, RequestMetricsGuard};
