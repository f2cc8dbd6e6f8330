//! Port validation utilities
//!
//! Note: Port validation before binding has an inherent TOCTOU (time-of-check-time-of-use)
//! race condition. Between checking and actually binding, another process could take the port.
//! These utilities are useful for early feedback but should not be relied upon for correctness.
//! The actual bind operation is the source of truth.

use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};

/// Bind and release every configured listener port
pub async fn validate_ports_available(config: &ServerConfig) -> Result<()> {
    info!("Validating server ports...");

    let mut ports_to_check = Vec::new();

    if let Some(port) = config.order_entry_port {
        ports_to_check.push(("Order-entry", port));
    }
    if let Some(port) = config.http_port {
        ports_to_check.push(("HTTP", port));
    }

    if ports_to_check.is_empty() {
        warn!("No ports configured for server");
        return Ok(());
    }

    for (protocol, port) in ports_to_check {
        validate_single_port(&config.host, port, protocol).await?;
    }

    info!("All server ports validated successfully");
    Ok(())
}

async fn validate_single_port(host: &str, port: u16, protocol: &str) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    debug!("Checking {} port {}", protocol, port);

    match TcpListener::bind(&addr).await {
        Ok(listener) => {
            let local_addr = listener
                .local_addr()
                .map_err(|e| ServerError::bind(addr.clone(), e))?;

            drop(listener);

            info!("{} port {} is available ({})", protocol, port, local_addr);
            Ok(())
        }
        Err(e) => {
            error!("{} port {} is NOT available: {}", protocol, port, e);
            Err(ServerError::port_in_use(port, e.to_string()))
        }
    }
}

/// Returns `true` if the port appears to be in use.
/// Subject to the same TOCTOU race as [`validate_ports_available`].
pub async fn is_port_in_use(host: &str, port: u16) -> bool {
    let addr = format!("{}:{}", host, port);
    TcpListener::bind(&addr).await.is_err()
}

/// Validate port range
///
/// - Port 0 is rejected (ephemeral port assignment)
/// - Ports below 1024 generate a warning (privileged ports)
pub fn validate_port_range(port: u16) -> Result<()> {
    if port == 0 {
        Err(ServerError::ConfigError(
            "Port cannot be 0 (ephemeral port assignment not supported for explicit binding)"
                .to_string(),
        ))
    } else if port < 1024 {
        warn!(
            "Port {} is a privileged port (requires root/admin privileges)",
            port
        );
        Ok(())
    } else {
        Ok(())
    }
}

/// Validate the range of every configured port and reject a shared port
pub fn validate_config_ports(config: &ServerConfig) -> Result<()> {
    if let Some(port) = config.order_entry_port {
        validate_port_range(port)?;
    }
    if let Some(port) = config.http_port {
        validate_port_range(port)?;
    }
    if let (Some(order_entry), Some(http)) = (config.order_entry_port, config.http_port) {
        if order_entry == http {
            return Err(ServerError::ConfigError(format!(
                "Order-entry and HTTP listeners share port {}",
                http
            )));
        }
    }
    Ok(())
}
