//! TradeServer CLI and Server Binary
//!
//! Entry point for initializing, validating and starting the trade server.

use anyhow::{Context, Result};
use cli::{Cli, Commands, LogFormatArg};
use config::{generate_default_config, load_config, save_config, validate_config, LogFormatSetting, TradeServerConfig};
use matching_engine::{InstrumentId, OrderBookManager};
use observability::{init_logging, LogFormat};
use server::{ServerConfig, ServerExt, TradeServer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Start {
            config,
            port,
            http_port,
            log_file,
            log_format,
        } => start_server(config, port, http_port, log_file, log_format).await,
        Commands::Validate { config } => {
            init_logging("tradeserver", LogFormat::Pretty, None)?;
            info!("Executing 'validate' command");
            validate_command(config).await
        }
        Commands::Init { output } => {
            init_logging("tradeserver", LogFormat::Pretty, None)?;
            info!("Executing 'init' command");
            init_command(output).await
        }
    }
}

fn log_format(setting: LogFormatSetting, cli_override: Option<LogFormatArg>) -> LogFormat {
    match cli_override {
        Some(LogFormatArg::Pretty) => LogFormat::Pretty,
        Some(LogFormatArg::Json) => LogFormat::Json,
        Some(LogFormatArg::Compact) => LogFormat::Compact,
        None => match setting {
            LogFormatSetting::Pretty => LogFormat::Pretty,
            LogFormatSetting::Json => LogFormat::Json,
            LogFormatSetting::Compact => LogFormat::Compact,
        },
    }
}

async fn start_server(
    config_path: PathBuf,
    port_override: Option<u16>,
    http_override: Option<u16>,
    log_file_override: Option<PathBuf>,
    log_format_override: Option<LogFormatArg>,
) -> Result<()> {
    let mut config = load_config(&config_path)?;

    if let Some(port) = port_override {
        config.server.order_entry_port = port;
    }
    if let Some(port) = http_override {
        config.server.http_port = Some(port);
    }
    if let Some(file) = log_file_override {
        config.logging.file = Some(file);
    }

    init_logging(
        "tradeserver",
        log_format(config.logging.format, log_format_override),
        config.logging.file.as_deref(),
    )?;
    info!(path = ?config_path, "TradeServer starting...");
    debug!(?config, "Effective configuration");

    let report = validate_config(&config);

    for default in &report.defaults_applied {
        debug!(field = %default.field, value = %default.value, "Default applied");
    }

    if !report.warnings.is_empty() {
        warn!("Configuration warnings:");
        for warning in &report.warnings {
            warn!(field = %warning.field, message = %warning.message);
        }
    }

    if !report.is_valid() {
        error!(
            error_count = report.errors.len(),
            "Configuration validation failed"
        );
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot start trade server due to configuration errors");
    }

    if config.metrics.enabled {
        observability::init_metrics(config.metrics.port())?;
    }

    let manager = Arc::new(build_order_books(&config)?);
    let server = TradeServer::new(server_config(&config), manager);

    info!(
        order_entry_port = config.server.order_entry_port,
        http_port = ?config.server.http_port,
        books = config.engine.instruments.len(),
        "Starting trade server"
    );

    server.validate_ports().await?;
    server.run_with_ctrl_c().await?;

    Ok(())
}

fn server_config(config: &TradeServerConfig) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        order_entry_port: Some(config.server.order_entry_port),
        http_port: config.server.http_port,
        request_queue_capacity: config.engine.request_queue_capacity(),
        default_depth: config.engine.default_depth(),
    }
}

/// One book per configured instrument
fn build_order_books(config: &TradeServerConfig) -> Result<OrderBookManager> {
    let manager = OrderBookManager::new();
    for id in &config.engine.instruments {
        manager
            .create_order_book(InstrumentId(*id))
            .with_context(|| format!("Failed to create order book for instrument {}", id))?;
    }
    Ok(manager)
}

async fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    info!(path = ?config_path.as_ref(), "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Host: {}", config.server.host);
    println!("Order-entry port: {}", config.server.order_entry_port);
    match config.server.http_port {
        Some(port) => println!("HTTP port: {}", port),
        None => println!("HTTP port: disabled"),
    }
    println!("Instruments: {:?}", config.engine.instruments);
    println!("Request queue capacity: {}", config.engine.request_queue_capacity());
    println!("Log format: {}", config.logging.format.as_str());

    Ok(())
}

async fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("This configuration includes:");
    println!(
        "  - Order entry on port {}, market data on port {}",
        config.server.order_entry_port,
        config.server.http_port.unwrap_or_default()
    );
    println!("  - Order books for instruments {:?}", config.engine.instruments);
    println!();
    println!("Next steps:");
    println!("  1. Edit the configuration file to list your instruments");
    println!(
        "  2. Run 'tradeserver validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  3. Run 'tradeserver start --config {:?}' to start the server",
        output_path
    );

    Ok(())
}
