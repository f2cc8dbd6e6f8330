use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "config/tradeserver.yaml";

#[derive(Parser, Debug)]
#[command(name = "tradeserver")]
#[command(about = "TradeServer - price-time priority order books behind a WebSocket order-entry stream")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the trade server with the given configuration
    Start {
        /// Path to the configuration file
        #[arg(short, long, env = "TRADESERVER_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Override the order-entry port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the HTTP market data port
        #[arg(long)]
        http_port: Option<u16>,

        /// Write logs to this file instead of stdout
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Override the log format
        #[arg(long, value_enum)]
        log_format: Option<LogFormatArg>,
    },

    /// Validate configuration without starting the server
    Validate {
        /// Path to the configuration file
        #[arg(short, long, env = "TRADESERVER_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Initialize a new configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "tradeserver.yaml")]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormatArg {
    /// Human-readable with colors
    Pretty,
    /// One JSON object per event
    Json,
    /// Single-line events
    Compact,
}

impl LogFormatArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormatArg::Pretty => "pretty",
            LogFormatArg::Json => "json",
            LogFormatArg::Compact => "compact",
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_overrides() {
        let cli = Cli::try_parse_from([
            "tradeserver",
            "start",
            "--config",
            "/etc/tradeserver.yaml",
            "--port",
            "7100",
            "--http-port",
            "8100",
            "--log-file",
            "/tmp/tradeserver.log",
            "--log-format",
            "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Start {
                config,
                port,
                http_port,
                log_file,
                log_format,
            } => {
                assert_eq!(config, PathBuf::from("/etc/tradeserver.yaml"));
                assert_eq!(port, Some(7100));
                assert_eq!(http_port, Some(8100));
                assert_eq!(log_file, Some(PathBuf::from("/tmp/tradeserver.log")));
                assert_eq!(log_format, Some(LogFormatArg::Json));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_init_default_output() {
        let cli = Cli::try_parse_from(["tradeserver", "init"]).unwrap();
        match cli.command {
            Commands::Init { output } => assert_eq!(output, PathBuf::from("tradeserver.yaml")),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Cli::try_parse_from(["tradeserver", "start", "--port", "70000"]).is_err());
        assert!(Cli::try_parse_from(["tradeserver", "start", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn test_command_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
