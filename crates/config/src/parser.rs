use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TradeServerConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());
    parse_config(&content)
}

/// Substitute environment variables and parse a YAML document
pub fn parse_config(content: &str) -> Result<TradeServerConfig> {
    let substituted = substitution::substitute_env_vars(content)?;
    debug!("Environment variable substitution completed");

    let config: TradeServerConfig = serde_yaml::from_str(&substituted)
        .with_context(|| "Failed to parse YAML configuration")?;

    info!("Configuration loaded successfully");
    Ok(config)
}

/// Configuration written by `tradeserver init`
#[instrument]
pub fn generate_default_config() -> TradeServerConfig {
    TradeServerConfig {
        server: ServerSection::default(),
        logging: LoggingConfig::default(),
        metrics: MetricsConfig {
            enabled: false,
            port: Some(DEFAULT_METRICS_PORT),
        },
        engine: EngineConfig {
            instruments: vec![0, 1, 2],
            request_queue_capacity: Some(DEFAULT_REQUEST_QUEUE_CAPACITY),
            default_depth: Some(DEFAULT_DEPTH),
        },
    }
}

#[instrument(skip(config))]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &TradeServerConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tradeserver.yaml");

        let config = generate_default_config();
        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();

        assert_eq!(loaded, config);
        assert!(validate_config(&loaded).is_valid());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_parse_with_env_substitution() {
        std::env::set_var("TRADESERVER_PARSE_TEST_PORT", "7300");
        let config = parse_config("server:\n  order_entry_port: ${TRADESERVER_PARSE_TEST_PORT}\n").unwrap();
        assert_eq!(config.server.order_entry_port, 7300);
    }

    #[test]
    fn test_parse_rejects_bad_types() {
        let err = parse_config("engine:\n  instruments: [one, two]\n").unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML"));
    }
}
