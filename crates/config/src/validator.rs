use crate::*;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server.host must not be empty")]
    MissingHost,

    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },

    #[error("Duplicate instrument id {0} in engine.instruments")]
    DuplicateInstrument(u64),

    #[error("Port {port} is used by both {first} and {second}")]
    PortCollision {
        port: u16,
        first: String,
        second: String,
    },

    #[error("Environment variable '{var}' is missing or invalid: {message}")]
    InvalidEnvVar { var: String, message: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            defaults_applied: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &TradeServerConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_server(&config.server, &mut report);
    validate_ports(config, &mut report);
    validate_logging(&config.logging, &mut report);
    validate_metrics(&config.metrics, &mut report);
    validate_engine(&config.engine, &mut report);

    report
}

fn validate_server(server: &ServerSection, report: &mut ValidationReport) {
    if server.host.trim().is_empty() {
        report.add_error(ValidationError::MissingHost);
    }
    check_unresolved("server.host", &server.host, report);

    if server.http_port.is_none() {
        report.add_warning(
            "server.http_port",
            "HTTP market data surface is disabled",
        );
    }
}

fn validate_ports(config: &TradeServerConfig, report: &mut ValidationReport) {
    let mut ports: Vec<(&str, u16)> = vec![("server.order_entry_port", config.server.order_entry_port)];
    if let Some(http_port) = config.server.http_port {
        ports.push(("server.http_port", http_port));
    }
    if config.metrics.enabled {
        ports.push(("metrics.port", config.metrics.port()));
    }

    for (i, (first, port)) in ports.iter().enumerate() {
        if *port == 0 {
            report.add_error(ValidationError::InvalidPositiveInteger {
                field: first.to_string(),
            });
            continue;
        }
        for (second, other) in &ports[i + 1..] {
            if port == other {
                report.add_error(ValidationError::PortCollision {
                    port: *port,
                    first: first.to_string(),
                    second: second.to_string(),
                });
            }
        }
    }
}

fn validate_logging(logging: &LoggingConfig, report: &mut ValidationReport) {
    if let Some(file) = &logging.file {
        check_unresolved("logging.file", &file.to_string_lossy(), report);
    }
}

/// Placeholders still present after loading name variables that were not set
fn check_unresolved(field: &str, value: &str, report: &mut ValidationReport) {
    if let Ok(vars) = unresolved_env_vars(value) {
        for var in vars {
            report.add_error(ValidationError::InvalidEnvVar {
                var,
                message: format!("referenced by {} but not set", field),
            });
        }
    }
}

fn validate_metrics(metrics: &MetricsConfig, report: &mut ValidationReport) {
    if metrics.enabled && metrics.port.is_none() {
        report.add_default("metrics.port", &DEFAULT_METRICS_PORT.to_string());
    }
}

fn validate_engine(engine: &EngineConfig, report: &mut ValidationReport) {
    if engine.instruments.is_empty() {
        report.add_warning(
            "engine.instruments",
            "No instruments configured; every order will be rejected as unknown_instrument",
        );
    }

    let mut seen = HashSet::new();
    for id in &engine.instruments {
        if !seen.insert(*id) {
            report.add_error(ValidationError::DuplicateInstrument(*id));
        }
    }

    match engine.request_queue_capacity {
        Some(0) => report.add_error(ValidationError::InvalidPositiveInteger {
            field: "engine.request_queue_capacity".to_string(),
        }),
        Some(_) => {}
        None => report.add_default(
            "engine.request_queue_capacity",
            &DEFAULT_REQUEST_QUEUE_CAPACITY.to_string(),
        ),
    }

    match engine.default_depth {
        Some(0) => report.add_error(ValidationError::InvalidPositiveInteger {
            field: "engine.default_depth".to_string(),
        }),
        Some(_) => {}
        None => report.add_default("engine.default_depth", &DEFAULT_DEPTH.to_string()),
    }
}
