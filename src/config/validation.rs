//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, thresholds > 0)
//! - Check address formats and the probe query
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system; the core trusts it after

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::BalancerConfig;
use crate::health::probe::ProbeQuery;

/// One semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.is_empty() {
        errors.push(ValidationError::new("listener.bind_address", "cannot be empty"));
    } else if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not an ip:port address", config.listener.bind_address),
        ));
    }

    if config.timeouts.query_ms == 0 {
        errors.push(ValidationError::new("timeouts.query_ms", "must be positive"));
    }

    if config.backends.is_empty() {
        errors.push(ValidationError::new("backends", "at least one backend must be configured"));
    }

    for (i, backend) in config.backends.iter().enumerate() {
        let field = format!("backends[{}].address", i);
        if backend.address.is_empty() {
            errors.push(ValidationError::new(field, "cannot be empty"));
        } else if !has_port(&backend.address) {
            errors.push(ValidationError::new(
                field,
                format!("'{}' must be host:port", backend.address),
            ));
        }
    }

    let hc = &config.health_check;
    if hc.enabled {
        if hc.interval_ms == 0 {
            errors.push(ValidationError::new("health_check.interval_ms", "must be positive"));
        }
        if hc.timeout_ms == 0 {
            errors.push(ValidationError::new("health_check.timeout_ms", "must be positive"));
        }
        if hc.failure_threshold == 0 {
            errors.push(ValidationError::new("health_check.failure_threshold", "must be positive"));
        }
        if hc.success_threshold == 0 {
            errors.push(ValidationError::new("health_check.success_threshold", "must be positive"));
        }
        if let Err(e) = ProbeQuery::new(&hc.query_name, &hc.query_type) {
            errors.push(ValidationError::new("health_check", e.to_string()));
        }
    }

    if config.metrics.enabled && config.metrics.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "metrics.address",
            format!("'{}' is not an ip:port address", config.metrics.address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn has_port(address: &str) -> bool {
    match address.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}
