//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs, addresses and value ranges (timeouts > 0, thresholds > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgentConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::AgentConfig;

/// A single semantic problem in a configuration.
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

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "node.rpc_url", &config.node.rpc_url);
    for (i, peer) in config.node.reference_servers.iter().enumerate() {
        check_url(&mut errors, &format!("node.reference_servers[{}]", i), peer);
    }

    if config.node.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("node.rpc_timeout_secs", "must be greater than 0"));
    }
    if config.node.poll_interval_secs == 0 {
        errors.push(ValidationError::new("node.poll_interval_secs", "must be greater than 0"));
    }
    if let Some(schedule) = &config.node.epoch_schedule {
        if schedule.slots_per_epoch == 0 {
            errors.push(ValidationError::new(
                "node.epoch_schedule.slotsPerEpoch",
                "must be greater than 0",
            ));
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }
    if config.listener.write_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.write_timeout_secs", "must be greater than 0"));
    }

    if config.hysteresis.up_threshold == 0 {
        errors.push(ValidationError::new("hysteresis.up_threshold", "must be greater than 0"));
    }
    if config.hysteresis.down_threshold == 0 {
        errors.push(ValidationError::new("hysteresis.down_threshold", "must be greater than 0"));
    }

    if let Some(path) = &config.maintenance.sentinel_path {
        if path.trim().is_empty() {
            errors.push(ValidationError::new("maintenance.sentinel_path", "must not be empty"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("'{}': {}", value, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AgentConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = AgentConfig::default();
        config.node.rpc_url = "not a url".to_string();
        config.node.reference_servers = vec!["ftp://peer".to_string()];
        config.node.rpc_timeout_secs = 0;
        config.listener.bind_address = "nowhere".to_string();
        config.hysteresis.up_threshold = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "node.rpc_url",
                "node.reference_servers[0]",
                "node.rpc_timeout_secs",
                "listener.bind_address",
                "hysteresis.up_threshold",
            ]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = AgentConfig::default();
        config.observability.metrics_address = "bogus".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "observability.metrics_address");
    }
}
