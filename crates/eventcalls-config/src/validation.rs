// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Collects every problem in one pass so a user sees all of them at once.

use crate::{ConfigError, ConfigResult, EventcallsConfig};
use eventcalls_observability::LogOutput;

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    InvalidPortRange { port_name: String, port: u16 },
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPortRange { port_name, port } => {
                write!(
                    f,
                    "Port {} = {} is privileged (use 0 or 1024-65535)",
                    port_name, port
                )
            }
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every failed check
pub fn validate_config(config: &EventcallsConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// Run every check and return the failures
pub fn collect_errors(config: &EventcallsConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_routine(config, &mut errors);
    validate_datagram(config, &mut errors);
    validate_logging(config, &mut errors);
    errors
}

fn validate_routine(config: &EventcallsConfig, errors: &mut Vec<ConfigValidationError>) {
    if let Some(name) = &config.routine.thread_name {
        if name.is_empty() || name.contains('\0') {
            errors.push(ConfigValidationError::InvalidValue {
                field: "routine.thread_name".to_string(),
                reason: "must be non-empty and contain no NUL bytes".to_string(),
            });
        }
    }
}

fn validate_datagram(config: &EventcallsConfig, errors: &mut Vec<ConfigValidationError>) {
    let datagram = &config.datagram;

    if datagram.host.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "datagram.host".to_string(),
        });
    }

    if datagram.port != 0 && datagram.port < 1024 {
        errors.push(ConfigValidationError::InvalidPortRange {
            port_name: "datagram.port".to_string(),
            port: datagram.port,
        });
    }

    if datagram.buffer_size == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "datagram.buffer_size".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    } else if datagram.buffer_size > 65_535 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "datagram.buffer_size".to_string(),
            reason: "exceeds the maximum UDP payload (65535)".to_string(),
        });
    }

    if datagram.poll_interval_ms == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "datagram.poll_interval_ms".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }

    if let Some(remote) = &datagram.remote {
        if !remote.contains(':') {
            errors.push(ConfigValidationError::InvalidValue {
                field: "datagram.remote".to_string(),
                reason: format!("'{}' is not in host:port form", remote),
            });
        }
    }
}

fn validate_logging(config: &EventcallsConfig, errors: &mut Vec<ConfigValidationError>) {
    if !config.logging.is_valid_level() {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("unknown level '{}'", config.logging.level),
        });
    }

    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "logging.file_path".to_string(),
        });
    }
}
