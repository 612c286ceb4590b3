// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Loading happens in three tiers, later tiers winning:
//! 1. TOML file (base values)
//! 2. Environment variables (runtime overrides)
//! 3. CLI key/value pairs (explicit user overrides)

use crate::validation::validate_config;
use crate::{ConfigError, ConfigResult, EventcallsConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// File name searched for when no path is given
pub const CONFIG_FILE_NAME: &str = "eventcalls.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "EVENTCALLS_CONFIG_PATH";

/// Find the configuration file
///
/// Search order:
/// 1. `EVENTCALLS_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load, override, and validate configuration
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the file is missing, contains invalid TOML, or fails validation
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<EventcallsConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config = parse_config(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    validate_config(&config)?;
    Ok(config)
}

/// Parse TOML text without applying overrides or validation
pub fn parse_config(content: &str) -> ConfigResult<EventcallsConfig> {
    Ok(toml::from_str(content)?)
}

fn parse_bool(value: &str) -> bool {
    let value = value.to_lowercase();
    value == "true" || value == "1" || value == "yes"
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `EVENTCALLS_THREAD_NAME` -> `routine.thread_name`
/// - `EVENTCALLS_DETAILED_ERRORS` -> `routine.detailed_errors`
/// - `EVENTCALLS_UDP_HOST` -> `datagram.host`
/// - `EVENTCALLS_UDP_PORT` -> `datagram.port`
/// - `EVENTCALLS_UDP_BUFFER_SIZE` -> `datagram.buffer_size`
/// - `EVENTCALLS_UDP_REMOTE` -> `datagram.remote`
/// - `EVENTCALLS_UDP_REUSE_ADDRESS` -> `datagram.reuse_address`
/// - `EVENTCALLS_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut EventcallsConfig) {
    if let Ok(value) = env::var("EVENTCALLS_THREAD_NAME") {
        config.routine.thread_name = Some(value);
    }
    if let Ok(value) = env::var("EVENTCALLS_DETAILED_ERRORS") {
        config.routine.detailed_errors = parse_bool(&value);
    }

    if let Ok(value) = env::var("EVENTCALLS_UDP_HOST") {
        config.datagram.host = value;
    }
    if let Ok(value) = env::var("EVENTCALLS_UDP_PORT") {
        if let Ok(port) = value.parse::<u16>() {
            config.datagram.port = port;
        }
    }
    if let Ok(value) = env::var("EVENTCALLS_UDP_BUFFER_SIZE") {
        if let Ok(size) = value.parse::<usize>() {
            config.datagram.buffer_size = size;
        }
    }
    if let Ok(value) = env::var("EVENTCALLS_UDP_REMOTE") {
        config.datagram.remote = Some(value);
    }
    if let Ok(value) = env::var("EVENTCALLS_UDP_REUSE_ADDRESS") {
        config.datagram.reuse_address = parse_bool(&value);
    }

    if let Ok(value) = env::var("EVENTCALLS_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// Keys: `thread_name`, `detailed_errors`, `udp_host`, `udp_port`,
/// `udp_buffer_size`, `udp_remote`, `udp_reuse_address`, `log_level`.
/// Unparseable numbers are ignored.
pub fn apply_cli_overrides(config: &mut EventcallsConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("thread_name") {
        config.routine.thread_name = Some(value.clone());
    }
    if let Some(value) = cli_args.get("detailed_errors") {
        config.routine.detailed_errors = parse_bool(value);
    }

    if let Some(value) = cli_args.get("udp_host") {
        config.datagram.host = value.clone();
    }
    if let Some(value) = cli_args.get("udp_port") {
        if let Ok(port) = value.parse::<u16>() {
            config.datagram.port = port;
        }
    }
    if let Some(value) = cli_args.get("udp_buffer_size") {
        if let Ok(size) = value.parse::<usize>() {
            config.datagram.buffer_size = size;
        }
    }
    if let Some(value) = cli_args.get("udp_remote") {
        config.datagram.remote = Some(value.clone());
    }
    if let Some(value) = cli_args.get("udp_reuse_address") {
        config.datagram.reuse_address = parse_bool(value);
    }

    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
}
