// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Installs a global `tracing` subscriber: an `EnvFilter` built from the
//! configured level plus per-crate debug flags, and a text or JSON fmt layer
//! writing to stdout, stderr, or (with `file-logging`) a daily-rotated file.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LogOutput, LoggingConfig};

#[cfg(feature = "file-logging")]
type FileGuard = tracing_appender::non_blocking::WorkerGuard;

#[cfg(not(feature = "file-logging"))]
type FileGuard = std::convert::Infallible;

/// Keeps log output alive; dropping it flushes buffered file output
pub struct LoggingGuard {
    _file_guard: Option<FileGuard>,
    filter: String,
}

impl LoggingGuard {
    /// Filter directives the subscriber was installed with
    pub fn filter(&self) -> &str {
        &self.filter
    }
}

/// Initialize global logging
///
/// # Errors
/// Fails on an unknown level, an invalid filter, an unusable log directory,
/// or when a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig, debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    let filter = build_filter_string(config, debug_flags)?;
    let env_filter = EnvFilter::try_new(&filter)
        .with_context(|| format!("Invalid log filter: {}", filter))?;

    let file_guard = match config.output {
        LogOutput::Stdout => {
            install(config.format, env_filter, std::io::stdout)?;
            None
        }
        LogOutput::Stderr => {
            install(config.format, env_filter, std::io::stderr)?;
            None
        }
        LogOutput::File => Some(install_file(config, env_filter)?),
    };

    info!(
        "[LOGGING] Initialized (filter: {}, format: {:?}, output: {:?})",
        filter, config.format, config.output
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
        filter,
    })
}

/// Filter directives for `config` and `debug_flags`, without installing anything
pub fn build_filter_string(
    config: &LoggingConfig,
    debug_flags: &CrateDebugFlags,
) -> Result<String> {
    if !config.is_valid_level() {
        anyhow::bail!("Unknown log level '{}'", config.level);
    }
    Ok(debug_flags.to_filter_string(&config.level.to_ascii_lowercase()))
}

fn install<W>(format: LogFormat, filter: EnvFilter, writer: W) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

#[cfg(feature = "file-logging")]
fn install_file(config: &LoggingConfig, filter: EnvFilter) -> Result<FileGuard> {
    let dir = config
        .file_path
        .clone()
        .unwrap_or_else(|| std::path::PathBuf::from("./logs"));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(&dir, "eventcalls.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    install(config.format, filter, writer)?;
    Ok(guard)
}

#[cfg(not(feature = "file-logging"))]
fn install_file(_config: &LoggingConfig, _filter: EnvFilter) -> Result<FileGuard> {
    anyhow::bail!("File logging requires the `file-logging` feature")
}
