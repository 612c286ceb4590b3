// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Every section is optional in the TOML file; missing sections and fields
//! take their defaults.

use serde::{Deserialize, Serialize};

pub use eventcalls_core::RoutineConfig;
pub use eventcalls_observability::{LogFormat, LogOutput, LoggingConfig};
pub use eventcalls_transports::{ChannelConfig, DatagramConfig};

/// Root configuration
///
/// ```toml
/// [routine]
/// thread_name = "udp-reader"
/// detailed_errors = true
///
/// [datagram]
/// host = "127.0.0.1"
/// port = 5005
/// buffer_size = 2048
/// remote = "127.0.0.1:5006"
/// reuse_address = true
///
/// [logging]
/// level = "debug"
/// format = "json"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventcallsConfig {
    pub routine: RoutineConfig,
    pub datagram: DatagramConfig,
    pub channel: ChannelConfig,
    pub logging: LoggingConfig,
}
