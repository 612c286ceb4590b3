// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # eventcalls-observability
//!
//! Logging setup shared by applications built on eventcalls, with per-crate
//! debug flag support.
//!
//! ## Features
//! - `file-logging`: daily-rotated log file output

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known eventcalls crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "eventcalls",
    "eventcalls-core",
    "eventcalls-transports",
    "eventcalls-config",
    "eventcalls-observability",
];
