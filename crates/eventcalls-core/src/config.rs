// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Routine configuration

use serde::{Deserialize, Serialize};

/// Routine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutineConfig {
    /// Reader thread name (None = derived from the endpoint description)
    pub thread_name: Option<String>,

    /// Log read failures with their full debug representation
    pub detailed_errors: bool,

    /// Stop the routine when it is dropped while still running
    pub stop_on_drop: bool,
}

impl Default for RoutineConfig {
    fn default() -> Self {
        Self {
            thread_name: None,
            detailed_errors: false,
            stop_on_drop: true,
        }
    }
}

impl RoutineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set reader thread name
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = Some(name.into());
        self
    }

    /// Enable detailed error logging
    pub fn with_detailed_errors(mut self, enabled: bool) -> Self {
        self.detailed_errors = enabled;
        self
    }

    /// Keep the reader alive when the routine is dropped
    pub fn detached_on_drop(mut self) -> Self {
        self.stop_on_drop = false;
        self
    }
}
