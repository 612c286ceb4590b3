//! Configuration types for the bundled endpoints

use eventcalls_core::{EndpointError, EndpointResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default receive buffer size per datagram
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default interval at which a blocked datagram read re-checks for close
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// UDP datagram endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatagramConfig {
    /// Host to bind
    pub host: String,

    /// Port to bind (0 = ephemeral)
    pub port: u16,

    /// Receive buffer size; longer datagrams are truncated
    pub buffer_size: usize,

    /// Read timeout used to notice a close from another thread
    pub poll_interval_ms: u64,

    /// Destination for `write` ("host:port"); None = endpoint is receive-only
    pub remote: Option<String>,

    /// Set `SO_REUSEADDR` before binding
    pub reuse_address: bool,
}

impl Default for DatagramConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            remote: None,
            reuse_address: true,
        }
    }
}

impl DatagramConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set receive buffer size
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set destination for writes
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    pub fn with_reuse_address(mut self, reuse: bool) -> Self {
        self.reuse_address = reuse;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate configuration
    pub fn validate(&self) -> EndpointResult<()> {
        if self.host.is_empty() {
            return Err(EndpointError::InvalidConfig(
                "Host cannot be empty".to_string(),
            ));
        }

        if self.buffer_size == 0 {
            return Err(EndpointError::InvalidConfig(
                "Buffer size must be greater than 0".to_string(),
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(EndpointError::InvalidConfig(
                "Poll interval must be greater than 0 (a zero read timeout is rejected by the OS)"
                    .to_string(),
            ));
        }

        if let Some(remote) = &self.remote {
            if remote.is_empty() {
                return Err(EndpointError::InvalidConfig(
                    "Remote address cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// In-process channel endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Endpoint name used in logs
    pub name: String,

    /// Capacity of each direction (0 = unbounded)
    pub capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: "channel".to_string(),
            capacity: 0,
        }
    }
}

impl ChannelConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}
