// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types shared by endpoints and routines

/// Result type alias for endpoint operations
pub type EndpointResult<T> = Result<T, EndpointError>;

/// Result type alias for routine operations
pub type RoutineResult<T> = Result<T, RoutineError>;

/// Endpoint-agnostic error type
///
/// Every error an endpoint raises is expressed through this enum, whether it
/// surfaces to a `write` caller or reaches the handler through
/// [`FinalEvent`](crate::FinalEvent).
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// I/O error from the underlying channel
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to connect to the remote side
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// Failed to bind a local port
    #[error("Bind failed: {0}")]
    BindFailed(String),

    /// The endpoint has been closed
    #[error("Endpoint closed")]
    Closed,

    /// The endpoint has not been opened yet
    #[error("Endpoint is not open")]
    NotOpen,

    /// The endpoint cannot be written to
    #[error("Endpoint is not writable: {0}")]
    NotWritable(String),

    /// Invalid endpoint configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The reader thread panicked inside a callback or a read
    #[error("Reader panicked: {0}")]
    ReaderPanicked(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl EndpointError {
    /// Check whether the error means the peer or channel went away
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::Closed | Self::NotOpen => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

impl From<String> for EndpointError {
    fn from(msg: String) -> Self {
        Self::Other(msg)
    }
}

impl From<&str> for EndpointError {
    fn from(msg: &str) -> Self {
        Self::Other(msg.to_string())
    }
}

/// Errors raised by the routine itself rather than by its endpoint
#[derive(Debug, thiserror::Error)]
pub enum RoutineError {
    /// The reader thread could not be spawned
    #[error("Failed to spawn reader thread '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
