// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Event payloads delivered to a [`Handler`](crate::Handler)

use crate::error::EndpointError;
use std::net::SocketAddr;

/// Emitted once after the endpoint opened successfully
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitEvent;

/// One chunk of inbound data, exactly as a single `read_chunk` produced it
///
/// Chunk granularity (datagram, line, byte) is decided by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataEvent {
    bytes: Vec<u8>,
    peer: Option<SocketAddr>,
}

impl DataEvent {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            peer: None,
        }
    }

    /// Chunk received from a specific peer (datagram endpoints)
    pub fn from_peer(bytes: impl Into<Vec<u8>>, peer: SocketAddr) -> Self {
        Self {
            bytes: bytes.into(),
            peer: Some(peer),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl AsRef<[u8]> for DataEvent {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Terminal notification, carrying the cause when termination was an error
///
/// A clean end-of-stream or a caller-initiated stop has no cause.
#[derive(Debug, Default)]
pub struct FinalEvent {
    cause: Option<EndpointError>,
}

impl FinalEvent {
    /// Finalization without an error
    pub fn clean() -> Self {
        Self { cause: None }
    }

    pub fn failed(cause: EndpointError) -> Self {
        Self { cause: Some(cause) }
    }

    pub fn cause(&self) -> Option<&EndpointError> {
        self.cause.as_ref()
    }

    pub fn is_error(&self) -> bool {
        self.cause.is_some()
    }

    pub fn into_cause(self) -> Option<EndpointError> {
        self.cause
    }
}

impl From<Option<EndpointError>> for FinalEvent {
    fn from(cause: Option<EndpointError>) -> Self {
        Self { cause }
    }
}
