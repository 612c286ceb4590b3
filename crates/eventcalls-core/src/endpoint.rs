// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Endpoint trait definition
//!
//! An endpoint is a blocking, duplex byte channel (UDP socket, serial port,
//! in-process pipe). A [`Routine`](crate::Routine) reads it from a single
//! background thread while any number of callers write to it.

use crate::error::EndpointResult;
use crate::event::DataEvent;
use std::sync::Arc;

/// Result of a single blocking read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// One chunk of data
    Data(DataEvent),

    /// The channel ended without error
    EndOfStream,
}

/// Capability contract every endpoint must satisfy
///
/// All methods take `&self`: the reader thread sits in [`read_chunk`](Self::read_chunk)
/// while other threads call [`write`](Self::write) or [`close`](Self::close),
/// so implementations must be safe for concurrent read-while-write.
///
/// # Cancellation
///
/// [`close`](Self::close) is the only way a routine can stop its reader. It
/// must be idempotent and must make any `read_chunk` blocked on another thread
/// return, either with [`ReadOutcome::EndOfStream`] or with an error. An
/// endpoint whose close does not unblock a pending read will hang `stop()`.
pub trait Endpoint: Send + Sync {
    /// Acquire the underlying resource (bind, connect, open the port)
    fn open(&self) -> EndpointResult<()>;

    /// Block until the next chunk, end-of-stream, or an error
    fn read_chunk(&self) -> EndpointResult<ReadOutcome>;

    /// Send `data` to the channel
    ///
    /// Called without any lifecycle check; after close it reports whatever the
    /// closed channel reports.
    fn write(&self, data: &[u8]) -> EndpointResult<()>;

    /// Release the resource and unblock a pending `read_chunk`
    fn close(&self) -> EndpointResult<()>;

    /// Short human-readable name used in logs and thread names
    fn describe(&self) -> String {
        "endpoint".to_string()
    }
}

impl<E: Endpoint + ?Sized> Endpoint for Arc<E> {
    fn open(&self) -> EndpointResult<()> {
        (**self).open()
    }

    fn read_chunk(&self) -> EndpointResult<ReadOutcome> {
        (**self).read_chunk()
    }

    fn write(&self, data: &[u8]) -> EndpointResult<()> {
        (**self).write(data)
    }

    fn close(&self) -> EndpointResult<()> {
        (**self).close()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<E: Endpoint + ?Sized> Endpoint for Box<E> {
    fn open(&self) -> EndpointResult<()> {
        (**self).open()
    }

    fn read_chunk(&self) -> EndpointResult<ReadOutcome> {
        (**self).read_chunk()
    }

    fn write(&self, data: &[u8]) -> EndpointResult<()> {
        (**self).write(data)
    }

    fn close(&self) -> EndpointResult<()> {
        (**self).close()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
