// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-process channel endpoint
//!
//! A [`ChannelEndpoint`] behaves like a duplex byte channel whose far side is
//! a [`ChannelFeeder`] held by the caller. The feeder pushes chunks,
//! end-of-stream, or read errors, and collects everything written to the
//! endpoint. Useful for wiring routines together in-process and for tests.

use crate::config::ChannelConfig;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use eventcalls_core::{DataEvent, Endpoint, EndpointError, EndpointResult, ReadOutcome};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::debug;

type Inbound = EndpointResult<ReadOutcome>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Open,
    Closed,
}

/// Endpoint side of an in-process channel
pub struct ChannelEndpoint {
    config: ChannelConfig,
    inbound: Receiver<Inbound>,
    outbound: Sender<Vec<u8>>,
    close_tx: Sender<()>,
    close_rx: Receiver<()>,
    phase: Mutex<Phase>,
}

/// Far side of an in-process channel
pub struct ChannelFeeder {
    inbound: Sender<Inbound>,
    outbound: Receiver<Vec<u8>>,
}

/// Create a connected endpoint/feeder pair
pub fn channel_pair(config: ChannelConfig) -> (ChannelEndpoint, ChannelFeeder) {
    let (in_tx, in_rx) = make_channel(config.capacity);
    let (out_tx, out_rx) = make_channel(config.capacity);
    let (close_tx, close_rx) = channel::bounded(1);

    let endpoint = ChannelEndpoint {
        config,
        inbound: in_rx,
        outbound: out_tx,
        close_tx,
        close_rx,
        phase: Mutex::new(Phase::Created),
    };
    let feeder = ChannelFeeder {
        inbound: in_tx,
        outbound: out_rx,
    };
    (endpoint, feeder)
}

fn make_channel<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    if capacity == 0 {
        channel::unbounded()
    } else {
        channel::bounded(capacity)
    }
}

impl ChannelEndpoint {
    /// Convenience constructor with default configuration
    pub fn pair() -> (Self, ChannelFeeder) {
        channel_pair(ChannelConfig::default())
    }

    pub fn is_closed(&self) -> bool {
        *self.phase.lock() == Phase::Closed
    }
}

impl Endpoint for ChannelEndpoint {
    fn open(&self) -> EndpointResult<()> {
        let mut phase = self.phase.lock();
        match *phase {
            Phase::Closed => Err(EndpointError::Closed),
            Phase::Created | Phase::Open => {
                *phase = Phase::Open;
                debug!("[CHANNEL] {} opened", self.config.name);
                Ok(())
            }
        }
    }

    fn read_chunk(&self) -> EndpointResult<ReadOutcome> {
        match *self.phase.lock() {
            Phase::Closed => return Ok(ReadOutcome::EndOfStream),
            Phase::Created => return Err(EndpointError::NotOpen),
            Phase::Open => {}
        }

        channel::select! {
            // A dropped feeder reads as end-of-stream
            recv(self.inbound) -> item => item.unwrap_or(Ok(ReadOutcome::EndOfStream)),
            recv(self.close_rx) -> _ => Ok(ReadOutcome::EndOfStream),
        }
    }

    fn write(&self, data: &[u8]) -> EndpointResult<()> {
        if *self.phase.lock() == Phase::Closed {
            return Err(EndpointError::Closed);
        }
        self.outbound.send(data.to_vec()).map_err(|_| {
            EndpointError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "channel feeder dropped",
            ))
        })
    }

    fn close(&self) -> EndpointResult<()> {
        let mut phase = self.phase.lock();
        if *phase != Phase::Closed {
            *phase = Phase::Closed;
            // Wakes a reader parked in select!
            let _ = self.close_tx.try_send(());
            debug!("[CHANNEL] {} closed", self.config.name);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("channel:{}", self.config.name)
    }
}

impl ChannelFeeder {
    /// Deliver one chunk to the endpoint's reader
    pub fn send(&self, bytes: impl Into<Vec<u8>>) -> EndpointResult<()> {
        self.push(Ok(ReadOutcome::Data(DataEvent::new(bytes))))
    }

    /// Signal a clean end-of-stream
    pub fn end(&self) -> EndpointResult<()> {
        self.push(Ok(ReadOutcome::EndOfStream))
    }

    /// Make the next read fail with `err`
    pub fn fail(&self, err: EndpointError) -> EndpointResult<()> {
        self.push(Err(err))
    }

    fn push(&self, item: Inbound) -> EndpointResult<()> {
        self.inbound.send(item).map_err(|_| EndpointError::Closed)
    }

    /// Wait for the next payload written to the endpoint
    pub fn recv_written(&self, timeout: Duration) -> Option<Vec<u8>> {
        match self.outbound.recv_timeout(timeout) {
            Ok(data) => Some(data),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Everything written so far, without waiting
    pub fn drain_written(&self) -> Vec<Vec<u8>> {
        self.outbound.try_iter().collect()
    }
}
