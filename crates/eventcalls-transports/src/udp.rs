// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! UDP datagram endpoint
//!
//! Each chunk is one datagram together with its source address. Reads use a
//! short socket timeout so that a `close()` from another thread is noticed
//! within one poll interval; a plain blocking `recv_from` on a UDP socket is
//! not reliably woken by dropping the socket.

use crate::config::DatagramConfig;
use eventcalls_core::{DataEvent, Endpoint, EndpointError, EndpointResult, ReadOutcome};
use parking_lot::RwLock;
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// UDP socket endpoint
pub struct DatagramEndpoint {
    config: DatagramConfig,
    socket: RwLock<Option<Arc<UdpSocket>>>,
    closed: AtomicBool,
}

impl DatagramEndpoint {
    /// Create an endpoint; the socket is bound on `open()`
    pub fn new(config: DatagramConfig) -> EndpointResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            socket: RwLock::new(None),
            closed: AtomicBool::new(false),
        })
    }

    /// Listen on `port` of the loopback interface
    pub fn bind(port: u16) -> EndpointResult<Self> {
        Self::new(DatagramConfig::new("127.0.0.1", port))
    }

    /// Listen on `port` of the loopback interface with a custom buffer size
    pub fn bind_with_buffer(port: u16, buffer_size: usize) -> EndpointResult<Self> {
        Self::new(DatagramConfig::new("127.0.0.1", port).with_buffer_size(buffer_size))
    }

    pub fn config(&self) -> &DatagramConfig {
        &self.config
    }

    /// Address the socket is actually bound to (resolves port 0)
    pub fn local_addr(&self) -> EndpointResult<SocketAddr> {
        Ok(self.current_socket()?.local_addr()?)
    }

    /// Send one datagram to an explicit destination
    pub fn send_to(&self, data: &[u8], addr: impl ToSocketAddrs) -> EndpointResult<()> {
        let socket = self.current_socket()?;
        socket.send_to(data, addr)?;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn current_socket(&self) -> EndpointResult<Arc<UdpSocket>> {
        if self.is_closed() {
            return Err(EndpointError::Closed);
        }
        self.socket.read().clone().ok_or(EndpointError::NotOpen)
    }
}

fn bind_socket(address: &str, reuse_address: bool) -> io::Result<UdpSocket> {
    let addr = address.to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(ErrorKind::AddrNotAvailable, "address did not resolve")
    })?;

    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(reuse_address)?;
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

impl Endpoint for DatagramEndpoint {
    fn open(&self) -> EndpointResult<()> {
        if self.is_closed() {
            return Err(EndpointError::Closed);
        }

        let mut slot = self.socket.write();
        if slot.is_some() {
            return Ok(());
        }

        let address = self.config.bind_address();
        let socket = bind_socket(&address, self.config.reuse_address)
            .map_err(|e| EndpointError::BindFailed(format!("{}: {}", address, e)))?;
        socket.set_read_timeout(Some(self.config.poll_interval()))?;

        info!(
            "[UDP] Listening on {}",
            socket
                .local_addr()
                .map(|a| a.to_string())
                .unwrap_or(address)
        );

        *slot = Some(Arc::new(socket));
        Ok(())
    }

    fn read_chunk(&self) -> EndpointResult<ReadOutcome> {
        let socket = match self.current_socket() {
            Ok(socket) => socket,
            Err(EndpointError::Closed) => return Ok(ReadOutcome::EndOfStream),
            Err(e) => return Err(e),
        };

        let mut buf = vec![0u8; self.config.buffer_size];
        loop {
            if self.is_closed() {
                return Ok(ReadOutcome::EndOfStream);
            }

            match socket.recv_from(&mut buf) {
                Ok((n, peer)) => {
                    buf.truncate(n);
                    return Ok(ReadOutcome::Data(DataEvent::from_peer(buf, peer)));
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) =>
                {
                    continue;
                }
                Err(_) if self.is_closed() => return Ok(ReadOutcome::EndOfStream),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn write(&self, data: &[u8]) -> EndpointResult<()> {
        let socket = self.current_socket()?;
        let remote = self.config.remote.as_deref().ok_or_else(|| {
            EndpointError::NotWritable(format!(
                "no remote address configured for {}",
                self.describe()
            ))
        })?;
        socket.send_to(data, remote)?;
        Ok(())
    }

    fn close(&self) -> EndpointResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.socket.write().take();
            debug!("[UDP] Closed {}", self.config.bind_address());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("udp:{}", self.config.bind_address())
    }
}
