//! # eventcalls-transports
//!
//! Endpoint implementations for `eventcalls-core` routines.
//!
//! ### Channel
//! - [`ChannelEndpoint`](channel::ChannelEndpoint): in-process duplex channel
//!   driven by a [`ChannelFeeder`](channel::ChannelFeeder)
//!
//! ### UDP
//! - [`DatagramEndpoint`](udp::DatagramEndpoint): one chunk per datagram,
//!   with the sender's address
//!
//! ## Feature Flags
//!
//! - `channel`: in-process channel endpoint
//! - `udp`: UDP datagram endpoint
//! - `all`: everything
//!
//! ## Example: UDP listener
//!
//! ```no_run
//! use eventcalls_core::{CallbackHandler, Routine};
//! use eventcalls_transports::udp::DatagramEndpoint;
//!
//! let endpoint = DatagramEndpoint::bind(5005)?;
//! let handler = CallbackHandler::new().with_data(|evt| {
//!     println!("{:?} from {:?}", evt.bytes(), evt.peer());
//! });
//!
//! let routine = Routine::spawn(endpoint, handler)?;
//! std::thread::sleep(std::time::Duration::from_secs(10));
//! routine.stop();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;

#[cfg(feature = "channel")]
pub mod channel;

#[cfg(feature = "udp")]
pub mod udp;

pub use config::{ChannelConfig, DatagramConfig};

#[cfg(feature = "channel")]
pub use channel::{channel_pair, ChannelEndpoint, ChannelFeeder};

#[cfg(feature = "udp")]
pub use udp::DatagramEndpoint;
