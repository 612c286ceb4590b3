//! # eventcalls - a threaded way of achieving event callbacks
//!
//! `eventcalls` turns a blocking, byte-oriented endpoint (UDP socket, serial
//! port, in-process pipe) into callbacks: a background reader pulls chunks and
//! lifecycle events from the endpoint and dispatches them to a single
//! handler, while writers push outbound data from any thread.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! eventcalls = "1.1"  # Default: channel + UDP endpoints, config, logging
//! ```
//!
//! ```rust,no_run
//! use eventcalls::prelude::*;
//!
//! let endpoint = DatagramEndpoint::bind(5005)?;
//! let handler = CallbackHandler::new()
//!     .with_initialized(|_| println!("listening"))
//!     .with_data(|evt| println!("{} bytes from {:?}", evt.len(), evt.peer()))
//!     .with_finalized(|evt| println!("closed, error: {:?}", evt.cause()));
//!
//! let routine = Routine::spawn(endpoint, handler)?;
//! std::thread::sleep(std::time::Duration::from_secs(5));
//! routine.stop();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature Flags
//!
//! - **`transport-channel`** (default): in-process channel endpoint
//! - **`transport-udp`** (default): UDP datagram endpoint
//! - **`config`** (default): TOML configuration loader
//! - **`observability`** (default): logging initialization
//! - **`file-logging`**: rotated log files
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Core: eventcalls-core                                  │
//! │  (Endpoint + Handler traits, Routine state machine)     │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Endpoints: eventcalls-transports                       │
//! │  (in-process channel, UDP datagrams)                    │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Infrastructure: eventcalls-config, -observability      │
//! │  (TOML + overrides, tracing subscriber setup)           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

// Re-export core
pub use eventcalls_core::{
    CallbackHandler, DataEvent, Endpoint, EndpointError, EndpointResult, FinalEvent, Handler,
    InitEvent, ReadOutcome, Routine, RoutineConfig, RoutineError, RoutineHandle, RoutineResult,
    RoutineState,
};

// Re-export endpoints
pub use eventcalls_transports as transports;

// Re-export infrastructure
#[cfg(feature = "config")]
pub use eventcalls_config as config;

#[cfg(feature = "observability")]
pub use eventcalls_observability as observability;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use eventcalls_core::prelude::*;

    #[cfg(feature = "transport-channel")]
    pub use eventcalls_transports::channel::{channel_pair, ChannelEndpoint, ChannelFeeder};

    #[cfg(feature = "transport-udp")]
    pub use eventcalls_transports::udp::DatagramEndpoint;

    pub use eventcalls_transports::{ChannelConfig, DatagramConfig};
}
