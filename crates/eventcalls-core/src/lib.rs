// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # eventcalls-core
//!
//! A threaded way of turning a blocking byte endpoint into event callbacks.
//!
//! A [`Routine`] owns one [`Endpoint`] and one [`Handler`]. Once started it
//! opens the endpoint, calls [`Handler::on_initialized`], and runs a reader
//! thread that forwards every chunk to [`Handler::on_data`]. End-of-stream, a
//! read error, or [`Routine::stop`] ends the reader, which closes the endpoint
//! and calls [`Handler::on_finalized`] exactly once. Any thread may call
//! [`Routine::write`] at any time; writes go straight to the endpoint.
//!
//! ## Example
//!
//! ```no_run
//! use eventcalls_core::{CallbackHandler, Endpoint, Routine};
//!
//! fn run(endpoint: impl Endpoint + 'static) -> eventcalls_core::RoutineResult<()> {
//!     let handler = CallbackHandler::new()
//!         .with_initialized(|_| println!("ready"))
//!         .with_data(|evt| println!("got {} bytes", evt.len()))
//!         .with_finalized(|evt| println!("done (error: {})", evt.is_error()));
//!
//!     let routine = Routine::spawn(endpoint, handler)?;
//!     routine.write(b"ping").ok();
//!     routine.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! 1. **Events**: payloads passed to handlers
//! 2. **Traits**: the [`Endpoint`] and [`Handler`] capability contracts
//! 3. **Routine**: the lifecycle state machine and reader thread

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod handler;
pub mod routine;

pub use config::RoutineConfig;
pub use endpoint::{Endpoint, ReadOutcome};
pub use error::{EndpointError, EndpointResult, RoutineError, RoutineResult};
pub use event::{DataEvent, FinalEvent, InitEvent};
pub use handler::{CallbackHandler, Handler};
pub use routine::{Routine, RoutineHandle, RoutineState};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::endpoint::*;
    pub use crate::error::*;
    pub use crate::event::*;
    pub use crate::handler::*;
    pub use crate::routine::*;
}
