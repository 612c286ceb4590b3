// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Routine: one endpoint, one handler, one reader thread
//!
//! # Lifecycle
//! ```text
//! Idle -> Starting -> Running -> Stopping -> Stopped
//!            |                                 ^
//!            +-- open failed / init panicked --+
//! ```
//! `Stopped` is terminal. Whichever path first moves the state to `Stopped`
//! (the reader on end-of-stream/error, or `start` on open failure or a
//! panicking `on_initialized`) owns the close + `on_finalized` step, so the
//! handler is finalized exactly once.
//!
//! `stop()` never finalizes by itself: it closes the endpoint, which unblocks
//! the reader, and waits until the reader has finalized and exited. On a
//! routine that already stopped on its own it closes nothing and only waits
//! for a finalize still in flight.

use crate::config::RoutineConfig;
use crate::endpoint::{Endpoint, ReadOutcome};
use crate::error::{EndpointError, EndpointResult, RoutineError, RoutineResult};
use crate::event::{FinalEvent, InitEvent};
use crate::handler::Handler;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, error, info, warn};

/// Lifecycle state of a [`Routine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutineState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl RoutineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl fmt::Display for RoutineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Lifecycle {
    state: RoutineState,
    reader: Option<JoinHandle<()>>,
    /// Thread currently allowed to run callbacks (starter, then reader)
    dispatch_thread: Option<ThreadId>,
    /// Set once `on_finalized` has returned
    finalized: bool,
    /// A `stop()` caller has taken the reader handle and is joining it
    joining: bool,
}

/// State shared between the routine, its handles, and the reader thread
struct Core<E> {
    endpoint: E,
    name: String,
    lifecycle: Mutex<Lifecycle>,
    finished: Condvar,
}

/// Marks the routine finalized even if `on_finalized` panics
struct FinalizedGuard<'a> {
    lifecycle: &'a Mutex<Lifecycle>,
    finished: &'a Condvar,
}

impl Drop for FinalizedGuard<'_> {
    fn drop(&mut self) {
        self.lifecycle.lock().finalized = true;
        self.finished.notify_all();
    }
}

impl<E: Endpoint> Core<E> {
    fn new(endpoint: E) -> Self {
        let name = endpoint.describe();
        Self {
            endpoint,
            name,
            lifecycle: Mutex::new(Lifecycle {
                state: RoutineState::Idle,
                reader: None,
                dispatch_thread: None,
                finalized: false,
                joining: false,
            }),
            finished: Condvar::new(),
        }
    }

    fn state(&self) -> RoutineState {
        self.lifecycle.lock().state
    }

    fn close_endpoint(&self) {
        if let Err(e) = self.endpoint.close() {
            debug!("[ROUTINE] Ignoring close error on {}: {}", self.name, e);
        }
    }

    /// Move to `Stopped` and notify the handler, unless another path already did
    fn finish<H: Handler>(
        &self,
        handler: &Mutex<H>,
        cause: Option<EndpointError>,
        close_endpoint: bool,
    ) {
        {
            let mut lc = self.lifecycle.lock();
            match lc.state {
                RoutineState::Starting | RoutineState::Running | RoutineState::Stopping => {
                    lc.state = RoutineState::Stopped;
                }
                RoutineState::Idle | RoutineState::Stopped => {
                    debug!("[ROUTINE] {} already finalized", self.name);
                    return;
                }
            }
        }

        if close_endpoint {
            self.close_endpoint();
        }

        let _guard = FinalizedGuard {
            lifecycle: &self.lifecycle,
            finished: &self.finished,
        };
        debug!(
            "[ROUTINE] Finalizing {} (error: {})",
            self.name,
            cause.is_some()
        );
        handler.lock().on_finalized(FinalEvent::from(cause));
    }

    fn stop(&self) {
        let (in_callback, already_stopped) = {
            let mut lc = self.lifecycle.lock();
            let already_stopped = match lc.state {
                RoutineState::Idle => {
                    debug!("[ROUTINE] stop() on {} ignored: idle", self.name);
                    return;
                }
                RoutineState::Stopped => true,
                RoutineState::Starting | RoutineState::Running => {
                    lc.state = RoutineState::Stopping;
                    false
                }
                RoutineState::Stopping => false,
            };
            (
                lc.dispatch_thread == Some(thread::current().id()),
                already_stopped,
            )
        };

        if already_stopped {
            debug!("[ROUTINE] stop() on {}: already stopped", self.name);
        } else {
            debug!("[ROUTINE] Stopping {}", self.name);
            self.close_endpoint();
        }

        // Called from a callback: the dispatching thread finalizes once it returns.
        if in_callback {
            debug!(
                "[ROUTINE] stop() called from a callback on {}; finalize deferred",
                self.name
            );
            return;
        }

        let reader = {
            let mut lc = self.lifecycle.lock();
            while !lc.finalized {
                self.finished.wait(&mut lc);
            }
            let reader = lc.reader.take();
            if reader.is_some() {
                lc.joining = true;
            } else {
                // Another stop() owns the join; wait until the reader has exited
                while lc.joining {
                    self.finished.wait(&mut lc);
                }
            }
            reader
        };

        if let Some(handle) = reader {
            if handle.join().is_err() {
                warn!(
                    "[ROUTINE] Reader thread for {} panicked during shutdown",
                    self.name
                );
            }
            self.lifecycle.lock().joining = false;
            self.finished.notify_all();
        }

        debug!("[ROUTINE] {} fully stopped", self.name);
    }
}

/// Threaded adapter turning a blocking [`Endpoint`] into [`Handler`] callbacks
///
/// # Example
/// ```no_run
/// use eventcalls_core::{CallbackHandler, Routine};
/// # use eventcalls_core::Endpoint;
/// # fn demo<E: Endpoint + 'static>(endpoint: E) -> Result<(), Box<dyn std::error::Error>> {
/// let handler = CallbackHandler::new().with_data(|evt| println!("{:?}", evt.bytes()));
/// let routine = Routine::new(endpoint, handler);
/// routine.start()?;
/// routine.write(b"hello")?;
/// routine.stop();
/// # Ok(())
/// # }
/// ```
pub struct Routine<E: Endpoint + 'static, H: Handler + 'static> {
    core: Arc<Core<E>>,
    handler: Arc<Mutex<H>>,
    config: RoutineConfig,
}

impl<E: Endpoint + 'static, H: Handler + 'static> Routine<E, H> {
    /// Create an idle routine; call [`start`](Self::start) to begin reading
    pub fn new(endpoint: E, handler: H) -> Self {
        Self::with_config(endpoint, handler, RoutineConfig::default())
    }

    pub fn with_config(endpoint: E, handler: H, config: RoutineConfig) -> Self {
        Self {
            core: Arc::new(Core::new(endpoint)),
            handler: Arc::new(Mutex::new(handler)),
            config,
        }
    }

    /// Create a routine and start it immediately
    pub fn spawn(endpoint: E, handler: H) -> RoutineResult<Self> {
        let routine = Self::new(endpoint, handler);
        routine.start()?;
        Ok(routine)
    }

    /// Open the endpoint and launch the reader thread
    ///
    /// A no-op unless the routine is `Idle`. An open failure is not returned:
    /// it is delivered to the handler through `on_finalized` and the routine
    /// ends up `Stopped`. The only error returned is a failure to spawn the
    /// reader thread (the handler is finalized in that case too).
    pub fn start(&self) -> RoutineResult<()> {
        let core = &self.core;
        {
            let mut lc = core.lifecycle.lock();
            if lc.state != RoutineState::Idle {
                debug!("[ROUTINE] start() on {} ignored: {}", core.name, lc.state);
                return Ok(());
            }
            lc.state = RoutineState::Starting;
            lc.dispatch_thread = Some(thread::current().id());
        }

        debug!("[ROUTINE] Opening {}", core.name);
        if let Err(e) = core.endpoint.open() {
            warn!("[ROUTINE] Failed to open {}: {}", core.name, e);
            core.finish(&self.handler, Some(e), false);
            return Ok(());
        }

        let initialized = panic::catch_unwind(AssertUnwindSafe(|| {
            self.handler.lock().on_initialized(InitEvent);
        }));
        if let Err(payload) = initialized {
            let msg = panic_message(payload.as_ref());
            error!("[ROUTINE] on_initialized for {} panicked: {}", core.name, msg);
            core.finish(&self.handler, Some(EndpointError::ReaderPanicked(msg)), true);
            return Ok(());
        }

        let mut lc = core.lifecycle.lock();
        if lc.state != RoutineState::Starting {
            // stop() won the race while the endpoint was opening
            drop(lc);
            core.finish(&self.handler, None, true);
            return Ok(());
        }
        lc.state = RoutineState::Running;

        let thread_name = self
            .config
            .thread_name
            .clone()
            .unwrap_or_else(|| format!("eventcalls-{}", core.name));
        let reader_core = Arc::clone(core);
        let reader_handler = Arc::clone(&self.handler);
        let detailed_errors = self.config.detailed_errors;

        let spawned = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || run_reader(reader_core, reader_handler, detailed_errors));

        match spawned {
            Ok(handle) => {
                lc.dispatch_thread = Some(handle.thread().id());
                lc.reader = Some(handle);
                drop(lc);
                info!("[ROUTINE] Running on {}", core.name);
                Ok(())
            }
            Err(source) => {
                drop(lc);
                error!(
                    "[ROUTINE] Failed to spawn reader '{}' for {}: {}",
                    thread_name, core.name, source
                );
                core.finish(
                    &self.handler,
                    Some(EndpointError::Other(format!(
                        "reader thread could not be spawned: {}",
                        source
                    ))),
                    true,
                );
                Err(RoutineError::Spawn {
                    name: thread_name,
                    source,
                })
            }
        }
    }

    /// Close the endpoint and wait for the reader to finalize and exit
    ///
    /// A no-op on an `Idle` routine. On a `Stopped` routine nothing is closed
    /// or finalized again; the call only waits for a finalize still in flight.
    /// When called from inside a handler callback it only closes the endpoint
    /// and returns; finalization follows as soon as the callback returns.
    pub fn stop(&self) {
        self.core.stop();
    }

    /// `true` iff the routine is `Running`; may be stale as soon as it returns
    pub fn is_running(&self) -> bool {
        self.core.state() == RoutineState::Running
    }

    pub fn state(&self) -> RoutineState {
        self.core.state()
    }

    /// Pass `data` straight to the endpoint
    ///
    /// Never checks whether the endpoint is open. Errors go to the caller and
    /// never reach the handler.
    pub fn write(&self, data: &[u8]) -> EndpointResult<()> {
        self.core.endpoint.write(data)
    }

    pub fn endpoint(&self) -> &E {
        &self.core.endpoint
    }

    /// Lock the handler for inspection
    ///
    /// Must not be called from inside a callback of the same routine.
    pub fn handler(&self) -> MutexGuard<'_, H> {
        self.handler.lock()
    }

    pub fn config(&self) -> &RoutineConfig {
        &self.config
    }

    /// Cloneable handle for stopping or writing from other places, including callbacks
    pub fn handle(&self) -> RoutineHandle<E> {
        RoutineHandle {
            core: Arc::clone(&self.core),
        }
    }
}

impl<E: Endpoint + 'static, H: Handler + 'static> Drop for Routine<E, H> {
    fn drop(&mut self) {
        if self.config.stop_on_drop {
            self.core.stop();
        }
    }
}

impl<E: Endpoint + 'static, H: Handler + 'static> fmt::Debug for Routine<E, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routine")
            .field("endpoint", &self.core.name)
            .field("state", &self.core.state())
            .finish()
    }
}

/// Control handle to a routine, without access to its handler
pub struct RoutineHandle<E> {
    core: Arc<Core<E>>,
}

impl<E> Clone for RoutineHandle<E> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<E: Endpoint> RoutineHandle<E> {
    /// See [`Routine::stop`]
    pub fn stop(&self) {
        self.core.stop();
    }

    pub fn is_running(&self) -> bool {
        self.core.state() == RoutineState::Running
    }

    pub fn state(&self) -> RoutineState {
        self.core.state()
    }

    /// See [`Routine::write`]
    pub fn write(&self, data: &[u8]) -> EndpointResult<()> {
        self.core.endpoint.write(data)
    }

    pub fn endpoint(&self) -> &E {
        &self.core.endpoint
    }
}

impl<E> fmt::Debug for RoutineHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutineHandle")
            .field("endpoint", &self.core.name)
            .finish()
    }
}

fn run_reader<E: Endpoint, H: Handler>(
    core: Arc<Core<E>>,
    handler: Arc<Mutex<H>>,
    detailed_errors: bool,
) {
    debug!("[ROUTINE] Reader started for {}", core.name);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| read_loop(&core, &handler)));

    let cause = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) if core.state() == RoutineState::Stopping => {
            // Closing the endpoint is how stop() unblocks the read
            debug!(
                "[ROUTINE] Read on {} interrupted by stop(): {}",
                core.name, e
            );
            None
        }
        Ok(Err(e)) => {
            if detailed_errors {
                error!("[ROUTINE] Error reading from {}: {:?}", core.name, e);
            } else {
                error!("[ROUTINE] Failed to read from {}: {}", core.name, e);
            }
            Some(e)
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            error!("[ROUTINE] Reader for {} panicked: {}", core.name, msg);
            Some(EndpointError::ReaderPanicked(msg))
        }
    };

    core.finish(&handler, cause, true);
    debug!("[ROUTINE] Reader exited for {}", core.name);
}

fn read_loop<E: Endpoint, H: Handler>(core: &Core<E>, handler: &Mutex<H>) -> EndpointResult<()> {
    loop {
        match core.endpoint.read_chunk()? {
            ReadOutcome::Data(chunk) => handler.lock().on_data(chunk),
            ReadOutcome::EndOfStream => {
                debug!("[ROUTINE] End of stream on {}", core.name);
                return Ok(());
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests;
