// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Handler trait and a closure-backed implementation

use crate::event::{DataEvent, FinalEvent, InitEvent};

/// Receiver of a routine's lifecycle and data events
///
/// Callbacks run on the routine's reader thread, except `on_initialized` and
/// an open-failure `on_finalized`, which run on the thread calling `start()`.
/// They are never invoked concurrently.
///
/// Ordering per routine: `on_initialized` (absent if open failed), then every
/// `on_data` in endpoint order, then exactly one `on_finalized`.
pub trait Handler: Send {
    fn on_initialized(&mut self, event: InitEvent);

    fn on_data(&mut self, event: DataEvent);

    fn on_finalized(&mut self, event: FinalEvent);
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn on_initialized(&mut self, event: InitEvent) {
        (**self).on_initialized(event)
    }

    fn on_data(&mut self, event: DataEvent) {
        (**self).on_data(event)
    }

    fn on_finalized(&mut self, event: FinalEvent) {
        (**self).on_finalized(event)
    }
}

type InitFn = Box<dyn FnMut(InitEvent) + Send>;
type DataFn = Box<dyn FnMut(DataEvent) + Send>;
type FinalFn = Box<dyn FnMut(FinalEvent) + Send>;

/// Handler assembled from closures
///
/// Callbacks that are not set do nothing.
///
/// # Example
/// ```
/// use eventcalls_core::CallbackHandler;
///
/// let handler = CallbackHandler::new()
///     .with_data(|evt| println!("{} bytes", evt.len()))
///     .with_finalized(|evt| {
///         if let Some(cause) = evt.cause() {
///             eprintln!("closed: {}", cause);
///         }
///     });
/// # let _ = handler;
/// ```
#[derive(Default)]
pub struct CallbackHandler {
    init: Option<InitFn>,
    data: Option<DataFn>,
    done: Option<FinalFn>,
}

impl CallbackHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initialized<F>(mut self, f: F) -> Self
    where
        F: FnMut(InitEvent) + Send + 'static,
    {
        self.init = Some(Box::new(f));
        self
    }

    pub fn with_data<F>(mut self, f: F) -> Self
    where
        F: FnMut(DataEvent) + Send + 'static,
    {
        self.data = Some(Box::new(f));
        self
    }

    pub fn with_finalized<F>(mut self, f: F) -> Self
    where
        F: FnMut(FinalEvent) + Send + 'static,
    {
        self.done = Some(Box::new(f));
        self
    }
}

impl Handler for CallbackHandler {
    fn on_initialized(&mut self, event: InitEvent) {
        if let Some(f) = self.init.as_mut() {
            f(event);
        }
    }

    fn on_data(&mut self, event: DataEvent) {
        if let Some(f) = self.data.as_mut() {
            f(event);
        }
    }

    fn on_finalized(&mut self, event: FinalEvent) {
        if let Some(f) = self.done.as_mut() {
            f(event);
        }
    }
}

impl std::fmt::Debug for CallbackHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandler")
            .field("init", &self.init.is_some())
            .field("data", &self.data.is_some())
            .field("done", &self.done.is_some())
            .finish()
    }
}
