use super::{Callback, EventCore, EventId, EventKind, SignalCallback};
use crate::error::Result;

use std::fmt;

/// A signal number, as delivered by the operating system.
pub type Signal = libc::c_int;

/// An event that fires when a signal is reported to its bus.
///
/// Delivery itself happens outside this crate: whatever catches the signal
/// reports it through [`Dispatcher::raise_signal`](crate::Dispatcher::raise_signal).
pub struct SignalEvent {
    core: EventCore<Signal>,
}

impl SignalEvent {
    /// Creates an event waiting for `signal`.
    pub fn new(signal: Signal, callback: impl SignalCallback + 'static) -> Self {
        Self::with_callback(signal, Callback::signal(callback))
    }

    /// Creates an event sharing an existing callback.
    ///
    /// # Panics
    ///
    /// Panics if `callback` is not a [`Callback::Signal`].
    pub fn with_callback(signal: Signal, callback: Callback) -> Self {
        Self {
            core: EventCore::new(EventKind::Signal, callback, signal),
        }
    }

    /// Process-unique identity of this event.
    pub fn id(&self) -> EventId {
        self.core.id()
    }

    /// Always [`EventKind::Signal`].
    pub fn kind(&self) -> EventKind {
        self.core.kind()
    }

    /// Whether the event is currently registered with a bus.
    pub fn is_pending(&self) -> bool {
        self.core.is_pending()
    }

    /// A shared handle to the current callback.
    pub fn callback(&self) -> Callback {
        self.core.callback()
    }

    /// Replaces the callback.
    ///
    /// # Panics
    ///
    /// Panics if `callback` is not a [`Callback::Signal`].
    pub fn set_callback(&self, callback: Callback) -> Result<()> {
        self.core.set_callback(callback)
    }

    /// The awaited signal number.
    pub fn signal(&self) -> Signal {
        self.core.fields(|signal| *signal)
    }

    /// Waits for another signal instead. Fails while pending.
    pub fn set_signal(&self, signal: Signal) -> Result<()> {
        self.core.update("set signal", |current| *current = signal)
    }

    pub(crate) fn core(&self) -> &EventCore<Signal> {
        &self.core
    }
}

impl fmt::Debug for SignalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalEvent")
            .field("id", &self.id())
            .field("signal", &self.signal())
            .field("pending", &self.is_pending())
            .finish()
    }
}
