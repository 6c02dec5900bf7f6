use super::{Callback, EventCore, EventId, EventKind, HandleCallback};
use crate::error::Result;
use crate::poller::Interest;

use std::fmt;

/// An opaque, externally owned I/O handle.
pub type RawHandle = std::os::fd::RawFd;

/// Which readiness a [`HandleEvent`] waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Write,
}

impl Operation {
    /// The poller interest that covers this operation.
    pub fn interest(self) -> Interest {
        match self {
            Operation::Read => Interest::READ,
            Operation::Write => Interest::WRITE,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Read => write!(f, "read"),
            Operation::Write => write!(f, "write"),
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct HandleFields {
    pub(crate) handle: RawHandle,
    pub(crate) operation: Operation,
}

/// An event that fires when an I/O handle becomes ready for an operation.
///
/// The event never owns the handle; it only names it to the poller. The
/// handle must stay open while the event is pending.
pub struct HandleEvent {
    core: EventCore<HandleFields>,
}

impl HandleEvent {
    /// Creates an event waiting for `operation` on `handle`.
    pub fn new(
        handle: RawHandle,
        operation: Operation,
        callback: impl HandleCallback + 'static,
    ) -> Self {
        Self::with_callback(handle, operation, Callback::handle(callback))
    }

    /// Creates an event sharing an existing callback.
    ///
    /// # Panics
    ///
    /// Panics if `callback` is not a [`Callback::Handle`].
    pub fn with_callback(handle: RawHandle, operation: Operation, callback: Callback) -> Self {
        Self {
            core: EventCore::new(
                EventKind::Handle,
                callback,
                HandleFields { handle, operation },
            ),
        }
    }

    /// Process-unique identity of this event.
    pub fn id(&self) -> EventId {
        self.core.id()
    }

    /// Always [`EventKind::Handle`].
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

    /// Replaces the callback. Fails while pending.
    ///
    /// # Panics
    ///
    /// Panics if `callback` is not a [`Callback::Handle`].
    pub fn set_callback(&self, callback: Callback) -> Result<()> {
        self.core.set_callback(callback)
    }

    /// The watched handle.
    pub fn handle(&self) -> RawHandle {
        self.core.fields(|fields| fields.handle)
    }

    /// Points the event at another handle. Fails while pending.
    pub fn set_handle(&self, handle: RawHandle) -> Result<()> {
        self.core
            .update("set handle", |fields| fields.handle = handle)
    }

    /// The readiness this event waits for.
    pub fn operation(&self) -> Operation {
        self.core.fields(|fields| fields.operation)
    }

    /// Changes the awaited readiness. Fails while pending.
    pub fn set_operation(&self, operation: Operation) -> Result<()> {
        self.core
            .update("set operation", |fields| fields.operation = operation)
    }

    pub(crate) fn core(&self) -> &EventCore<HandleFields> {
        &self.core
    }
}

impl fmt::Debug for HandleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleEvent")
            .field("id", &self.id())
            .field("handle", &self.handle())
            .field("operation", &self.operation())
            .field("pending", &self.is_pending())
            .finish()
    }
}
