//! Events and their callbacks.
//!
//! An event is a caller-owned registration record: a kind tag, a callback,
//! the pending flag and the variant fields. The three variants are
//! [`TimerEvent`], [`HandleEvent`] and [`SignalEvent`]. Buses keep only weak
//! references to them, so the caller keeps each event alive in an [`Arc`]
//! for as long as it should be able to fire.
//!
//! While an event is pending, its callback and variant fields are frozen.
//! Every setter returns [`Error::Pending`](crate::Error::Pending) until the
//! event fires or is removed.

mod callback;
mod core;
mod handle;
mod signal;
mod timer;

pub(crate) use core::EventCore;

pub use callback::{Callback, HandleCallback, SignalCallback, TimerCallback};
pub use handle::{HandleEvent, Operation, RawHandle};
pub use signal::{Signal, SignalEvent};
pub use timer::{TIMER_DELAY_MAX, TimerEvent};

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// The variant tag of an event, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Timer,
    Handle,
    Signal,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Timer => write!(f, "timer"),
            EventKind::Handle => write!(f, "handle"),
            EventKind::Signal => write!(f, "signal"),
        }
    }
}

/// Process-unique identity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(u64);

impl EventId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);

        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A borrowed event of any kind, as handed to [`Callback::call`].
#[derive(Debug, Clone, Copy)]
pub enum EventRef<'a> {
    Timer(&'a TimerEvent),
    Handle(&'a HandleEvent),
    Signal(&'a SignalEvent),
}

impl EventRef<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            EventRef::Timer(_) => EventKind::Timer,
            EventRef::Handle(_) => EventKind::Handle,
            EventRef::Signal(_) => EventKind::Signal,
        }
    }

    pub fn id(&self) -> EventId {
        match self {
            EventRef::Timer(event) => event.id(),
            EventRef::Handle(event) => event.id(),
            EventRef::Signal(event) => event.id(),
        }
    }
}

/// A shared event of any kind, routed by its tag in
/// [`Dispatcher::add_event`](crate::Dispatcher::add_event).
#[derive(Debug, Clone)]
pub enum Event {
    Timer(Arc<TimerEvent>),
    Handle(Arc<HandleEvent>),
    Signal(Arc<SignalEvent>),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        self.as_event_ref().kind()
    }

    pub fn id(&self) -> EventId {
        self.as_event_ref().id()
    }

    pub fn is_pending(&self) -> bool {
        match self {
            Event::Timer(event) => event.is_pending(),
            Event::Handle(event) => event.is_pending(),
            Event::Signal(event) => event.is_pending(),
        }
    }

    pub fn as_event_ref(&self) -> EventRef<'_> {
        match self {
            Event::Timer(event) => EventRef::Timer(event),
            Event::Handle(event) => EventRef::Handle(event),
            Event::Signal(event) => EventRef::Signal(event),
        }
    }
}

macro_rules! impl_from_event {
    ($variant:ident, $ty:ty) => {
        impl From<Arc<$ty>> for Event {
            fn from(event: Arc<$ty>) -> Self {
                Event::$variant(event)
            }
        }

        impl From<&Arc<$ty>> for Event {
            fn from(event: &Arc<$ty>) -> Self {
                Event::$variant(Arc::clone(event))
            }
        }
    };
}

impl_from_event!(Timer, TimerEvent);
impl_from_event!(Handle, HandleEvent);
impl_from_event!(Signal, SignalEvent);
