//! Per-kind event buses.
//!
//! A bus owns the registrations of one event kind:
//! - [`TimerBus`] keeps an ordered deadline queue and fires on time,
//! - [`HandleBus`] watches raw handles through a [`Poller`](crate::Poller),
//! - [`SignalBus`] fires on signals reported from outside.
//!
//! Each bus has its own lock; operations on different buses never contend.
//! Buses hold weak references, so dropping an event detaches it: it never
//! fires and its bookkeeping is pruned lazily.

mod handle;
mod signal;
mod timer;

pub use handle::HandleBus;
pub use signal::SignalBus;
pub use timer::TimerBus;

use crate::error::Result;

use std::sync::Arc;
use std::time::Duration;

/// Registration and dispatch of one event kind.
pub trait Bus: Send + Sync {
    type Event;

    /// Registers an idle event and marks it pending.
    ///
    /// Fails with [`Error::Pending`](crate::Error::Pending) if the event is
    /// already registered anywhere.
    fn add_event(&self, event: &Arc<Self::Event>) -> Result<()>;

    /// Unregisters a pending event and clears its pending flag.
    ///
    /// Fails with [`Error::NotPending`](crate::Error::NotPending) if the
    /// event is not registered with this bus.
    fn del_event(&self, event: &Self::Event) -> Result<()>;

    /// Fires every ready event and returns how long the caller may idle.
    ///
    /// `None` means this bus puts no bound on the idle time.
    fn dispatch(&self) -> Option<Duration>;

    /// Number of registrations, including ones whose event was dropped but
    /// not yet pruned.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
