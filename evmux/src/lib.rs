//! # evmux
//!
//! **evmux** is a reactor-style event multiplexer. A process registers
//! heterogeneous event sources (timers, I/O handle readiness, signals) and a
//! central [`Dispatcher`] repeatedly fires the ready ones and computes how
//! long it may safely idle before the next deadline.
//!
//! The pieces, leaves first:
//!
//! - **Events**: [`TimerEvent`], [`HandleEvent`] and [`SignalEvent`], each
//!   carrying a kind tag, a [`Callback`] and a pending flag
//! - **Buses**: one per kind ([`TimerBus`], [`HandleBus`], [`SignalBus`]),
//!   behind the [`Bus`] trait
//! - **Dispatcher**: routes events to their bus and runs the
//!   poll → dispatch → recompute-idle cycle
//!
//! Time comes from an injected [`Clock`] and handle readiness from an
//! injected [`Poller`], so both can be replaced in tests.
//!
//! ## Quick Start
//!
//! ```rust
//! use evmux::{Dispatcher, ManualClock, TimerEvent};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//!
//! let clock = Arc::new(ManualClock::new(0));
//! let dispatcher = Dispatcher::builder().clock(clock.clone()).build();
//!
//! let fired = Arc::new(AtomicUsize::new(0));
//! let timer = dispatcher.timer_event({
//!     let fired = fired.clone();
//!     move |_: &TimerEvent| {
//!         fired.fetch_add(1, Ordering::SeqCst);
//!     }
//! });
//!
//! timer.set_timeout(Duration::from_millis(10)).unwrap();
//! dispatcher.add_event(&timer).unwrap();
//!
//! assert_eq!(dispatcher.dispatch().unwrap(), Some(Duration::from_millis(10)));
//!
//! clock.advance(10);
//! assert_eq!(dispatcher.dispatch().unwrap(), None);
//! assert_eq!(fired.load(Ordering::SeqCst), 1);
//! ```
//!
//! ## Modules
//!
//! - [`event`]: events and callbacks
//! - [`bus`]: per-kind buses
//! - [`poller`]: readiness poller abstraction and the Linux backend
//! - [`clock`]: millisecond clock sources

pub mod bus;
pub mod clock;
pub mod event;
pub mod poller;

mod dispatcher;
mod error;

pub use bus::{Bus, HandleBus, SignalBus, TimerBus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{Error, ErrorKind, Result};
pub use event::{
    Callback, Event, EventId, EventKind, EventRef, HandleCallback, HandleEvent, Operation,
    RawHandle, Signal, SignalCallback, SignalEvent, TIMER_DELAY_MAX, TimerCallback, TimerEvent,
};
pub use poller::{Interest, Poller, Readiness};

#[cfg(target_os = "linux")]
pub use poller::EpollPoller;
