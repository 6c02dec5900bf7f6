//! Readiness poller abstraction.
//!
//! The buses never talk to the operating system directly. Handle
//! registration and the blocking wait go through the [`Poller`] trait, so
//! any readiness mechanism can sit behind the dispatcher.
//!
//! On Linux an `epoll` backend is provided as [`EpollPoller`].

mod common;

#[cfg(target_os = "linux")]
mod epoll;

pub use common::{Interest, Readiness};

#[cfg(target_os = "linux")]
pub use epoll::EpollPoller;

use crate::event::RawHandle;

use std::io;
use std::time::Duration;

/// A readiness notification mechanism for raw handles.
///
/// Every method takes `&self`: registration may happen from any thread while
/// the dispatch thread is blocked in [`poll`](Self::poll).
pub trait Poller: Send + Sync {
    /// Starts watching `handle` for `interest`.
    fn register(&self, handle: RawHandle, interest: Interest) -> io::Result<()>;

    /// Replaces the interest of an already watched handle.
    fn reregister(&self, handle: RawHandle, interest: Interest) -> io::Result<()>;

    /// Stops watching `handle`.
    fn deregister(&self, handle: RawHandle) -> io::Result<()>;

    /// Blocks until a watched handle is ready, [`wake`](Self::wake) is called,
    /// or `timeout` elapses. `None` waits indefinitely.
    ///
    /// `ready` is cleared and filled with at most one entry per handle.
    fn poll(&self, ready: &mut Vec<Readiness>, timeout: Option<Duration>) -> io::Result<()>;

    /// Interrupts a concurrent or the next [`poll`](Self::poll).
    fn wake(&self) -> io::Result<()>;
}
