//! Linux `epoll`-based poller.
//!
//! Owns:
//! - an `epoll` instance,
//! - an internal `eventfd` registered as a persistent wake source,
//! - a reusable event buffer.
//!
//! Handles are used as their own tokens. The wake source uses a reserved
//! token that no file descriptor can collide with.

use super::{Interest, Poller, Readiness};
use crate::event::RawHandle;

use libc::{
    EFD_CLOEXEC, EFD_NONBLOCK, EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD,
    EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLOUT, epoll_create1, epoll_ctl, epoll_event, epoll_wait,
    eventfd,
};
use std::io;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Token of the internal eventfd; never a valid descriptor.
const WAKE_TOKEN: u64 = u64::MAX;

/// Events returned per wait by [`EpollPoller::new`].
const DEFAULT_CAPACITY: usize = 64;

/// A [`Poller`] backed by Linux `epoll`.
///
/// Registrations are level-triggered. [`wake`](Poller::wake) writes to an
/// internal `eventfd`, which makes a concurrent or the next
/// [`poll`](Poller::poll) return with no readiness.
pub struct EpollPoller {
    /// The epoll instance.
    epoll: RawHandle,

    /// Non-blocking eventfd written by [`Poller::wake`].
    waker: RawHandle,

    /// Buffer handed to `epoll_wait`, reused across polls.
    events: Mutex<Vec<epoll_event>>,
}

impl EpollPoller {
    /// Creates a poller returning at most 64 events per wait.
    pub fn new() -> io::Result<Self> {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a poller returning at most `capacity` events per wait.
    pub fn with_capacity(capacity: usize) -> io::Result<Self> {
        let epoll = cvt(unsafe { epoll_create1(EPOLL_CLOEXEC) })?;

        let waker = match cvt(unsafe { eventfd(0, EFD_NONBLOCK | EFD_CLOEXEC) }) {
            Ok(fd) => fd,
            Err(err) => {
                unsafe { libc::close(epoll) };
                return Err(err);
            }
        };

        let poller = Self {
            epoll,
            waker,
            events: Mutex::new(Vec::with_capacity(capacity.max(1))),
        };

        poller.ctl(EPOLL_CTL_ADD, waker, EPOLLIN as u32, WAKE_TOKEN)?;

        Ok(poller)
    }

    /// Issues one `epoll_ctl` operation.
    fn ctl(&self, op: libc::c_int, fd: RawHandle, events: u32, token: u64) -> io::Result<()> {
        let mut event = epoll_event { events, u64: token };

        cvt(unsafe { epoll_ctl(self.epoll, op, fd, &mut event) })?;
        Ok(())
    }

    /// Resets the eventfd counter so the next wait can block again.
    fn drain_waker(&self) {
        let mut buf = 0u64;

        unsafe {
            libc::read(self.waker, &mut buf as *mut u64 as *mut libc::c_void, 8);
        }
    }
}

/// Converts an [`Interest`] into epoll event bits.
fn flags(interest: Interest) -> u32 {
    let mut flags = 0;

    if interest.read {
        flags |= EPOLLIN;
    }
    if interest.write {
        flags |= EPOLLOUT;
    }

    flags as u32
}

/// Maps a negative libc return code to the last OS error.
fn cvt(rc: libc::c_int) -> io::Result<libc::c_int> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc)
    }
}

impl Poller for EpollPoller {
    fn register(&self, handle: RawHandle, interest: Interest) -> io::Result<()> {
        self.ctl(EPOLL_CTL_ADD, handle, flags(interest), handle as u64)
    }

    fn reregister(&self, handle: RawHandle, interest: Interest) -> io::Result<()> {
        self.ctl(EPOLL_CTL_MOD, handle, flags(interest), handle as u64)
    }

    fn deregister(&self, handle: RawHandle) -> io::Result<()> {
        cvt(unsafe { epoll_ctl(self.epoll, EPOLL_CTL_DEL, handle, std::ptr::null_mut()) })?;
        Ok(())
    }

    fn poll(&self, ready: &mut Vec<Readiness>, timeout: Option<Duration>) -> io::Result<()> {
        let timeout_ms = timeout
            .map(|t| t.as_millis().min(libc::c_int::MAX as u128) as libc::c_int)
            .unwrap_or(-1);

        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.clear();

        ready.clear();

        let n = unsafe {
            epoll_wait(
                self.epoll,
                events.as_mut_ptr(),
                events.capacity() as libc::c_int,
                timeout_ms,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        unsafe {
            events.set_len(n as usize);
        }

        for event in events.iter() {
            let token = event.u64;
            let bits = event.events;

            if token == WAKE_TOKEN {
                self.drain_waker();
                continue;
            }

            let handle = token as RawHandle;
            let readable = bits & ((EPOLLIN | EPOLLERR | EPOLLHUP) as u32) != 0;
            let writable = bits & ((EPOLLOUT | EPOLLERR) as u32) != 0;

            if let Some(r) = ready.iter_mut().find(|r| r.handle == handle) {
                r.readable |= readable;
                r.writable |= writable;
            } else {
                ready.push(Readiness {
                    handle,
                    readable,
                    writable,
                });
            }
        }

        Ok(())
    }

    fn wake(&self) -> io::Result<()> {
        let buf: u64 = 1;

        let n = unsafe { libc::write(self.waker, &buf as *const u64 as *const libc::c_void, 8) };
        if n < 0 {
            let err = io::Error::last_os_error();
            // counter saturated: a wake is already queued
            if err.kind() == io::ErrorKind::WouldBlock {
                return Ok(());
            }
            return Err(err);
        }

        Ok(())
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.waker);
            libc::close(self.epoll);
        }
    }
}
