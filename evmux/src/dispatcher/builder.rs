use super::Dispatcher;
use crate::clock::{Clock, SystemClock};
use crate::poller::Poller;

use std::sync::Arc;
use std::time::Duration;

/// Builder for configuring and creating a dispatcher.
///
/// # Examples
///
/// ```rust
/// use evmux::{DispatcherBuilder, ManualClock};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let dispatcher = DispatcherBuilder::new()
///     .clock(Arc::new(ManualClock::new(0)))
///     .idle_interval(Duration::from_millis(5))
///     .build();
///
/// assert!(dispatcher.handles().is_none());
/// ```
pub struct DispatcherBuilder {
    /// Time source for timers; a [`SystemClock`] when unset.
    clock: Option<Arc<dyn Clock>>,

    /// Readiness poller; handle events are refused without one.
    poller: Option<Arc<dyn Poller>>,

    /// Longest sleep of [`Dispatcher::run_until`] when there is no poller.
    idle_interval: Duration,
}

impl DispatcherBuilder {
    /// Creates a builder with a system clock, no poller and a 10ms idle
    /// interval.
    pub fn new() -> Self {
        Self {
            clock: None,
            poller: None,
            idle_interval: Duration::from_millis(10),
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Enables handle events, using `poller` to wait for readiness.
    pub fn poller(mut self, poller: Arc<dyn Poller>) -> Self {
        self.poller = Some(poller);
        self
    }

    /// Uses an `epoll` poller returning at most `capacity` events per wait.
    #[cfg(target_os = "linux")]
    pub fn epoll(self, capacity: usize) -> std::io::Result<Self> {
        let poller = crate::poller::EpollPoller::with_capacity(capacity)?;

        Ok(self.poller(Arc::new(poller)))
    }

    /// # Panics
    ///
    /// Panics if `interval` is zero.
    pub fn idle_interval(mut self, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "idle_interval must be > 0");

        self.idle_interval = interval;
        self
    }

    pub fn build(self) -> Dispatcher {
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>);

        Dispatcher::new(clock, self.poller, self.idle_interval)
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
