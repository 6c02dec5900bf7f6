use super::DispatcherBuilder;
use crate::bus::{Bus, HandleBus, SignalBus, TimerBus};
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::event::{Event, EventId, EventKind, Signal, TimerCallback, TimerEvent};
use crate::poller::{Poller, Readiness};

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

/// The event dispatcher.
///
/// `Dispatcher` owns:
/// - a [`TimerBus`] sharing the dispatcher's clock,
/// - a [`SignalBus`],
/// - a [`HandleBus`] when a poller is configured.
///
/// Events are routed to their bus by kind. [`dispatch`](Self::dispatch) runs
/// one iteration of the reactor loop; the caller decides how many iterations
/// to run and when to stop.
pub struct Dispatcher {
    clock: Arc<dyn Clock>,

    timers: TimerBus,
    signals: SignalBus,
    handles: Option<HandleBus>,

    /// Buffer reused across polls.
    ready: Mutex<Vec<Readiness>>,

    idle_interval: Duration,
}

impl Dispatcher {
    pub(crate) fn new(
        clock: Arc<dyn Clock>,
        poller: Option<Arc<dyn Poller>>,
        idle_interval: Duration,
    ) -> Self {
        debug!(poller = poller.is_some(), "dispatcher created");

        Self {
            timers: TimerBus::new(clock.clone()),
            signals: SignalBus::new(),
            handles: poller.map(HandleBus::new),
            ready: Mutex::new(Vec::new()),
            clock,
            idle_interval,
        }
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// A dispatcher backed by an `epoll` poller and the system clock.
    #[cfg(target_os = "linux")]
    pub fn with_epoll() -> std::io::Result<Self> {
        let poller = crate::poller::EpollPoller::new()?;

        Ok(Self::builder().poller(Arc::new(poller)).build())
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn timers(&self) -> &TimerBus {
        &self.timers
    }

    pub fn signals(&self) -> &SignalBus {
        &self.signals
    }

    /// The handle bus, present only when a poller is configured.
    pub fn handles(&self) -> Option<&HandleBus> {
        self.handles.as_ref()
    }

    /// Creates an unarmed timer driven by this dispatcher's clock.
    pub fn timer_event(&self, callback: impl TimerCallback + 'static) -> Arc<TimerEvent> {
        Arc::new(TimerEvent::new(self.clock.clone(), callback))
    }

    /// Registers `event` with the bus matching its kind.
    ///
    /// A timer that becomes the earliest deadline wakes a concurrent
    /// [`dispatch`](Self::dispatch) blocked in the poller, so the wait is
    /// shortened to the new deadline.
    pub fn add_event(&self, event: impl Into<Event>) -> Result<()> {
        match event.into() {
            Event::Timer(event) => self.add_timer(&event),
            Event::Signal(event) => self.signals.add_event(&event),
            Event::Handle(event) => self.handle_bus(event.id())?.add_event(&event),
        }
    }

    /// Removes `event` from the bus matching its kind.
    pub fn del_event(&self, event: impl Into<Event>) -> Result<()> {
        match event.into() {
            Event::Timer(event) => self.timers.del_event(&event),
            Event::Signal(event) => self.signals.del_event(&event),
            Event::Handle(event) => self.handle_bus(event.id())?.del_event(&event),
        }
    }

    fn add_timer(&self, event: &Arc<TimerEvent>) -> Result<()> {
        let head = self.timers.next_deadline();
        self.timers.add_event(event)?;

        let Some(handles) = &self.handles else {
            return Ok(());
        };

        if head.is_none_or(|head| event.time_ms() < head) {
            trace!(event = %event.id(), "earlier deadline, waking poller");
            handles.poller().wake()?;
        }

        Ok(())
    }

    fn handle_bus(&self, id: EventId) -> Result<&HandleBus> {
        self.handles.as_ref().ok_or(Error::Unsupported {
            id,
            kind: EventKind::Handle,
        })
    }

    /// Reports a delivered signal and wakes a blocked [`dispatch`](Self::dispatch).
    pub fn raise_signal(&self, signal: Signal) -> Result<()> {
        self.signals.raise(signal);

        if let Some(handles) = &self.handles {
            handles.poller().wake()?;
        }

        Ok(())
    }

    /// Runs one iteration of the reactor loop.
    ///
    /// 1. Fires due timers and raised signals.
    /// 2. With a poller: waits for readiness no longer than the next timer
    ///    deadline, fires ready handles and new signals, then fires timers
    ///    that came due while waiting.
    ///
    /// Returns how long the caller may idle before the next deadline, or
    /// `None` if nothing bounds the idle time.
    pub fn dispatch(&self) -> Result<Option<Duration>> {
        let mut hint = self.timers.dispatch();
        self.signals.dispatch();

        if let Some(handles) = &self.handles {
            let timeout = if self.signals.has_raised() {
                Some(Duration::ZERO)
            } else {
                hint
            };

            {
                let mut ready = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
                handles.poller().poll(&mut ready, timeout)?;
                handles.report(ready.drain(..));
            }

            handles.dispatch();
            self.signals.dispatch();
            hint = self.timers.dispatch();
        }

        if self.signals.has_raised() {
            hint = Some(Duration::ZERO);
        }

        trace!(?hint, "dispatch iteration done");
        Ok(hint)
    }

    /// Dispatches until `stop` returns `true`, checked before every
    /// iteration.
    ///
    /// Without a poller, the thread sleeps between iterations for the hint,
    /// capped at the configured idle interval.
    pub fn run_until(&self, mut stop: impl FnMut(&Dispatcher) -> bool) -> Result<()> {
        debug!("dispatcher loop started");

        while !stop(self) {
            let hint = self.dispatch()?;

            if self.handles.is_none() {
                let idle = hint.map_or(self.idle_interval, |hint| hint.min(self.idle_interval));
                if !idle.is_zero() {
                    thread::sleep(idle);
                }
            }
        }

        debug!("dispatcher loop stopped");
        Ok(())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        DispatcherBuilder::new().build()
    }
}
