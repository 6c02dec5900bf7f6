use super::{Callback, EventCore, EventId, EventKind, TimerCallback};
use crate::clock::Clock;
use crate::error::Result;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Longest delay accepted by [`TimerEvent::set_timeout`], in milliseconds.
///
/// Longer delays are capped to this value (about 24.8 days).
pub const TIMER_DELAY_MAX: u64 = 0x7fff_ffff;

/// An event that fires once its absolute deadline has passed.
///
/// The deadline is fixed when [`set_timeout`](Self::set_timeout) is called,
/// not when the event is registered. A fresh timer has no deadline and must
/// be armed before it can be added to a bus.
///
/// # Examples
///
/// ```rust
/// use evmux::{Bus, ManualClock, TimerBus, TimerEvent};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let clock = Arc::new(ManualClock::new(100));
/// let bus = TimerBus::new(clock.clone());
///
/// let timer = Arc::new(TimerEvent::new(clock.clone(), |_: &TimerEvent| {}));
/// timer.set_timeout(Duration::from_millis(20)).unwrap();
/// assert_eq!(timer.time_ms(), 120);
///
/// bus.add_event(&timer).unwrap();
/// assert!(timer.is_pending());
/// ```
pub struct TimerEvent {
    /// Fields: the absolute fire time in milliseconds, 0 when unset.
    core: EventCore<u64>,
    clock: Arc<dyn Clock>,
}

impl TimerEvent {
    /// Creates an unarmed timer reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>, callback: impl TimerCallback + 'static) -> Self {
        Self::with_callback(clock, Callback::timer(callback))
    }

    /// Creates a timer sharing an existing callback.
    ///
    /// # Panics
    ///
    /// Panics if `callback` is not a [`Callback::Timer`].
    pub fn with_callback(clock: Arc<dyn Clock>, callback: Callback) -> Self {
        Self {
            core: EventCore::new(EventKind::Timer, callback, 0),
            clock,
        }
    }

    /// Process-unique identity of this event.
    pub fn id(&self) -> EventId {
        self.core.id()
    }

    /// Always [`EventKind::Timer`].
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
    /// Panics if `callback` is not a [`Callback::Timer`].
    pub fn set_callback(&self, callback: Callback) -> Result<()> {
        self.core.set_callback(callback)
    }

    /// Arms the timer to fire `delay` from now.
    ///
    /// The delay is truncated to whole milliseconds and capped at
    /// [`TIMER_DELAY_MAX`]. Fails while the event is pending, leaving the
    /// previous deadline untouched.
    pub fn set_timeout(&self, delay: Duration) -> Result<()> {
        let delay_ms = delay.as_millis().min(TIMER_DELAY_MAX as u128) as u64;
        let now = self.clock.now_ms();

        self.core.update("set timeout", |time_ms| {
            *time_ms = now.wrapping_add(delay_ms);

            // 0 means "no deadline set"
            if *time_ms == 0 {
                *time_ms = time_ms.wrapping_sub(1);
            }
        })
    }

    /// The absolute fire time in milliseconds since the clock's epoch, or 0
    /// if the timer was never armed.
    pub fn time_ms(&self) -> u64 {
        self.core.fields(|time_ms| *time_ms)
    }

    /// Whether [`set_timeout`](Self::set_timeout) has been called.
    pub fn is_armed(&self) -> bool {
        self.time_ms() != 0
    }

    pub(crate) fn core(&self) -> &EventCore<u64> {
        &self.core
    }
}

impl fmt::Debug for TimerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEvent")
            .field("id", &self.id())
            .field("time_ms", &self.time_ms())
            .field("pending", &self.is_pending())
            .finish()
    }
}
