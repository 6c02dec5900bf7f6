use super::Bus;
use crate::error::Result;
use crate::event::{EventId, EventRef, Signal, SignalEvent};

use std::collections::{HashMap, VecDeque};
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::trace;

struct SignalNode {
    id: EventId,
    event: Weak<SignalEvent>,
}

#[derive(Default)]
struct SignalRegistry {
    waiters: HashMap<Signal, Vec<SignalNode>>,
    index: HashMap<EventId, Signal>,
}

/// The signal bus: one-shot waits on signal numbers.
///
/// This bus does not catch signals. Whatever does reports them through
/// [`raise`](Self::raise), from any thread; the next
/// [`dispatch`](Bus::dispatch) fires every event registered for each raised
/// signal, in registration order.
#[derive(Default)]
pub struct SignalBus {
    registry: Mutex<SignalRegistry>,
    raised: Mutex<VecDeque<Signal>>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SignalRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn raised(&self) -> MutexGuard<'_, VecDeque<Signal>> {
        self.raised.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records that `signal` was delivered.
    pub fn raise(&self, signal: Signal) {
        trace!(signal, "signal raised");
        self.raised().push_back(signal);
    }

    /// Whether raised signals are waiting for a dispatch.
    pub fn has_raised(&self) -> bool {
        !self.raised().is_empty()
    }
}

impl Bus for SignalBus {
    type Event = SignalEvent;

    fn add_event(&self, event: &Arc<SignalEvent>) -> Result<()> {
        let id = event.id();
        let mut registry = self.lock();

        let signal = event.core().register(|&signal| Ok(signal))?;

        registry.index.insert(id, signal);
        registry.waiters.entry(signal).or_default().push(SignalNode {
            id,
            event: Arc::downgrade(event),
        });

        trace!(event = %id, signal, "signal added");
        Ok(())
    }

    fn del_event(&self, event: &SignalEvent) -> Result<()> {
        let id = event.id();
        let mut registry = self.lock();

        let Some(signal) = registry.index.get(&id).copied() else {
            return Err(event.core().not_pending_error());
        };

        event.core().unregister()?;
        registry.index.remove(&id);

        if let Some(waiters) = registry.waiters.get_mut(&signal) {
            waiters.retain(|node| node.id != id);
            if waiters.is_empty() {
                registry.waiters.remove(&signal);
            }
        }

        trace!(event = %id, signal, "signal removed");
        Ok(())
    }

    /// Fires the events waiting on every signal raised since the last call.
    ///
    /// Signals are not time-based, so the hint is always `None`.
    fn dispatch(&self) -> Option<Duration> {
        let raised = mem::take(&mut *self.raised());

        for signal in raised {
            let fired: Vec<Arc<SignalEvent>> = {
                let mut registry = self.lock();
                let waiters = registry.waiters.remove(&signal).unwrap_or_default();

                waiters
                    .into_iter()
                    .filter_map(|node| {
                        registry.index.remove(&node.id);
                        node.event.upgrade()
                    })
                    .inspect(|event| event.core().set_pending(false))
                    .collect()
            };

            if fired.is_empty() {
                trace!(signal, "signal raised with no listener");
            }

            for event in fired {
                trace!(event = %event.id(), signal, "signal fired");
                event.callback().call(EventRef::Signal(&event));
            }
        }

        None
    }

    fn len(&self) -> usize {
        self.lock().index.len()
    }
}

impl Drop for SignalBus {
    fn drop(&mut self) {
        let registry = self.registry.get_mut().unwrap_or_else(PoisonError::into_inner);

        for node in registry.waiters.values().flatten() {
            if let Some(event) = node.event.upgrade() {
                event.core().set_pending(false);
            }
        }
    }
}
