use super::Bus;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::event::{EventId, EventRef, TimerEvent};

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::trace;

/// Position of a timer in the queue.
///
/// Ordered by deadline, then by insertion sequence, so timers sharing a
/// deadline fire in the order they were added.
#[derive(Debug, Clone, Copy)]
struct TimerKey {
    /// Absolute fire time in milliseconds.
    deadline: u64,

    /// Insertion sequence, unique per bus.
    seq: u64,
}

impl Eq for TimerKey {}

impl PartialEq for TimerKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for TimerKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for TimerKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A queue entry. The bus never keeps the event alive.
struct TimerNode {
    id: EventId,
    event: Weak<TimerEvent>,
}

#[derive(Default)]
struct TimerQueue {
    /// Registered timers, earliest first.
    entries: BTreeMap<TimerKey, TimerNode>,

    /// Where each registered event sits in `entries`.
    index: HashMap<EventId, TimerKey>,

    next_seq: u64,
}

impl TimerQueue {
    fn insert(&mut self, id: EventId, deadline: u64, event: Weak<TimerEvent>) {
        let key = TimerKey {
            deadline,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        self.entries.insert(key, TimerNode { id, event });
        self.index.insert(id, key);
    }

    fn remove(&mut self, id: EventId) -> Option<TimerNode> {
        let key = self.index.remove(&id)?;
        self.entries.remove(&key)
    }

    /// Pops the earliest entry due at `now` that was queued before
    /// `watermark`.
    ///
    /// Later entries are skipped rather than waited for, so one re-added
    /// with an old deadline does not hold back the due timers behind it.
    fn pop_due(&mut self, now: u64, watermark: u64) -> Option<TimerNode> {
        let key = self
            .entries
            .keys()
            .take_while(|key| key.deadline <= now)
            .find(|key| key.seq < watermark)
            .copied()?;

        let node = self.entries.remove(&key)?;
        self.index.remove(&node.id);

        Some(node)
    }

    /// Drops head entries whose event no longer exists.
    fn prune_head(&mut self) {
        while let Some(entry) = self.entries.first_entry() {
            if entry.get().event.strong_count() > 0 {
                break;
            }

            let node = entry.remove();
            self.index.remove(&node.id);
        }
    }

    fn next_deadline(&self) -> Option<u64> {
        self.entries.first_key_value().map(|(key, _)| key.deadline)
    }
}

/// The timer bus: an ordered deadline queue.
///
/// Timers are fired by [`dispatch`](Bus::dispatch) once the clock reaches
/// their deadline, earliest first and in insertion order among equal
/// deadlines. The returned hint is the exact time left until the next
/// deadline.
///
/// Queue mutations happen under a bus-wide lock, so timers may be added and
/// removed from any thread. Callbacks run without that lock held and may
/// re-arm and re-add the event that is firing.
pub struct TimerBus {
    clock: Arc<dyn Clock>,
    queue: Mutex<TimerQueue>,
}

impl TimerBus {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            queue: Mutex::new(TimerQueue::default()),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn lock(&self) -> MutexGuard<'_, TimerQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deadline of the earliest registered timer still alive.
    pub fn next_deadline(&self) -> Option<u64> {
        let mut queue = self.lock();
        queue.prune_head();
        queue.next_deadline()
    }

    /// Fires every timer due at `now` and returns how many fired.
    ///
    /// Timers added while this runs, including ones re-added by a callback,
    /// wait for the next call.
    fn advance(&self, now: u64) -> usize {
        let watermark = self.lock().next_seq;
        let mut fired = 0;

        loop {
            let event = {
                let mut queue = self.lock();

                let Some(node) = queue.pop_due(now, watermark) else {
                    break;
                };

                let Some(event) = node.event.upgrade() else {
                    continue;
                };

                // cleared before the bus lock is released, so a concurrent
                // del_event sees a consistent state
                event.core().set_pending(false);
                event
            };

            trace!(event = %event.id(), deadline = event.time_ms(), now, "timer fired");

            event.callback().call(EventRef::Timer(&event));
            fired += 1;
        }

        fired
    }
}

impl Bus for TimerBus {
    type Event = TimerEvent;

    fn add_event(&self, event: &Arc<TimerEvent>) -> Result<()> {
        let id = event.id();
        let mut queue = self.lock();

        let deadline = event.core().register(|&time_ms| {
            if time_ms == 0 {
                Err(Error::Unarmed { id })
            } else {
                Ok(time_ms)
            }
        })?;

        queue.insert(id, deadline, Arc::downgrade(event));

        trace!(event = %id, deadline, "timer added");
        Ok(())
    }

    fn del_event(&self, event: &TimerEvent) -> Result<()> {
        let id = event.id();
        let mut queue = self.lock();

        if !queue.index.contains_key(&id) {
            return Err(event.core().not_pending_error());
        }

        event.core().unregister()?;
        queue.remove(id);

        trace!(event = %id, "timer removed");
        Ok(())
    }

    fn dispatch(&self) -> Option<Duration> {
        self.advance(self.clock.now_ms());

        let now = self.clock.now_ms();
        let mut queue = self.lock();
        queue.prune_head();

        queue
            .next_deadline()
            .map(|deadline| Duration::from_millis(deadline.saturating_sub(now)))
    }

    fn len(&self) -> usize {
        self.lock().entries.len()
    }
}

impl Drop for TimerBus {
    /// Releases every timer still registered so it can be added elsewhere.
    fn drop(&mut self) {
        let queue = self.queue.get_mut().unwrap_or_else(PoisonError::into_inner);

        for event in queue.entries.values().filter_map(|node| node.event.upgrade()) {
            event.core().set_pending(false);
        }
    }
}
