use super::Bus;
use crate::error::Result;
use crate::event::{EventId, EventRef, HandleEvent, Operation, RawHandle};
use crate::poller::{Interest, Poller, Readiness};

use std::collections::HashMap;
use std::io;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::{trace, warn};

struct HandleNode {
    id: EventId,
    operation: Operation,
    event: Weak<HandleEvent>,
}

/// Everything registered for one raw handle.
#[derive(Default)]
struct Watch {
    /// Interest currently installed in the poller.
    interest: Interest,

    /// Waiting events, in registration order.
    waiters: Vec<HandleNode>,
}

#[derive(Default)]
struct HandleRegistry {
    watches: HashMap<RawHandle, Watch>,
    index: HashMap<EventId, RawHandle>,
}

impl HandleRegistry {
    fn watch(&mut self, poller: &dyn Poller, handle: RawHandle, node: HandleNode) -> io::Result<()> {
        self.prune(handle);

        let current = self
            .watches
            .get(&handle)
            .map(|watch| watch.interest)
            .unwrap_or_default();
        let wanted = current | node.operation.interest();

        install(poller, handle, current, wanted)?;

        self.index.insert(node.id, handle);

        let watch = self.watches.entry(handle).or_default();
        watch.interest = wanted;
        watch.waiters.push(node);

        Ok(())
    }

    /// Unlinks waiters of `handle` whose event was dropped.
    ///
    /// A watch left with no live waiter is forgotten: its handle may have
    /// been closed and reused, so the next waiter registers it afresh.
    fn prune(&mut self, handle: RawHandle) {
        let Some(watch) = self.watches.get_mut(&handle) else {
            return;
        };

        let index = &mut self.index;
        watch.waiters.retain(|node| {
            let alive = node.event.strong_count() > 0;
            if !alive {
                index.remove(&node.id);
            }
            alive
        });

        if watch.waiters.is_empty() {
            trace!(handle, "dropping stale watch");
            self.watches.remove(&handle);
        }
    }

    /// Brings the poller interest of `handle` in line with its waiters.
    fn refresh(&mut self, poller: &dyn Poller, handle: RawHandle) {
        let Some(watch) = self.watches.get(&handle) else {
            return;
        };

        let current = watch.interest;
        let wanted = watch
            .waiters
            .iter()
            .fold(Interest::NONE, |acc, node| acc | node.operation.interest());

        if wanted == current {
            return;
        }

        let result = if wanted.is_empty() {
            self.watches.remove(&handle);
            poller.deregister(handle)
        } else {
            if let Some(watch) = self.watches.get_mut(&handle) {
                watch.interest = wanted;
            }
            poller.reregister(handle, wanted)
        };

        if let Err(err) = result {
            warn!(handle, error = %err, "failed to update poller interest");
        }
    }

    /// Unlinks every waiter satisfied by `readiness`, plus dropped ones.
    ///
    /// Returned events are no longer pending.
    fn take_ready(&mut self, poller: &dyn Poller, readiness: Readiness) -> Vec<Arc<HandleEvent>> {
        let Some(watch) = self.watches.get_mut(&readiness.handle) else {
            return Vec::new();
        };

        let mut fired = Vec::new();
        let waiters = mem::take(&mut watch.waiters);

        for node in waiters {
            let event = node.event.upgrade();
            let ready = readiness.matches(node.operation.interest());

            match event {
                Some(event) if ready => {
                    event.core().set_pending(false);
                    self.index.remove(&node.id);
                    fired.push(event);
                }
                Some(_) => watch.waiters.push(node),
                None => {
                    self.index.remove(&node.id);
                }
            }
        }

        self.refresh(poller, readiness.handle);
        fired
    }
}

/// Installs `wanted` in the poller, given what it is believed to hold.
///
/// The belief can be stale when a handle was closed and its number reused,
/// so a missing registration falls back to `register` and an existing one
/// to `reregister`.
fn install(
    poller: &dyn Poller,
    handle: RawHandle,
    current: Interest,
    wanted: Interest,
) -> io::Result<()> {
    if current.is_empty() {
        match poller.register(handle, wanted) {
            Err(err) if err.raw_os_error() == Some(libc::EEXIST) => {
                poller.reregister(handle, wanted)
            }
            result => result,
        }
    } else if wanted != current {
        match poller.reregister(handle, wanted) {
            Err(err) if err.raw_os_error() == Some(libc::ENOENT) => {
                poller.register(handle, wanted)
            }
            result => result,
        }
    } else {
        Ok(())
    }
}

/// The handle bus: one-shot readiness waits on raw I/O handles.
///
/// Registering an event asks the poller to watch its handle for the event's
/// operation; several events may share a handle and their interests are
/// merged. Readiness comes from outside through [`report`](Self::report)
/// and is turned into callbacks by [`dispatch`](Bus::dispatch). A fired event
/// is no longer pending and may be added again.
pub struct HandleBus {
    poller: Arc<dyn Poller>,
    registry: Mutex<HandleRegistry>,
    reported: Mutex<Vec<Readiness>>,
}

impl HandleBus {
    pub fn new(poller: Arc<dyn Poller>) -> Self {
        Self {
            poller,
            registry: Mutex::new(HandleRegistry::default()),
            reported: Mutex::new(Vec::new()),
        }
    }

    pub fn poller(&self) -> &Arc<dyn Poller> {
        &self.poller
    }

    fn lock(&self) -> MutexGuard<'_, HandleRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues readiness reported by the poller for the next dispatch.
    pub fn report(&self, ready: impl IntoIterator<Item = Readiness>) {
        self.reported
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(ready);
    }

    /// The interest currently installed in the poller for `handle`.
    pub fn interest(&self, handle: RawHandle) -> Interest {
        self.lock()
            .watches
            .get(&handle)
            .map(|watch| watch.interest)
            .unwrap_or_default()
    }
}

impl Bus for HandleBus {
    type Event = HandleEvent;

    fn add_event(&self, event: &Arc<HandleEvent>) -> Result<()> {
        let id = event.id();
        let mut registry = self.lock();

        let (handle, operation) = event
            .core()
            .register(|fields| Ok((fields.handle, fields.operation)))?;

        let node = HandleNode {
            id,
            operation,
            event: Arc::downgrade(event),
        };

        if let Err(err) = registry.watch(&*self.poller, handle, node) {
            event.core().set_pending(false);
            return Err(err.into());
        }

        trace!(event = %id, handle, %operation, "handle added");
        Ok(())
    }

    fn del_event(&self, event: &HandleEvent) -> Result<()> {
        let id = event.id();
        let mut registry = self.lock();

        let Some(&handle) = registry.index.get(&id) else {
            return Err(event.core().not_pending_error());
        };

        event.core().unregister()?;
        registry.index.remove(&id);

        if let Some(watch) = registry.watches.get_mut(&handle) {
            watch.waiters.retain(|node| node.id != id);
        }
        registry.refresh(&*self.poller, handle);

        trace!(event = %id, handle, "handle removed");
        Ok(())
    }

    /// Fires the events satisfied by readiness reported since the last call.
    ///
    /// Readiness is not time-based, so the hint is always `None`.
    fn dispatch(&self) -> Option<Duration> {
        let reported = mem::take(&mut *self.reported.lock().unwrap_or_else(PoisonError::into_inner));

        for readiness in reported {
            let fired = self.lock().take_ready(&*self.poller, readiness);

            for event in fired {
                trace!(event = %event.id(), handle = readiness.handle, "handle fired");
                event.callback().call(EventRef::Handle(&event));
            }
        }

        None
    }

    fn len(&self) -> usize {
        self.lock().index.len()
    }
}

impl Drop for HandleBus {
    /// Releases every registered event and stops watching its handle.
    fn drop(&mut self) {
        let registry = self.registry.get_mut().unwrap_or_else(PoisonError::into_inner);

        for (handle, watch) in registry.watches.drain() {
            for event in watch.waiters.iter().filter_map(|node| node.event.upgrade()) {
                event.core().set_pending(false);
            }

            if let Err(err) = self.poller.deregister(handle) {
                warn!(handle, error = %err, "failed to deregister handle");
            }
        }
    }
}
