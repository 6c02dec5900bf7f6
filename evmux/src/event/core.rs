use super::{Callback, EventId, EventKind};
use crate::error::{Error, Result};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Registration state shared by every event variant.
///
/// The pending flag, the callback and the variant fields `T` sit behind one
/// per-event lock, so a bus flipping the flag is atomic with respect to
/// setters called from other threads.
pub(crate) struct EventCore<T> {
    id: EventId,
    kind: EventKind,
    state: Mutex<State<T>>,
}

struct State<T> {
    /// True exactly while the event is registered with a bus.
    pending: bool,

    callback: Callback,

    /// Variant-specific fields, frozen while pending.
    fields: T,
}

impl<T> EventCore<T> {
    pub(crate) fn new(kind: EventKind, callback: Callback, fields: T) -> Self {
        assert_eq!(
            callback.kind(),
            kind,
            "{} callback attached to {kind} event",
            callback.kind()
        );

        Self {
            id: EventId::next(),
            kind,
            state: Mutex::new(State {
                pending: false,
                callback,
                fields,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn id(&self) -> EventId {
        self.id
    }

    pub(crate) fn kind(&self) -> EventKind {
        self.kind
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.lock().pending
    }

    pub(crate) fn callback(&self) -> Callback {
        self.lock().callback.clone()
    }

    pub(crate) fn set_callback(&self, callback: Callback) -> Result<()> {
        assert_eq!(
            callback.kind(),
            self.kind,
            "{} callback attached to {} event {}",
            callback.kind(),
            self.kind,
            self.id
        );

        let mut state = self.lock();
        if state.pending {
            return Err(self.pending_error("set callback"));
        }

        state.callback = callback;
        Ok(())
    }

    /// Reads the variant fields under the event lock.
    pub(crate) fn fields<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock().fields)
    }

    /// Mutates the variant fields, refusing while the event is pending.
    pub(crate) fn update<R>(&self, action: &'static str, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut state = self.lock();
        if state.pending {
            return Err(self.pending_error(action));
        }

        Ok(f(&mut state.fields))
    }

    /// Marks the event pending in a single check-and-set.
    ///
    /// `admit` sees the frozen fields and may veto the registration; the flag
    /// is only set when it returns `Ok`.
    pub(crate) fn register<R>(&self, admit: impl FnOnce(&T) -> Result<R>) -> Result<R> {
        let mut state = self.lock();
        if state.pending {
            return Err(self.pending_error("add it again"));
        }

        let admitted = admit(&state.fields)?;
        state.pending = true;

        Ok(admitted)
    }

    pub(crate) fn unregister(&self) -> Result<()> {
        let mut state = self.lock();
        if !state.pending {
            return Err(self.not_pending_error());
        }

        state.pending = false;
        Ok(())
    }

    /// Used by buses when an event fires.
    pub(crate) fn set_pending(&self, pending: bool) {
        self.lock().pending = pending;
    }

    pub(crate) fn not_pending_error(&self) -> Error {
        Error::NotPending {
            id: self.id,
            kind: self.kind,
        }
    }

    fn pending_error(&self, action: &'static str) -> Error {
        Error::Pending {
            id: self.id,
            kind: self.kind,
            action,
        }
    }
}
