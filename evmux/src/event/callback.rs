use super::{EventKind, EventRef, HandleEvent, Operation, SignalEvent, TimerEvent};

use std::fmt;
use std::sync::Arc;

/// Handler for [`TimerEvent`]s.
pub trait TimerCallback: Send + Sync {
    /// Called once the timer's deadline has been reached.
    fn timeout(&self, event: &TimerEvent);
}

/// Handler for [`HandleEvent`]s.
///
/// `read` or `write` is called depending on the event's [`Operation`].
pub trait HandleCallback: Send + Sync {
    fn read(&self, event: &HandleEvent);

    fn write(&self, event: &HandleEvent);
}

/// Handler for [`SignalEvent`]s.
pub trait SignalCallback: Send + Sync {
    fn signal(&self, event: &SignalEvent);
}

impl<F> TimerCallback for F
where
    F: Fn(&TimerEvent) + Send + Sync,
{
    fn timeout(&self, event: &TimerEvent) {
        self(event)
    }
}

/// A closure handles both operations; it can tell them apart through
/// [`HandleEvent::operation`].
impl<F> HandleCallback for F
where
    F: Fn(&HandleEvent) + Send + Sync,
{
    fn read(&self, event: &HandleEvent) {
        self(event)
    }

    fn write(&self, event: &HandleEvent) {
        self(event)
    }
}

impl<F> SignalCallback for F
where
    F: Fn(&SignalEvent) + Send + Sync,
{
    fn signal(&self, event: &SignalEvent) {
        self(event)
    }
}

/// A type-tagged callback.
///
/// Cloning is cheap and shares the underlying handler, so one handler can
/// serve many events.
#[derive(Clone)]
pub enum Callback {
    Timer(Arc<dyn TimerCallback>),
    Handle(Arc<dyn HandleCallback>),
    Signal(Arc<dyn SignalCallback>),
}

impl Callback {
    pub fn timer(callback: impl TimerCallback + 'static) -> Self {
        Callback::Timer(Arc::new(callback))
    }

    pub fn handle(callback: impl HandleCallback + 'static) -> Self {
        Callback::Handle(Arc::new(callback))
    }

    pub fn signal(callback: impl SignalCallback + 'static) -> Self {
        Callback::Signal(Arc::new(callback))
    }

    /// The event kind this callback accepts.
    pub fn kind(&self) -> EventKind {
        match self {
            Callback::Timer(_) => EventKind::Timer,
            Callback::Handle(_) => EventKind::Handle,
            Callback::Signal(_) => EventKind::Signal,
        }
    }

    /// Forwards `event` to the matching handler method.
    ///
    /// # Panics
    ///
    /// Panics if the event kind does not match the callback kind. That is a
    /// defect in the caller, not a runtime condition.
    pub fn call(&self, event: EventRef<'_>) {
        match (self, event) {
            (Callback::Timer(cb), EventRef::Timer(event)) => cb.timeout(event),
            (Callback::Handle(cb), EventRef::Handle(event)) => match event.operation() {
                Operation::Read => cb.read(event),
                Operation::Write => cb.write(event),
            },
            (Callback::Signal(cb), EventRef::Signal(event)) => cb.signal(event),
            (cb, event) => panic!(
                "{} callback called with {} event {}",
                cb.kind(),
                event.kind(),
                event.id()
            ),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback::{:?}(..)", self.kind())
    }
}
