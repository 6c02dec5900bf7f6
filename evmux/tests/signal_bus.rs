use evmux::{Bus, Error, SignalBus, SignalEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn counted(signal: libc::c_int, hits: &Arc<AtomicUsize>) -> Arc<SignalEvent> {
    let hits = hits.clone();

    Arc::new(SignalEvent::new(signal, move |_: &SignalEvent| {
        hits.fetch_add(1, Ordering::SeqCst);
    }))
}

#[test]
fn raise_is_delivered_on_dispatch() {
    let bus = SignalBus::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let event = counted(libc::SIGTERM, &hits);

    bus.add_event(&event).unwrap();
    bus.raise(libc::SIGTERM);
    assert!(bus.has_raised());
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    assert_eq!(bus.dispatch(), None);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(!bus.has_raised());
    assert!(!event.is_pending());
    assert!(bus.is_empty());
}

#[test]
fn unheard_signals_are_discarded() {
    let bus = SignalBus::new();
    let hits = Arc::new(AtomicUsize::new(0));

    bus.raise(libc::SIGTERM);
    bus.dispatch();

    let event = counted(libc::SIGTERM, &hits);
    bus.add_event(&event).unwrap();
    bus.dispatch();

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(event.is_pending());
}

#[test]
fn repeated_raise_fires_once_per_registration() {
    let bus = SignalBus::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let event = counted(libc::SIGCHLD, &hits);

    bus.add_event(&event).unwrap();
    bus.raise(libc::SIGCHLD);
    bus.raise(libc::SIGCHLD);
    bus.dispatch();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn removed_and_pending_signal_events() {
    let bus = SignalBus::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let event = counted(libc::SIGUSR1, &hits);

    bus.add_event(&event).unwrap();
    assert!(matches!(bus.add_event(&event), Err(Error::Pending { .. })));
    assert!(matches!(event.set_signal(libc::SIGUSR2), Err(Error::Pending { .. })));

    bus.del_event(&event).unwrap();
    assert!(matches!(bus.del_event(&event), Err(Error::NotPending { .. })));

    event.set_signal(libc::SIGUSR2).unwrap();
    bus.add_event(&event).unwrap();

    bus.raise(libc::SIGUSR1);
    bus.dispatch();
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    bus.raise(libc::SIGUSR2);
    bus.dispatch();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn dropped_signal_event_never_fires() {
    let bus = SignalBus::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let event = counted(libc::SIGWINCH, &hits);
    bus.add_event(&event).unwrap();
    drop(event);

    bus.raise(libc::SIGWINCH);
    bus.dispatch();

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(bus.is_empty());
}
