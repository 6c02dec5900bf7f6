use evmux::{Bus, Error, ManualClock, TimerBus, TimerEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

type Log = Arc<Mutex<Vec<&'static str>>>;

fn logged(clock: &Arc<ManualClock>, log: &Log, name: &'static str, delay_ms: u64) -> Arc<TimerEvent> {
    let log = log.clone();
    let event = Arc::new(TimerEvent::new(clock.clone(), move |_: &TimerEvent| {
        log.lock().unwrap().push(name);
    }));
    event.set_timeout(Duration::from_millis(delay_ms)).unwrap();
    event
}

#[test]
fn fires_in_deadline_order_and_reports_remaining_time() {
    let clock = Arc::new(ManualClock::new(0));
    let bus = TimerBus::new(clock.clone());
    let log = Log::default();

    let a = logged(&clock, &log, "a", 50);
    let b = logged(&clock, &log, "b", 10);
    let c = logged(&clock, &log, "c", 10);

    bus.add_event(&a).unwrap();
    bus.add_event(&b).unwrap();
    bus.add_event(&c).unwrap();

    assert_eq!(bus.dispatch(), Some(Duration::from_millis(10)));
    assert!(log.lock().unwrap().is_empty());

    clock.set(10);
    assert_eq!(bus.dispatch(), Some(Duration::from_millis(40)));
    assert_eq!(*log.lock().unwrap(), ["b", "c"]);
    assert!(!b.is_pending());
    assert!(!c.is_pending());
    assert!(a.is_pending());

    clock.set(50);
    assert_eq!(bus.dispatch(), None);
    assert_eq!(*log.lock().unwrap(), ["b", "c", "a"]);
    assert!(bus.is_empty());
}

#[test]
fn equal_deadlines_fire_in_insertion_order() {
    let clock = Arc::new(ManualClock::new(100));
    let bus = TimerBus::new(clock.clone());
    let log = Log::default();

    let names = ["first", "second", "third", "fourth"];
    let events: Vec<_> = names
        .iter()
        .map(|&name| logged(&clock, &log, name, 5))
        .collect();

    for event in events.iter().rev().skip(2) {
        bus.add_event(event).unwrap();
    }
    for event in events.iter().take(2) {
        bus.add_event(event).unwrap();
    }

    clock.advance(5);
    bus.dispatch();

    assert_eq!(*log.lock().unwrap(), ["fourth", "third", "first", "second"]);
}

#[test]
fn empty_bus_has_no_hint() {
    let clock = Arc::new(ManualClock::new(0));
    let bus = TimerBus::new(clock.clone());

    assert_eq!(bus.dispatch(), None);
    assert_eq!(bus.dispatch(), None);
    assert_eq!(bus.next_deadline(), None);
}

#[test]
fn hint_shrinks_as_time_passes() {
    let clock = Arc::new(ManualClock::new(0));
    let bus = TimerBus::new(clock.clone());
    let fired = Arc::new(AtomicUsize::new(0));

    let event = Arc::new(TimerEvent::new(clock.clone(), {
        let fired = fired.clone();
        move |_: &TimerEvent| {
            fired.fetch_add(1, Ordering::SeqCst);
        }
    }));
    event.set_timeout(Duration::from_millis(100)).unwrap();
    bus.add_event(&event).unwrap();

    assert_eq!(bus.dispatch(), Some(Duration::from_millis(100)));
    assert_eq!(bus.dispatch(), Some(Duration::from_millis(100)));

    clock.advance(30);
    assert_eq!(bus.dispatch(), Some(Duration::from_millis(70)));

    clock.advance(69);
    assert_eq!(bus.dispatch(), Some(Duration::from_millis(1)));
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    clock.advance(500);
    assert_eq!(bus.dispatch(), None);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn double_add_is_rejected() {
    let clock = Arc::new(ManualClock::new(0));
    let bus = TimerBus::new(clock.clone());
    let other = TimerBus::new(clock.clone());
    let log = Log::default();
    let event = logged(&clock, &log, "x", 10);

    bus.add_event(&event).unwrap();

    let err = bus.add_event(&event).unwrap_err();
    assert!(matches!(err, Error::Pending { .. }));

    let err = other.add_event(&event).unwrap_err();
    assert!(matches!(err, Error::Pending { .. }));

    assert_eq!(bus.len(), 1);
    assert!(other.is_empty());
}

#[test]
fn unarmed_timer_is_rejected() {
    let clock = Arc::new(ManualClock::new(0));
    let bus = TimerBus::new(clock.clone());
    let event = Arc::new(TimerEvent::new(clock.clone(), |_: &TimerEvent| {}));

    let err = bus.add_event(&event).unwrap_err();

    assert!(matches!(err, Error::Unarmed { id } if id == event.id()));
    assert!(!event.is_pending());
    assert!(bus.is_empty());
}

#[test]
fn delete_requires_membership() {
    let clock = Arc::new(ManualClock::new(0));
    let bus = TimerBus::new(clock.clone());
    let other = TimerBus::new(clock.clone());
    let log = Log::default();
    let event = logged(&clock, &log, "x", 10);

    let err = bus.del_event(&event).unwrap_err();
    assert!(matches!(err, Error::NotPending { .. }));

    other.add_event(&event).unwrap();
    let err = bus.del_event(&event).unwrap_err();
    assert!(matches!(err, Error::NotPending { .. }));
    assert!(event.is_pending());

    other.del_event(&event).unwrap();
    assert!(!event.is_pending());

    clock.advance(10);
    other.dispatch();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn pending_timer_is_frozen_until_removed() {
    let clock = Arc::new(ManualClock::new(0));
    let bus = TimerBus::new(clock.clone());
    let log = Log::default();
    let event = logged(&clock, &log, "x", 10);

    bus.add_event(&event).unwrap();

    assert!(matches!(
        event.set_timeout(Duration::from_millis(500)),
        Err(Error::Pending { .. })
    ));
    assert_eq!(event.time_ms(), 10);

    bus.del_event(&event).unwrap();
    event.set_timeout(Duration::from_millis(500)).unwrap();
    bus.add_event(&event).unwrap();

    assert_eq!(bus.dispatch(), Some(Duration::from_millis(500)));
}

#[test]
fn dropped_timer_never_fires() {
    let clock = Arc::new(ManualClock::new(0));
    let bus = TimerBus::new(clock.clone());
    let log = Log::default();

    let event = logged(&clock, &log, "dropped", 10);
    let kept = logged(&clock, &log, "kept", 20);
    bus.add_event(&event).unwrap();
    bus.add_event(&kept).unwrap();
    drop(event);

    assert_eq!(bus.dispatch(), Some(Duration::from_millis(20)));
    assert_eq!(bus.len(), 1);

    clock.advance(20);
    assert_eq!(bus.dispatch(), None);
    assert_eq!(*log.lock().unwrap(), ["kept"]);
}

#[test]
fn callback_may_rearm_its_own_timer() {
    let clock = Arc::new(ManualClock::new(0));
    let bus = Arc::new(TimerBus::new(clock.clone()));
    let fired = Arc::new(AtomicUsize::new(0));

    let event = Arc::new_cyclic(|me: &Weak<TimerEvent>| {
        let me = me.clone();
        let bus = bus.clone();
        let fired = fired.clone();

        TimerEvent::new(clock.clone(), move |_: &TimerEvent| {
            if fired.fetch_add(1, Ordering::SeqCst) < 2 {
                let me = me.upgrade().unwrap();
                me.set_timeout(Duration::ZERO).unwrap();
                bus.add_event(&me).unwrap();
            }
        })
    });

    event.set_timeout(Duration::from_millis(5)).unwrap();
    bus.add_event(&event).unwrap();
    clock.advance(5);

    // a re-added timer waits for the next pass even when already due
    assert_eq!(bus.dispatch(), Some(Duration::ZERO));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(event.is_pending());

    assert_eq!(bus.dispatch(), Some(Duration::ZERO));
    assert_eq!(fired.load(Ordering::SeqCst), 2);

    assert_eq!(bus.dispatch(), None);
    assert_eq!(fired.load(Ordering::SeqCst), 3);
    assert!(!event.is_pending());
}

#[test]
fn callback_may_cancel_a_sibling() {
    let clock = Arc::new(ManualClock::new(0));
    let bus = Arc::new(TimerBus::new(clock.clone()));
    let log = Log::default();

    let victim = logged(&clock, &log, "victim", 10);

    let killer = Arc::new(TimerEvent::new(clock.clone(), {
        let bus = bus.clone();
        let victim = victim.clone();
        let log = log.clone();
        move |_: &TimerEvent| {
            log.lock().unwrap().push("killer");
            bus.del_event(&victim).unwrap();
        }
    }));
    killer.set_timeout(Duration::from_millis(10)).unwrap();

    bus.add_event(&killer).unwrap();
    bus.add_event(&victim).unwrap();

    clock.advance(10);
    assert_eq!(bus.dispatch(), None);

    assert_eq!(*log.lock().unwrap(), ["killer"]);
    assert!(!victim.is_pending());
}

#[test]
fn concurrent_registration() {
    let clock = Arc::new(ManualClock::new(0));
    let bus = Arc::new(TimerBus::new(clock.clone()));
    let fired = Arc::new(AtomicUsize::new(0));

    let events: Vec<Arc<TimerEvent>> = (0..64)
        .map(|i| {
            let fired = fired.clone();
            let event = Arc::new(TimerEvent::new(clock.clone(), move |_: &TimerEvent| {
                fired.fetch_add(1, Ordering::SeqCst);
            }));
            event.set_timeout(Duration::from_millis(1 + i % 8)).unwrap();
            event
        })
        .collect();

    std::thread::scope(|scope| {
        for chunk in events.chunks(16) {
            let bus = &bus;
            scope.spawn(move || {
                for event in chunk {
                    bus.add_event(event).unwrap();
                }
            });
        }
    });

    assert_eq!(bus.len(), 64);

    clock.advance(8);
    assert_eq!(bus.dispatch(), None);
    assert_eq!(fired.load(Ordering::SeqCst), 64);
}

#[test]
fn late_readd_does_not_hold_back_due_timers() {
    let clock = Arc::new(ManualClock::new(0));
    let bus = Arc::new(TimerBus::new(clock.clone()));
    let log = Log::default();

    // armed long ago, added only once `first` fires
    let overdue = logged(&clock, &log, "overdue", 1);

    let first = Arc::new(TimerEvent::new(clock.clone(), {
        let bus = bus.clone();
        let overdue = overdue.clone();
        let log = log.clone();
        move |_: &TimerEvent| {
            log.lock().unwrap().push("first");
            bus.add_event(&overdue).unwrap();
        }
    }));
    first.set_timeout(Duration::from_millis(5)).unwrap();
    let second = logged(&clock, &log, "second", 5);

    bus.add_event(&first).unwrap();
    bus.add_event(&second).unwrap();
    clock.advance(5);

    assert_eq!(bus.dispatch(), Some(Duration::ZERO));
    assert_eq!(*log.lock().unwrap(), ["first", "second"]);
    assert!(overdue.is_pending());

    assert_eq!(bus.dispatch(), None);
    assert_eq!(*log.lock().unwrap(), ["first", "second", "overdue"]);
}
