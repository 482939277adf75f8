//! End-to-end dispatch behavior, including listeners that call back into
//! the channel that is invoking them.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use relay::prelude::*;
use relay::{Churn, ChurnEvent};

type Log = Rc<RefCell<Vec<&'static str>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn recorder(log: &Log, tag: &'static str) -> Listener<()> {
    let log = Rc::clone(log);
    Listener::new(move || log.borrow_mut().push(tag))
}

/// A listener whose behavior is supplied after it is registered, so it can
/// refer to itself.
fn deferred() -> (Listener<()>, Rc<RefCell<Option<Box<dyn Fn()>>>>) {
    let body: Rc<RefCell<Option<Box<dyn Fn()>>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&body);
    let listener = Listener::new(move || {
        if let Some(f) = slot.borrow().as_ref() {
            f();
        }
    });
    (listener, body)
}

#[test]
fn add_then_contains_and_counts() {
    let event = Event0::new();
    let l = Listener::new(|| {});
    assert!(event.add_listener(l.clone()));
    assert!(event.contains(&l));
    assert_eq!(event.listener_count(), 1);

    assert!(!event.add_listener(l.clone()));
    assert_eq!(event.listener_count(), 1);

    assert!(event.add_listener_with(l, true));
    assert_eq!(event.listener_count(), 2);
}

#[test]
fn remove_present_and_absent() {
    let event = Event0::new();
    let l = Listener::new(|| {});
    let stranger = Listener::new(|| {});
    event.add_listener(l.clone());

    assert!(!event.remove_listener(&stranger));
    assert_eq!(event.listener_count(), 1);

    assert!(event.remove_listener(&l));
    assert_eq!(event.listener_count(), 0);
    assert!(!event.contains(&l));
    assert!(!event.remove_listener(&l));
}

#[test]
fn dispatch_in_insertion_order() {
    let event = Event0::new();
    let log = log();
    for tag in ["A", "B", "C"] {
        event.add_listener(recorder(&log, tag));
    }
    event.dispatch(()).unwrap();
    assert_eq!(*log.borrow(), vec!["A", "B", "C"]);
}

#[test]
fn persistent_before_one_time() {
    let event = Event0::new();
    let log = log();
    event.add_once(recorder(&log, "once"));
    event.add_listener(recorder(&log, "always"));
    event.dispatch(()).unwrap();
    event.dispatch(()).unwrap();
    assert_eq!(*log.borrow(), vec!["always", "once", "always"]);
}

#[test]
fn arguments_reach_every_listener() {
    let event: Event3<u8, String, bool> = Event::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    for _ in 0..2 {
        let seen = Rc::clone(&seen);
        event.add_listener(Listener::new(move |n: &u8, s: &String, b: &bool| {
            seen.borrow_mut().push(format!("{n}:{s}:{b}"));
        }));
    }
    event.dispatch((3, "x".to_string(), false)).unwrap();
    assert_eq!(*seen.borrow(), vec!["3:x:false", "3:x:false"]);
}

#[test]
fn self_removal_is_safe() {
    let event = Rc::new(Event0::new());
    let log = log();
    let (me, body) = deferred();

    event.add_listener(recorder(&log, "A"));
    event.add_listener(me.clone());
    event.add_listener(recorder(&log, "C"));

    {
        let view = event.subscriber().clone();
        let me = me.clone();
        let log = Rc::clone(&log);
        *body.borrow_mut() = Some(Box::new(move || {
            log.borrow_mut().push("B");
            assert!(view.remove_listener(&me));
        }));
    }

    event.dispatch(()).unwrap();
    assert_eq!(*log.borrow(), vec!["A", "B", "C"]);
    assert!(!event.contains(&me));

    event.dispatch(()).unwrap();
    assert_eq!(*log.borrow(), vec!["A", "B", "C", "A", "C"]);
}

#[test]
fn removing_an_earlier_listener_does_not_repeat_anyone() {
    let event = Event0::new();
    let log = log();
    let a = recorder(&log, "A");
    let (b, body) = deferred();
    event.add_listener(a.clone());
    event.add_listener(b);
    event.add_listener(recorder(&log, "C"));

    {
        let view = event.subscriber().clone();
        let log = Rc::clone(&log);
        *body.borrow_mut() = Some(Box::new(move || {
            log.borrow_mut().push("B");
            view.remove_listener(&a);
        }));
    }

    event.dispatch(()).unwrap();
    assert_eq!(*log.borrow(), vec!["A", "B", "C"]);
    assert_eq!(event.listener_count(), 2);
}

#[test]
fn removing_a_later_listener_prevents_its_call() {
    let event = Event0::new();
    let log = log();
    let (a, body) = deferred();
    let b = recorder(&log, "B");
    event.add_listener(a);
    event.add_listener(b.clone());
    event.add_listener(recorder(&log, "C"));

    {
        let view = event.subscriber().clone();
        let log = Rc::clone(&log);
        *body.borrow_mut() = Some(Box::new(move || {
            log.borrow_mut().push("A");
            view.remove_listener(&b);
        }));
    }

    event.dispatch(()).unwrap();
    assert_eq!(*log.borrow(), vec!["A", "C"]);
}

#[test]
fn listener_added_during_dispatch_waits_for_next_pass() {
    let event = Event0::new();
    let log = log();
    let d = recorder(&log, "D");
    let added = Rc::new(Cell::new(false));

    {
        let view = event.subscriber().clone();
        let d = d.clone();
        let log = Rc::clone(&log);
        let added = Rc::clone(&added);
        event.add_listener(Listener::new(move || {
            log.borrow_mut().push("A");
            if !added.replace(true) {
                assert!(view.add_listener(d.clone()));
            }
        }));
    }

    event.dispatch(()).unwrap();
    assert_eq!(*log.borrow(), vec!["A"]);
    assert!(event.contains(&d));

    event.dispatch(()).unwrap();
    assert_eq!(*log.borrow(), vec!["A", "A", "D"]);
}

#[test]
fn one_time_fires_once() {
    let event = Event1::<i32>::new();
    let total = Rc::new(Cell::new(0));
    let l = {
        let total = Rc::clone(&total);
        Listener::new(move |n: &i32| total.set(total.get() + n))
    };
    assert!(event.add_once(l.clone()));
    assert!(!event.add_once(l.clone()));
    assert!(event.contains_once(&l));
    assert!(!event.contains(&l));
    assert_eq!(event.one_time_listener_count(), 1);

    event.dispatch((5,)).unwrap();
    event.dispatch((5,)).unwrap();
    assert_eq!(total.get(), 5);
    assert_eq!(event.one_time_listener_count(), 0);
    assert!(!event.contains_once(&l));
}

#[test]
fn one_time_self_removal_not_doubled() {
    let event = Event0::new();
    let log = log();
    let (me, body) = deferred();
    let after = recorder(&log, "after");
    event.add_once(recorder(&log, "before"));
    event.add_once(me.clone());
    event.add_once(after.clone());

    {
        let view = event.subscriber().clone();
        let me = me.clone();
        let log = Rc::clone(&log);
        *body.borrow_mut() = Some(Box::new(move || {
            log.borrow_mut().push("me");
            assert!(view.remove_once(&me));
        }));
    }

    event.dispatch(()).unwrap();
    assert_eq!(*log.borrow(), vec!["before", "me", "after"]);
    assert_eq!(event.one_time_listener_count(), 0);
    assert!(!event.remove_once(&me));
    assert!(!event.contains_once(&after));
}

#[test]
fn one_time_removing_its_neighbour() {
    let event = Event0::new();
    let log = log();
    let first = recorder(&log, "first");
    let (second, body) = deferred();
    let third = recorder(&log, "third");
    event.add_once(first.clone());
    event.add_once(second);
    event.add_once(third.clone());

    {
        let view = event.subscriber().clone();
        let log = Rc::clone(&log);
        *body.borrow_mut() = Some(Box::new(move || {
            log.borrow_mut().push("second");
            // already fired and retired
            assert!(!view.remove_once(&first));
            assert!(view.remove_once(&third));
        }));
    }

    event.dispatch(()).unwrap();
    assert_eq!(*log.borrow(), vec!["first", "second"]);
    assert_eq!(event.one_time_listener_count(), 0);
}

#[test]
fn one_time_added_during_one_time_pass_waits() {
    let event = Event0::new();
    let log = log();
    let late = recorder(&log, "late");
    {
        let view = event.subscriber().clone();
        let late = late.clone();
        let log = Rc::clone(&log);
        event.add_once(Listener::new(move || {
            log.borrow_mut().push("early");
            view.add_once(late.clone());
        }));
    }

    event.dispatch(()).unwrap();
    assert_eq!(*log.borrow(), vec!["early"]);
    assert!(event.contains_once(&late));

    event.dispatch(()).unwrap();
    assert_eq!(*log.borrow(), vec!["early", "late"]);
    assert_eq!(event.one_time_listener_count(), 0);
}

#[test]
fn one_time_added_by_persistent_listener_fires_same_dispatch() {
    let event = Event0::new();
    let log = log();
    let once = recorder(&log, "once");
    {
        let view = event.subscriber().clone();
        let once = once.clone();
        event.add_listener(Listener::new(move || {
            view.add_once(once.clone());
        }));
    }
    event.dispatch(()).unwrap();
    assert_eq!(*log.borrow(), vec!["once"]);
}

#[test]
fn nested_dispatch_runs_inner_pass_fully() {
    let event = Rc::new(Event1::<u32>::new());
    let log = Rc::new(RefCell::new(Vec::new()));
    {
        let weak = Rc::downgrade(&event);
        let log = Rc::clone(&log);
        event.add_listener(Listener::new(move |depth: &u32| {
            log.borrow_mut().push(format!("outer{depth}"));
            if *depth == 0 {
                if let Some(event) = weak.upgrade() {
                    event.dispatch((1,)).unwrap();
                }
            }
        }));
    }
    {
        let log = Rc::clone(&log);
        event.add_listener(Listener::new(move |depth: &u32| {
            log.borrow_mut().push(format!("second{depth}"));
        }));
    }

    event.dispatch((0,)).unwrap();
    assert_eq!(
        *log.borrow(),
        vec!["outer0", "outer1", "second1", "second0"]
    );
}

#[test]
fn remove_all_empties_both_stores() {
    let event = Event0::new();
    let listeners: Vec<_> = (0..3).map(|_| Listener::new(|| {})).collect();
    for l in &listeners {
        event.add_listener(l.clone());
        event.add_once(l.clone());
    }
    event.remove_all();
    assert_eq!(event.listener_count(), 0);
    assert_eq!(event.one_time_listener_count(), 0);
    for l in &listeners {
        assert!(!event.contains(l));
        assert!(!event.contains_once(l));
    }
}

#[test]
fn remove_all_selective() {
    let event = Event0::new();
    event.add_listener(Listener::new(|| {}));
    event.add_once(Listener::new(|| {}));

    event.remove_all_with(false, true);
    assert_eq!(event.listener_count(), 1);
    assert_eq!(event.one_time_listener_count(), 0);

    event.add_once(Listener::new(|| {}));
    event.remove_all_with(true, false);
    assert_eq!(event.listener_count(), 0);
    assert_eq!(event.one_time_listener_count(), 1);
}

#[test]
fn remove_all_inside_persistent_pass_is_contract_violation() {
    let event = Event0::new();
    let log = log();
    {
        let view = event.subscriber().clone();
        let log = Rc::clone(&log);
        event.add_listener(Listener::new(move || {
            log.borrow_mut().push("clear");
            view.remove_all();
        }));
    }
    event.add_listener(recorder(&log, "never"));

    let err = event.dispatch(()).unwrap_err();
    assert!(err.is_contract_violation());
    assert!(matches!(
        err,
        DispatchError::ListenersVanished {
            expected: 1,
            found: 0
        }
    ));
    assert_eq!(*log.borrow(), vec!["clear"]);

    // the channel stays usable
    event.add_listener(recorder(&log, "again"));
    event.dispatch(()).unwrap();
    assert_eq!(*log.borrow(), vec!["clear", "again"]);
}

#[test]
fn remove_all_by_last_persistent_listener_is_tolerated() {
    let event = Event0::new();
    let log = log();
    event.add_listener(recorder(&log, "first"));
    {
        let view = event.subscriber().clone();
        event.add_listener(Listener::new(move || view.remove_all()));
    }
    event.add_once(recorder(&log, "once"));

    event.dispatch(()).unwrap();
    // the one-time store was cleared before its pass began
    assert_eq!(*log.borrow(), vec!["first"]);
    assert_eq!(event.listener_count(), 0);
}

#[test]
fn remove_all_inside_one_time_pass_is_tolerated() {
    let event = Event0::new();
    let log = log();
    {
        let view = event.subscriber().clone();
        let log = Rc::clone(&log);
        event.add_once(Listener::new(move || {
            log.borrow_mut().push("clear");
            view.remove_all_with(false, true);
        }));
    }
    event.add_once(recorder(&log, "never"));
    event.dispatch(()).unwrap();
    assert_eq!(*log.borrow(), vec!["clear"]);
    assert_eq!(event.one_time_listener_count(), 0);
}

#[test]
fn listener_error_aborts_pass() {
    let event = Event1::<i32>::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    {
        let log = Rc::clone(&log);
        event.add_listener(Listener::new(move |n: &i32| log.borrow_mut().push(*n)));
    }
    event.add_listener(Listener::try_new(|(n,): &(i32,)| {
        if *n < 0 {
            Err(ListenerError::new("negative input"))
        } else {
            Ok(())
        }
    }));
    {
        let log = Rc::clone(&log);
        event.add_listener(Listener::new(move |n: &i32| log.borrow_mut().push(n * 10)));
    }
    let once = Listener::new(|_: &i32| {});
    event.add_once(once.clone());

    let err = event.dispatch((-1,)).unwrap_err();
    assert!(matches!(err, DispatchError::Listener(ref e) if e.message() == "negative input"));
    assert_eq!(*log.borrow(), vec![-1]);
    // the one-time pass never ran
    assert!(event.contains_once(&once));

    event.dispatch((2,)).unwrap();
    assert_eq!(*log.borrow(), vec![-1, 2, 20]);
    assert!(!event.contains_once(&once));
}

#[test]
fn bindings_through_the_view() {
    let event = Event0::new();
    let log = log();
    let mut binding = event
        .subscriber()
        .bind_listener(recorder(&log, "bound"))
        .unwrap();
    assert!(event.subscriber().bind_listener(binding.listener().clone()).is_none());

    event.dispatch(()).unwrap();
    assert!(binding.enable(false));
    event.dispatch(()).unwrap();
    assert!(binding.enable(true));
    event.dispatch(()).unwrap();
    assert_eq!(*log.borrow(), vec!["bound", "bound"]);
    assert_eq!(binding.listener_count(), 1);
}

#[test]
fn churn_observer_sees_one_time_retirement() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let event = Event0::with_config(
        ChannelConfig::new()
            .with_name("ticks")
            .with_observer(move |e: &ChurnEvent| sink.borrow_mut().push((e.channel.to_string(), e.churn))),
    );
    event.add_once(Listener::new(|| {}));
    event.dispatch(()).unwrap();
    assert_eq!(
        *seen.borrow(),
        vec![
            ("ticks".to_string(), Churn::Added),
            ("ticks".to_string(), Churn::Fired),
        ]
    );
}
