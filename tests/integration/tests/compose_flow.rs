//! Integration test: join and coalescing on top of the core primitive.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pledge_compose::{all, Coalescer};
use pledge_core::{OutcomeKind, Promise, RecordingSink, Scheduler, Settle};

#[test]
fn test_refresh_token_rounds() {
    let sink = Rc::new(RecordingSink::new());
    let scheduler = Scheduler::new().with_sink(sink.clone());
    let counter = Rc::new(Cell::new(0u32));
    let server: Rc<RefCell<Option<Settle<String, String>>>> = Rc::new(RefCell::new(None));

    let refresh = {
        let counter = Rc::clone(&counter);
        let server = Rc::clone(&server);
        let inner = scheduler.clone();
        Coalescer::new(&scheduler, move || {
            counter.set(counter.get() + 1);
            let (promise, settle) = Promise::deferred(&inner);
            *server.borrow_mut() = Some(settle);
            promise
        })
    };

    for round in 0..3u32 {
        let requests: Vec<_> = (0..3).map(|_| refresh.call().unwrap()).collect();
        assert_eq!(counter.get(), round + 1);

        let tokens = Rc::new(RefCell::new(Vec::new()));
        let out = Rc::clone(&tokens);
        let _done = all(&scheduler, requests)
            .unwrap()
            .then(move |values| {
                *out.borrow_mut() = values;
                Ok(())
            })
            .unwrap();

        let settle = server.borrow_mut().take().unwrap();
        settle.fulfill(format!("token:{}", round)).unwrap();
        scheduler.run_until_idle().unwrap();

        let expected = format!("token:{}", round);
        assert_eq!(*tokens.borrow(), vec![expected.clone(), expected.clone(), expected]);
        assert!(!refresh.in_flight());
    }

    assert!(sink.is_empty());
}

#[test]
fn test_all_over_already_settled_inputs() {
    let scheduler = Scheduler::new();
    let inputs = vec![
        Promise::<u8, String>::resolved(&scheduler, 1),
        Promise::<u8, String>::resolved(&scheduler, 2),
        Promise::<u8, String>::resolved(&scheduler, 3),
    ];
    let joined = all(&scheduler, inputs).unwrap();
    let sum = Rc::new(Cell::new(0u32));
    let out = Rc::clone(&sum);
    let _done = joined
        .then(move |values| {
            out.set(values.iter().map(|v| u32::from(*v)).sum());
            Ok(())
        })
        .unwrap();

    assert_eq!(sum.get(), 0);
    scheduler.run_until_idle().unwrap();
    assert_eq!(sum.get(), 6);
}

#[test]
fn test_unconsumed_join_rejection_is_reported() {
    let sink = Rc::new(RecordingSink::new());
    let scheduler = Scheduler::new().with_sink(sink.clone());
    let inputs = vec![
        Promise::<u8, String>::resolved(&scheduler, 1),
        Promise::<u8, String>::rejected(&scheduler, "endpoint unreachable".into()),
    ];
    let joined = all(&scheduler, inputs).unwrap();

    scheduler.run_until_idle().unwrap();
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].promise, joined.id());
    assert_eq!(records[0].kind, OutcomeKind::Rejected);
    assert_eq!(sink.count(OutcomeKind::Fulfilled), 0);
}
