//! Integration test: fulfilling with a thenable adopts its outcome,
//! including nested and still-pending thenables.

use std::cell::RefCell;
use std::rc::Rc;

use pledge_core::{Promise, PromiseError, PromiseState, Resolution, Scheduler, Settle, Thenable};

type Outcome = Rc<RefCell<Option<Result<i32, String>>>>;

/// Helper: record whatever `promise` settles with.
fn observe(promise: &Promise<i32, String>) -> Outcome {
    let out: Outcome = Rc::new(RefCell::new(None));
    let ok = Rc::clone(&out);
    let err = Rc::clone(&out);
    promise
        .then_or_catch(
            move |v| {
                *ok.borrow_mut() = Some(Ok(v));
                Ok(())
            },
            move |e| {
                *err.borrow_mut() = Some(Err(e));
                Ok(())
            },
        )
        .unwrap();
    out
}

#[test]
fn test_adopts_pending_promise() {
    let scheduler = Scheduler::new();
    let (nested, nested_settle) = Promise::<i32, String>::deferred(&scheduler);
    let (root, settle) = Promise::<i32, String>::deferred(&scheduler);
    let outcome = observe(&root);

    settle.resolve(nested).unwrap();
    scheduler.run_until_idle().unwrap();
    assert_eq!(root.state(), PromiseState::Adopting);
    assert!(outcome.borrow().is_none());

    nested_settle.fulfill(10).unwrap();
    scheduler.run_until_idle().unwrap();
    assert_eq!(root.state(), PromiseState::Fulfilled);
    assert_eq!(*outcome.borrow(), Some(Ok(10)));
}

#[test]
fn test_adopts_rejection() {
    let scheduler = Scheduler::new();
    let nested = Promise::<i32, String>::rejected(&scheduler, "nested failed".into());
    let root = Promise::<i32, String>::new(&scheduler, |settle| {
        settle.resolve(nested).map_err(|e| e.to_string())
    });
    let outcome = observe(&root);

    scheduler.run_until_idle().unwrap();
    assert_eq!(root.state(), PromiseState::Rejected);
    assert_eq!(*outcome.borrow(), Some(Err("nested failed".to_string())));
}

#[test]
fn test_two_levels_of_flattening() {
    let scheduler = Scheduler::new();
    let (y, y_settle) = Promise::<i32, String>::deferred(&scheduler);
    let x = Promise::<i32, String>::new(&scheduler, |settle| {
        settle.resolve(y).map_err(|e| e.to_string())
    });
    let root = Promise::<i32, String>::new(&scheduler, |settle| {
        settle.resolve(x).map_err(|e| e.to_string())
    });
    let outcome = observe(&root);

    scheduler.run_until_idle().unwrap();
    assert!(outcome.borrow().is_none());

    y_settle.fulfill(3).unwrap();
    scheduler.run_until_idle().unwrap();
    assert_eq!(*outcome.borrow(), Some(Ok(3)));
}

#[test]
fn test_callback_returning_promise_is_flattened() {
    let scheduler = Scheduler::new();
    let (inner, inner_settle) = Promise::<i32, String>::deferred(&scheduler);

    let root = Promise::<i32, String>::resolved(&scheduler, 1);
    let flattened = root.and_then(move |_| Ok(Resolution::from(inner))).unwrap();
    let outcome = observe(&flattened);

    scheduler.run_until_idle().unwrap();
    assert_eq!(flattened.state(), PromiseState::Adopting);

    inner_settle.fulfill(99).unwrap();
    scheduler.run_until_idle().unwrap();
    assert_eq!(*outcome.borrow(), Some(Ok(99)));
}

#[test]
fn test_recovery_returning_promise_is_flattened() {
    let scheduler = Scheduler::new();
    let fallback = Promise::<i32, String>::resolved(&scheduler, 5);

    let root = Promise::<i32, String>::rejected(&scheduler, "primary down".into());
    let recovered = root.or_else(move |_| Ok(fallback.into())).unwrap();
    let outcome = observe(&recovered);

    scheduler.run_until_idle().unwrap();
    assert_eq!(*outcome.borrow(), Some(Ok(5)));
}

/// A thenable that is not a `Promise`: reports its outcome as soon as it
/// is subscribed to.
struct Immediate(Result<i32, String>);

impl Thenable<i32, String> for Immediate {
    fn subscribe(self: Box<Self>, settle: Settle<i32, String>) -> Result<(), PromiseError> {
        match self.0 {
            Ok(value) => settle.fulfill(value),
            Err(error) => settle.reject(error),
        }
    }
}

#[test]
fn test_adopts_foreign_thenable() {
    let scheduler = Scheduler::new();
    let ok_root = Promise::<i32, String>::new(&scheduler, |settle| {
        settle.adopt(Immediate(Ok(8))).map_err(|e| e.to_string())
    });
    let err_root = Promise::<i32, String>::new(&scheduler, |settle| {
        settle.adopt(Immediate(Err("nope".into()))).map_err(|e| e.to_string())
    });
    let ok_outcome = observe(&ok_root);
    let err_outcome = observe(&err_root);

    assert!(ok_outcome.borrow().is_none());
    scheduler.run_until_idle().unwrap();
    assert_eq!(*ok_outcome.borrow(), Some(Ok(8)));
    assert_eq!(*err_outcome.borrow(), Some(Err("nope".to_string())));
}

#[test]
fn test_producer_cannot_settle_while_adopting() {
    let scheduler = Scheduler::new();
    let (nested, nested_settle) = Promise::<i32, String>::deferred(&scheduler);
    let (root, settle) = Promise::<i32, String>::deferred(&scheduler);
    let outcome = observe(&root);

    settle.resolve(nested).unwrap();
    assert!(matches!(
        settle.fulfill(1),
        Err(PromiseError::AlreadySettled { .. })
    ));

    nested_settle.fulfill(2).unwrap();
    scheduler.run_until_idle().unwrap();
    assert_eq!(*outcome.borrow(), Some(Ok(2)));
}
