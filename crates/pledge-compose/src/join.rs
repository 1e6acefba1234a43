use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use pledge_core::{Promise, PromiseError, Scheduler};

/// Join `promises` into one promise of all their values, in input order.
///
/// The joined promise rejects with the first rejection; outcomes arriving
/// after that are ignored. An empty input fulfills with an empty vector.
///
/// Attaches the single continuation of every input, so fails with
/// `AlreadyHasContinuation` if any input already has one. Inputs before the
/// failing one stay attached to the (then abandoned) join.
pub fn all<T, E>(scheduler: &Scheduler, promises: Vec<Promise<T, E>>) -> Result<Promise<Vec<T>, E>, PromiseError>
where
    T: fmt::Debug + 'static,
    E: fmt::Debug + 'static,
{
    let (joined, settle) = Promise::deferred(scheduler);
    let total = promises.len();
    if total == 0 {
        settle.fulfill(Vec::new())?;
        return Ok(joined);
    }

    let slots: Rc<RefCell<Vec<Option<T>>>> = Rc::new(RefCell::new((0..total).map(|_| None).collect()));
    let remaining = Rc::new(Cell::new(total));

    for (index, promise) in promises.into_iter().enumerate() {
        let slots = Rc::clone(&slots);
        let remaining = Rc::clone(&remaining);
        let on_fulfilled = settle.clone();
        let on_rejected = settle.clone();

        promise.then_or_catch(
            move |value| {
                slots.borrow_mut()[index] = Some(value);
                remaining.set(remaining.get() - 1);
                if remaining.get() > 0 {
                    return Ok(());
                }
                if on_fulfilled.is_resolved() {
                    tracing::debug!(promise = %on_fulfilled.id(), "join already rejected, dropping values");
                    return Ok(());
                }
                let values: Vec<T> = slots.borrow_mut().drain(..).flatten().collect();
                if let Err(err) = on_fulfilled.fulfill(values) {
                    tracing::error!(promise = %on_fulfilled.id(), error = %err, "join could not fulfill");
                }
                Ok(())
            },
            move |error| {
                if on_rejected.is_resolved() {
                    tracing::debug!(promise = %on_rejected.id(), ?error, "join already settled, ignoring rejection");
                    return Ok(());
                }
                if let Err(err) = on_rejected.reject(error) {
                    tracing::error!(promise = %on_rejected.id(), error = %err, "join could not reject");
                }
                Ok(())
            },
        )?;
    }

    tracing::debug!(promise = %joined.id(), inputs = total, "join armed");
    Ok(joined)
}
