use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use pledge_core::{Promise, PromiseError, Scheduler, Settle};

type Waiters<T, E> = Rc<RefCell<Option<Vec<Settle<T, E>>>>>;

/// Runs one execution on behalf of many concurrent callers.
///
/// The first [`call`](Self::call) while idle starts an execution through the
/// start function; calls made before it settles join it. Every caller gets
/// its own promise, settled with a clone of the shared outcome. Once the
/// execution settles the coalescer is idle again, and the next call starts
/// a fresh one.
///
/// Typical use is a token refresh that many requests discover they need at
/// the same time.
pub struct Coalescer<T, E> {
    scheduler: Scheduler,
    start: RefCell<Box<dyn FnMut() -> Promise<T, E>>>,
    waiters: Waiters<T, E>,
}

impl<T, E> Coalescer<T, E>
where
    T: Clone + fmt::Debug + 'static,
    E: Clone + fmt::Debug + 'static,
{
    pub fn new<F>(scheduler: &Scheduler, start: F) -> Self
    where
        F: FnMut() -> Promise<T, E> + 'static,
    {
        Self {
            scheduler: scheduler.clone(),
            start: RefCell::new(Box::new(start)),
            waiters: Rc::new(RefCell::new(None)),
        }
    }

    /// Whether an execution is currently running.
    pub fn in_flight(&self) -> bool {
        self.waiters.borrow().is_some()
    }

    /// Number of callers waiting on the current execution.
    pub fn waiting(&self) -> usize {
        self.waiters.borrow().as_ref().map_or(0, Vec::len)
    }

    /// Join the in-flight execution, starting one if idle.
    ///
    /// Fails with `AlreadyHasContinuation` when the start function hands
    /// back a promise that someone else already consumes; the coalescer
    /// stays idle in that case.
    pub fn call(&self) -> Result<Promise<T, E>, PromiseError> {
        if !self.in_flight() {
            self.launch()?;
        }

        let (promise, settle) = Promise::deferred(&self.scheduler);
        if let Some(waiters) = self.waiters.borrow_mut().as_mut() {
            waiters.push(settle);
        }
        tracing::trace!(promise = %promise.id(), waiting = self.waiting(), "caller joined execution");
        Ok(promise)
    }

    fn launch(&self) -> Result<(), PromiseError> {
        let execution = {
            let mut start = self.start.borrow_mut();
            (*start)()
        };
        let on_fulfilled = Rc::clone(&self.waiters);
        let on_rejected = Rc::clone(&self.waiters);

        execution.then_or_catch(
            move |value: T| {
                let waiters = on_fulfilled.borrow_mut().take().unwrap_or_default();
                tracing::debug!(waiters = waiters.len(), "execution fulfilled, notifying callers");
                for waiter in waiters {
                    if let Err(err) = waiter.fulfill(value.clone()) {
                        tracing::error!(promise = %waiter.id(), error = %err, "caller could not be fulfilled");
                    }
                }
                Ok(())
            },
            move |error: E| {
                let waiters = on_rejected.borrow_mut().take().unwrap_or_default();
                tracing::debug!(waiters = waiters.len(), ?error, "execution rejected, notifying callers");
                for waiter in waiters {
                    if let Err(err) = waiter.reject(error.clone()) {
                        tracing::error!(promise = %waiter.id(), error = %err, "caller could not be rejected");
                    }
                }
                Ok(())
            },
        )?;

        *self.waiters.borrow_mut() = Some(Vec::new());
        tracing::debug!(promise = %execution.id(), "started execution");
        Ok(())
    }
}
