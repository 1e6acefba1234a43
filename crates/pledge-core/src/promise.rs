//! Settlement core and its producer/consumer handles.

use std::any::Any;
use std::cell::RefCell;
use std::convert;
use std::fmt;
use std::rc::Rc;

use crate::continuation::{Continuation, ContinuationNode, Handler, OnFulfilled, Relay};
use crate::diagnostics::UnhandledOutcome;
use crate::error::PromiseError;
use crate::scheduler::Scheduler;
use crate::state::{PromiseState, PromiseStateMachine, SettleEvent};
use crate::types::PromiseId;

enum Outcome<T, E> {
    Fulfilled(T),
    Rejected(E),
}

struct Core<T, E> {
    id: PromiseId,
    scheduler: Scheduler,
    state: PromiseState,
    /// Set once the producer handle has been used. Stays set while adopting.
    resolved: bool,
    /// Held from settlement until the deferred notification takes it.
    outcome: Option<Outcome<T, E>>,
    continuation: Option<Box<dyn Continuation<T, E>>>,
    has_continuation: bool,
    notified: bool,
}

type SharedCore<T, E> = Rc<RefCell<Core<T, E>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// Handed to the executor or kept by a continuation node. One use only.
    Producer,
    /// Handed to an adopted thenable. May finish an `Adopting` core.
    Adoption,
}

/// Capability of being adopted: anything that can report a single outcome
/// into a [`Settle`] handle.
///
/// `subscribe` may settle synchronously; the adopting promise still notifies
/// its own continuation through the scheduler.
pub trait Thenable<T, E> {
    fn subscribe(self: Box<Self>, settle: Settle<T, E>) -> Result<(), PromiseError>;
}

/// What a promise is fulfilled with: a plain value, or a thenable to adopt.
pub enum Resolution<T, E> {
    Value(T),
    Adopt(Box<dyn Thenable<T, E>>),
}

impl<T, E> Resolution<T, E> {
    pub fn adopt<P>(thenable: P) -> Self
    where
        P: Thenable<T, E> + 'static,
    {
        Self::Adopt(Box::new(thenable))
    }

    fn event(&self) -> SettleEvent {
        match self {
            Self::Value(_) => SettleEvent::Fulfill,
            Self::Adopt(_) => SettleEvent::Adopt,
        }
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Resolution<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Adopt(_) => f.write_str("Adopt(..)"),
        }
    }
}

impl<T, E> From<Promise<T, E>> for Resolution<T, E>
where
    T: fmt::Debug + 'static,
    E: fmt::Debug + 'static,
{
    fn from(promise: Promise<T, E>) -> Self {
        Self::Adopt(Box::new(promise))
    }
}

/// Producer handle: settles one promise.
///
/// The handle given to an executor (or returned by [`Promise::deferred`])
/// is one-shot: after any successful `fulfill`, `resolve`, `adopt` or
/// `reject`, every further call fails with `AlreadySettled`, even while the
/// promise is still adopting a nested thenable. Clones share that budget.
pub struct Settle<T, E> {
    core: SharedCore<T, E>,
    role: Role,
}

impl<T, E> Clone for Settle<T, E> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
            role: self.role,
        }
    }
}

impl<T, E> fmt::Debug for Settle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("Settle")
            .field("promise", &core.id)
            .field("state", &core.state)
            .field("role", &self.role)
            .finish()
    }
}

impl<T, E> Settle<T, E>
where
    T: fmt::Debug + 'static,
    E: fmt::Debug + 'static,
{
    pub fn id(&self) -> PromiseId {
        self.core.borrow().id
    }

    pub fn state(&self) -> PromiseState {
        self.core.borrow().state
    }

    /// Whether this handle can no longer settle its promise.
    pub fn is_resolved(&self) -> bool {
        let core = self.core.borrow();
        match self.role {
            Role::Producer => core.resolved,
            Role::Adoption => core.state.is_final(),
        }
    }

    /// Fulfill with a plain value.
    pub fn fulfill(&self, value: T) -> Result<(), PromiseError> {
        self.resolve(Resolution::Value(value))
    }

    /// Fulfill with a thenable, mirroring its eventual outcome.
    pub fn adopt<P>(&self, thenable: P) -> Result<(), PromiseError>
    where
        P: Thenable<T, E> + 'static,
    {
        self.resolve(Resolution::adopt(thenable))
    }

    /// The resolution procedure. A plain value fulfills and schedules the
    /// notification; a thenable moves the promise to `Adopting` and
    /// subscribes to it.
    ///
    /// If the thenable refuses the subscription, the promise is put back the
    /// way it was and the error is returned.
    pub fn resolve(&self, resolution: impl Into<Resolution<T, E>>) -> Result<(), PromiseError> {
        let resolution = resolution.into();
        let previous = self.begin(resolution.event())?;

        match resolution {
            Resolution::Value(value) => {
                self.core.borrow_mut().outcome = Some(Outcome::Fulfilled(value));
                self.notify_later()
            }
            Resolution::Adopt(thenable) => {
                let adoption = Settle {
                    core: Rc::clone(&self.core),
                    role: Role::Adoption,
                };
                if let Err(err) = thenable.subscribe(adoption) {
                    self.rollback(previous);
                    return Err(err);
                }
                Ok(())
            }
        }
    }

    pub fn reject(&self, error: E) -> Result<(), PromiseError> {
        self.begin(SettleEvent::Reject)?;
        self.core.borrow_mut().outcome = Some(Outcome::Rejected(error));
        self.notify_later()
    }

    /// Settle from a callback result: `Ok` resolves, `Err` rejects.
    pub(crate) fn settle_with(&self, result: Result<Resolution<T, E>, E>) -> Result<(), PromiseError> {
        match result {
            Ok(resolution) => self.resolve(resolution),
            Err(error) => self.reject(error),
        }
    }

    /// Apply `event` to the state. Returns the state before the transition.
    fn begin(&self, event: SettleEvent) -> Result<PromiseState, PromiseError> {
        let mut core = self.core.borrow_mut();
        if self.role == Role::Producer && core.resolved {
            return Err(PromiseError::AlreadySettled {
                state: core.state,
                event,
            });
        }

        let next = PromiseStateMachine::transition(core.state, event)?;
        let previous = core.state;
        core.state = next;
        if self.role == Role::Producer {
            core.resolved = true;
        }
        Ok(previous)
    }

    fn rollback(&self, previous: PromiseState) {
        let mut core = self.core.borrow_mut();
        if core.state == PromiseState::Adopting {
            tracing::debug!(promise = %core.id, restored = %previous, "adoption refused");
            core.state = previous;
            if self.role == Role::Producer {
                core.resolved = false;
            }
        }
    }

    fn notify_later(&self) -> Result<(), PromiseError> {
        let (scheduler, id) = {
            let core = self.core.borrow();
            (core.scheduler.clone(), core.id)
        };
        let core = Rc::clone(&self.core);
        scheduler.schedule(id, move || deliver(&core))
    }
}

/// Deferred notification body: hand the outcome to the continuation, or
/// report it when there is none.
fn deliver<T, E>(core: &SharedCore<T, E>) -> Result<(), PromiseError>
where
    T: fmt::Debug + 'static,
    E: fmt::Debug + 'static,
{
    let (id, outcome, continuation, sink) = {
        let mut core = core.borrow_mut();
        core.notified = true;
        (
            core.id,
            core.outcome.take(),
            core.continuation.take(),
            core.scheduler.sink(),
        )
    };

    match (outcome, continuation) {
        (Some(Outcome::Fulfilled(value)), Some(next)) => next.drive_fulfilled(value),
        (Some(Outcome::Rejected(error)), Some(next)) => next.drive_rejected(error),
        (Some(Outcome::Fulfilled(value)), None) => {
            if !is_empty(&value) {
                sink.unhandled(UnhandledOutcome::Fulfilled {
                    promise: id,
                    value: &value,
                });
            }
            Ok(())
        }
        (Some(Outcome::Rejected(error)), None) => {
            sink.unhandled(UnhandledOutcome::Rejected {
                promise: id,
                error: &error,
            });
            Ok(())
        }
        (None, _) => Ok(()),
    }
}

fn is_empty<T: 'static>(value: &T) -> bool {
    (value as &dyn Any).is::<()>()
}

/// Consumer handle: observe a promise's outcome by attaching its single
/// continuation.
///
/// Cloning yields another handle to the same promise; the one-continuation
/// limit is shared by all clones.
pub struct Promise<T, E> {
    core: SharedCore<T, E>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("Promise")
            .field("id", &core.id)
            .field("state", &core.state)
            .field("has_continuation", &core.has_continuation)
            .finish()
    }
}

impl<T, E> Promise<T, E>
where
    T: fmt::Debug + 'static,
    E: fmt::Debug + 'static,
{
    /// A pending promise and the producer handle that settles it.
    pub fn deferred(scheduler: &Scheduler) -> (Self, Settle<T, E>) {
        let core = Rc::new(RefCell::new(Core {
            id: scheduler.allocate_id(),
            scheduler: scheduler.clone(),
            state: PromiseState::Pending,
            resolved: false,
            outcome: None,
            continuation: None,
            has_continuation: false,
            notified: false,
        }));
        let settle = Settle {
            core: Rc::clone(&core),
            role: Role::Producer,
        };
        (Self { core }, settle)
    }

    /// Create a promise and run `executor` on it before returning.
    ///
    /// An `Err` from the executor rejects the promise, unless the executor
    /// already settled it, in which case the error is logged and dropped.
    pub fn new<F>(scheduler: &Scheduler, executor: F) -> Self
    where
        F: FnOnce(Settle<T, E>) -> Result<(), E>,
    {
        let (promise, settle) = Self::deferred(scheduler);
        if let Err(error) = executor(settle.clone()) {
            if settle.is_resolved() {
                tracing::error!(
                    promise = %promise.id(),
                    ?error,
                    "executor failed after settling its promise"
                );
            } else if let Err(misuse) = settle.reject(error) {
                tracing::error!(promise = %promise.id(), error = %misuse, "executor rejection refused");
            }
        }
        promise
    }

    /// A promise already fulfilled with `value`. Continuations still run deferred.
    pub fn resolved(scheduler: &Scheduler, value: T) -> Self {
        Self::new(scheduler, |settle| {
            settle
                .fulfill(value)
                .unwrap_or_else(|err| tracing::error!(error = %err, "fresh promise refused value"));
            Ok(())
        })
    }

    /// A promise already rejected with `error`.
    pub fn rejected(scheduler: &Scheduler, error: E) -> Self {
        Self::new(scheduler, |settle| {
            settle
                .reject(error)
                .unwrap_or_else(|err| tracing::error!(error = %err, "fresh promise refused error"));
            Ok(())
        })
    }

    pub fn id(&self) -> PromiseId {
        self.core.borrow().id
    }

    pub fn state(&self) -> PromiseState {
        self.core.borrow().state
    }

    pub fn has_continuation(&self) -> bool {
        self.core.borrow().has_continuation
    }

    pub fn scheduler(&self) -> Scheduler {
        self.core.borrow().scheduler.clone()
    }

    /// Map the value. An `Err` from `on_fulfilled` rejects the returned
    /// promise; a rejection of this promise passes through untouched.
    pub fn then<U, F>(&self, on_fulfilled: F) -> Result<Promise<U, E>, PromiseError>
    where
        U: fmt::Debug + 'static,
        F: FnOnce(T) -> Result<U, E> + 'static,
    {
        self.attach(
            OnFulfilled::Call(Box::new(move |value| on_fulfilled(value).map(Resolution::Value))),
            None,
        )
    }

    /// Like [`then`](Self::then), but the callback may return a thenable,
    /// which the returned promise adopts.
    pub fn and_then<U, F>(&self, on_fulfilled: F) -> Result<Promise<U, E>, PromiseError>
    where
        U: fmt::Debug + 'static,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + 'static,
    {
        self.attach(OnFulfilled::Call(Box::new(on_fulfilled)), None)
    }

    /// Attach both callbacks at once. `Ok` from either fulfills the returned
    /// promise, `Err` from either rejects it.
    pub fn then_or_catch<U, F, G>(&self, on_fulfilled: F, on_rejected: G) -> Result<Promise<U, E>, PromiseError>
    where
        U: fmt::Debug + 'static,
        F: FnOnce(T) -> Result<U, E> + 'static,
        G: FnOnce(E) -> Result<U, E> + 'static,
    {
        self.attach(
            OnFulfilled::Call(Box::new(move |value| on_fulfilled(value).map(Resolution::Value))),
            Some(Box::new(move |error| on_rejected(error).map(Resolution::Value))),
        )
    }

    /// Recover from a rejection. A fulfilled value passes through untouched.
    pub fn catch_only<G>(&self, on_rejected: G) -> Result<Promise<T, E>, PromiseError>
    where
        G: FnOnce(E) -> Result<T, E> + 'static,
    {
        self.attach(
            OnFulfilled::Forward(convert::identity),
            Some(Box::new(move |error| on_rejected(error).map(Resolution::Value))),
        )
    }

    /// Like [`catch_only`](Self::catch_only), but the callback may return a thenable.
    pub fn or_else<G>(&self, on_rejected: G) -> Result<Promise<T, E>, PromiseError>
    where
        G: FnOnce(E) -> Result<Resolution<T, E>, E> + 'static,
    {
        self.attach(OnFulfilled::Forward(convert::identity), Some(Box::new(on_rejected)))
    }

    pub(crate) fn attach<U>(
        &self,
        on_fulfilled: OnFulfilled<T, U, E>,
        on_rejected: Option<Handler<E, U, E>>,
    ) -> Result<Promise<U, E>, PromiseError>
    where
        U: fmt::Debug + 'static,
    {
        if self.has_continuation() {
            return Err(PromiseError::AlreadyHasContinuation { promise: self.id() });
        }
        let (downstream, settle) = Promise::deferred(&self.scheduler());
        self.set_continuation(Box::new(ContinuationNode::new(on_fulfilled, on_rejected, settle)))?;
        Ok(downstream)
    }

    fn set_continuation(&self, node: Box<dyn Continuation<T, E>>) -> Result<(), PromiseError> {
        let mut core = self.core.borrow_mut();
        if core.has_continuation {
            return Err(PromiseError::AlreadyHasContinuation { promise: core.id });
        }
        if core.notified {
            tracing::warn!(
                promise = %core.id,
                state = %core.state,
                "continuation attached after the outcome was delivered, it will never run"
            );
        }
        core.has_continuation = true;
        core.continuation = Some(node);
        Ok(())
    }
}

impl<T, E> Thenable<T, E> for Promise<T, E>
where
    T: fmt::Debug + 'static,
    E: fmt::Debug + 'static,
{
    fn subscribe(self: Box<Self>, settle: Settle<T, E>) -> Result<(), PromiseError> {
        self.set_continuation(Box::new(Relay::new(settle)))
    }
}
