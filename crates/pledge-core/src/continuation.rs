use std::fmt;

use crate::error::PromiseError;
use crate::promise::{Resolution, Settle};

/// A user callback. Returning `Err` is how a callback "throws".
pub(crate) type Handler<I, U, E> = Box<dyn FnOnce(I) -> Result<Resolution<U, E>, E>>;

/// Success side of a continuation node.
pub(crate) enum OnFulfilled<T, U, E> {
    /// No success callback; the value passes through unchanged.
    Forward(fn(T) -> U),
    Call(Handler<T, U, E>),
}

/// The single downstream link of a settlement core, driven by its
/// deferred notification.
pub(crate) trait Continuation<T, E> {
    fn drive_fulfilled(self: Box<Self>, value: T) -> Result<(), PromiseError>;
    fn drive_rejected(self: Box<Self>, error: E) -> Result<(), PromiseError>;
}

/// Link created by `then`/`catch`: runs the matching callback and settles
/// the downstream promise with whatever it produced.
///
/// A normal return always goes through the downstream's resolve path (so a
/// returned thenable is adopted, and a recovered rejection becomes a
/// fulfillment); an `Err` always goes through reject.
pub(crate) struct ContinuationNode<T, U, E> {
    on_fulfilled: OnFulfilled<T, U, E>,
    on_rejected: Option<Handler<E, U, E>>,
    downstream: Settle<U, E>,
}

impl<T, U, E> ContinuationNode<T, U, E> {
    pub(crate) fn new(
        on_fulfilled: OnFulfilled<T, U, E>,
        on_rejected: Option<Handler<E, U, E>>,
        downstream: Settle<U, E>,
    ) -> Self {
        Self {
            on_fulfilled,
            on_rejected,
            downstream,
        }
    }
}

impl<T, U, E> Continuation<T, E> for ContinuationNode<T, U, E>
where
    U: fmt::Debug + 'static,
    E: fmt::Debug + 'static,
{
    fn drive_fulfilled(self: Box<Self>, value: T) -> Result<(), PromiseError> {
        let node = *self;
        let outcome = match node.on_fulfilled {
            OnFulfilled::Forward(forward) => Ok(Resolution::Value(forward(value))),
            OnFulfilled::Call(handler) => handler(value),
        };
        node.downstream.settle_with(outcome)
    }

    fn drive_rejected(self: Box<Self>, error: E) -> Result<(), PromiseError> {
        let node = *self;
        match node.on_rejected {
            None => node.downstream.reject(error),
            Some(handler) => node.downstream.settle_with(handler(error)),
        }
    }
}

/// Link used for adoption: mirrors a nested promise's outcome into the
/// adopting core through its adoption handle.
pub(crate) struct Relay<T, E> {
    target: Settle<T, E>,
}

impl<T, E> Relay<T, E> {
    pub(crate) fn new(target: Settle<T, E>) -> Self {
        Self { target }
    }
}

impl<T, E> Continuation<T, E> for Relay<T, E>
where
    T: fmt::Debug + 'static,
    E: fmt::Debug + 'static,
{
    fn drive_fulfilled(self: Box<Self>, value: T) -> Result<(), PromiseError> {
        self.target.fulfill(value)
    }

    fn drive_rejected(self: Box<Self>, error: E) -> Result<(), PromiseError> {
        self.target.reject(error)
    }
}
