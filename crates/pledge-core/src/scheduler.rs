//! Deferred notification scheduler.
//!
//! A promise never runs its continuation inside the call that settled it.
//! Settlement pushes a task here instead, and the host drains the queue once
//! its current unit of work has returned, with [`Scheduler::tick`] or
//! [`Scheduler::run_until_idle`].

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use crate::config::RuntimeConfig;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::error::PromiseError;
use crate::types::PromiseId;

type Task = Box<dyn FnOnce() -> Result<(), PromiseError>>;

struct Queued {
    owner: PromiseId,
    task: Task,
}

struct SchedulerInner {
    queue: VecDeque<Queued>,
    /// Owners with a task in `queue`; each may have at most one.
    outstanding: HashSet<PromiseId>,
    next_id: u64,
    drain_budget: Option<usize>,
    sink: Rc<dyn DiagnosticSink>,
}

/// FIFO queue of deferred notifications for one cooperative context.
///
/// Cloning yields another handle to the same queue. Every promise keeps a
/// handle to the scheduler it was created from, and promises derived from
/// it through `then` and friends share it.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl Scheduler {
    /// Unbounded scheduler reporting unhandled outcomes through `tracing`.
    pub fn new() -> Self {
        Self::from_config(&RuntimeConfig::default())
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                queue: VecDeque::new(),
                outstanding: HashSet::new(),
                next_id: 1,
                drain_budget: config.scheduler.drain_budget,
                sink: Rc::new(TracingSink::new(&config.diagnostics)),
            })),
        }
    }

    /// Replace the diagnostic sink.
    pub fn with_sink(self, sink: Rc<dyn DiagnosticSink>) -> Self {
        self.inner.borrow_mut().sink = sink;
        self
    }

    pub(crate) fn allocate_id(&self) -> PromiseId {
        let mut inner = self.inner.borrow_mut();
        let id = PromiseId::new(inner.next_id);
        inner.next_id += 1;
        id
    }

    pub(crate) fn sink(&self) -> Rc<dyn DiagnosticSink> {
        Rc::clone(&self.inner.borrow().sink)
    }

    /// Queue `task` to run after the current synchronous work.
    ///
    /// Fails with `DoubleScheduled` if `owner` already has a task queued.
    pub fn schedule<F>(&self, owner: PromiseId, task: F) -> Result<(), PromiseError>
    where
        F: FnOnce() -> Result<(), PromiseError> + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        if !inner.outstanding.insert(owner) {
            return Err(PromiseError::DoubleScheduled { promise: owner });
        }
        inner.queue.push_back(Queued {
            owner,
            task: Box::new(task),
        });
        tracing::trace!(promise = %owner, queued = inner.queue.len(), "scheduled notification");
        Ok(())
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.inner.borrow().queue.is_empty()
    }

    /// Run the oldest queued task. Returns `Ok(false)` when nothing was queued.
    ///
    /// Tasks scheduled while this one runs go to the back of the queue.
    pub fn tick(&self) -> Result<bool, PromiseError> {
        let next = {
            let mut inner = self.inner.borrow_mut();
            let next = inner.queue.pop_front();
            if let Some(queued) = &next {
                inner.outstanding.remove(&queued.owner);
            }
            next
        };

        match next {
            Some(queued) => {
                (queued.task)()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run tasks until the queue is empty, including tasks queued along the
    /// way. Returns how many ran.
    ///
    /// Stops at the first programming error raised by a task; the remaining
    /// tasks stay queued.
    pub fn run_until_idle(&self) -> Result<usize, PromiseError> {
        let budget = self.inner.borrow().drain_budget;
        let mut ran = 0;
        loop {
            if let Some(budget) = budget {
                if ran >= budget && !self.is_idle() {
                    let remaining = self.pending();
                    tracing::warn!(budget, remaining, "scheduler drain budget exhausted");
                    return Err(PromiseError::DrainBudgetExceeded { budget, remaining });
                }
            }
            if !self.tick()? {
                break;
            }
            ran += 1;
        }
        tracing::trace!(ran, "scheduler idle");
        Ok(ran)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
