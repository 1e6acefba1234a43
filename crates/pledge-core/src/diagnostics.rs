//! Reporting of outcomes that reached a final state with nobody listening.

use std::cell::RefCell;
use std::fmt;

use crate::config::DiagnosticsConfig;
use crate::types::PromiseId;

/// A final settlement whose deferred notification found no continuation.
pub enum UnhandledOutcome<'a> {
    Fulfilled {
        promise: PromiseId,
        value: &'a dyn fmt::Debug,
    },
    Rejected {
        promise: PromiseId,
        error: &'a dyn fmt::Debug,
    },
}

impl UnhandledOutcome<'_> {
    pub fn promise(&self) -> PromiseId {
        match self {
            Self::Fulfilled { promise, .. } | Self::Rejected { promise, .. } => *promise,
        }
    }
}

/// Receiver of unhandled-outcome reports.
///
/// Fulfillments with the empty value `()` are filtered out before a sink
/// sees them.
pub trait DiagnosticSink {
    fn unhandled(&self, outcome: UnhandledOutcome<'_>);
}

/// Default sink: logs through `tracing`.
#[derive(Debug, Clone)]
pub struct TracingSink {
    report_fulfilled: bool,
}

impl TracingSink {
    pub fn new(config: &DiagnosticsConfig) -> Self {
        Self {
            report_fulfilled: config.report_fulfilled,
        }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(&DiagnosticsConfig::default())
    }
}

impl DiagnosticSink for TracingSink {
    fn unhandled(&self, outcome: UnhandledOutcome<'_>) {
        match outcome {
            UnhandledOutcome::Fulfilled { promise, value } => {
                if self.report_fulfilled {
                    tracing::info!(%promise, ?value, "promise fulfilled, but no then()");
                }
            }
            UnhandledOutcome::Rejected { promise, error } => {
                tracing::error!(%promise, ?error, "promise rejected, but no catch()");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Fulfilled,
    Rejected,
}

/// One report captured by [`RecordingSink`], with the payload rendered via `Debug`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledRecord {
    pub promise: PromiseId,
    pub kind: OutcomeKind,
    pub rendered: String,
}

/// Sink that keeps every report in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: RefCell<Vec<UnhandledRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far, in report order.
    pub fn records(&self) -> Vec<UnhandledRecord> {
        self.records.borrow().clone()
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.records.borrow().iter().filter(|r| r.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl DiagnosticSink for RecordingSink {
    fn unhandled(&self, outcome: UnhandledOutcome<'_>) {
        let record = match outcome {
            UnhandledOutcome::Fulfilled { promise, value } => UnhandledRecord {
                promise,
                kind: OutcomeKind::Fulfilled,
                rendered: format!("{:?}", value),
            },
            UnhandledOutcome::Rejected { promise, error } => UnhandledRecord {
                promise,
                kind: OutcomeKind::Rejected,
                rendered: format!("{:?}", error),
            },
        };
        self.records.borrow_mut().push(record);
    }
}
