//! Pledge Core — a single-assignment asynchronous result.
//!
//! A [`Promise`] starts pending, is settled exactly once through its
//! [`Settle`] handle, and hands its outcome to at most one continuation.
//! Continuations never run inside the call that settled the promise: every
//! settlement goes through the [`Scheduler`], which the host drains after
//! its current unit of work.
//!
//! ```
//! use pledge_core::{Promise, Scheduler};
//!
//! let scheduler = Scheduler::new();
//! let root = Promise::<i32, String>::new(&scheduler, |settle| {
//!     settle.fulfill(20).map_err(|e| e.to_string())
//! });
//! let doubled = root.then(|v| Ok(v * 2)).unwrap();
//! let _done = doubled.then(|v| {
//!     assert_eq!(v, 40);
//!     Ok(())
//! }).unwrap();
//! scheduler.run_until_idle().unwrap();
//! ```

pub mod config;
mod continuation;
pub mod diagnostics;
pub mod error;
pub mod promise;
pub mod scheduler;
pub mod state;
pub mod types;

pub use config::{DiagnosticsConfig, RuntimeConfig, SchedulerConfig};
pub use diagnostics::{DiagnosticSink, OutcomeKind, RecordingSink, TracingSink, UnhandledOutcome, UnhandledRecord};
pub use error::PromiseError;
pub use promise::{Promise, Resolution, Settle, Thenable};
pub use scheduler::Scheduler;
pub use state::{PromiseState, PromiseStateMachine, SettleEvent};
pub use types::PromiseId;
