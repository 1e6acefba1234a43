use serde::{Deserialize, Serialize};

/// Runtime settings for a [`Scheduler`](crate::Scheduler) and its diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Unhandled-outcome reporting.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of tasks a single `run_until_idle` call may run.
    /// Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drain_budget: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Report non-empty fulfillments nobody consumed. Unconsumed rejections
    /// are always reported.
    #[serde(default = "default_true")]
    pub report_fulfilled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            report_fulfilled: default_true(),
        }
    }
}
