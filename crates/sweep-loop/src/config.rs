//! Configuration for the sweep loop.

use serde::{Deserialize, Serialize};

/// Budgets and switches for one sweep run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Scan iterations before the run stops.
    /// Default: 2850
    pub attempt_budget: u32,

    /// Consecutive iterations without a deletion before the run stops.
    /// Default: 20
    pub no_progress_budget: u32,

    /// Delay before the first scan, letting the page settle.
    /// Default: 4000
    pub startup_delay_ms: u64,

    /// Hide the site's side column after each processed item.
    /// Default: true
    pub declutter: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            attempt_budget: 2_850,
            no_progress_budget: 20,
            startup_delay_ms: 4_000,
            declutter: true,
        }
    }
}

impl SweepConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Small budgets and no startup delay, for tests.
    pub fn minimal() -> Self {
        Self {
            attempt_budget: 50,
            no_progress_budget: 3,
            startup_delay_ms: 0,
            declutter: false,
        }
    }

    /// Builder: set the attempt budget.
    pub fn attempts(mut self, budget: u32) -> Self {
        self.attempt_budget = budget;
        self
    }

    /// Builder: set the no-progress budget.
    pub fn no_progress(mut self, budget: u32) -> Self {
        self.no_progress_budget = budget;
        self
    }

    /// Builder: set the startup delay.
    pub fn startup_delay(mut self, ms: u64) -> Self {
        self.startup_delay_ms = ms;
        self
    }

    /// Builder: toggle decluttering.
    pub fn declutter(mut self, enabled: bool) -> Self {
        self.declutter = enabled;
        self
    }
}
