//! Run state owned by the sweep loop.

use action_primitives::{OwnerId, RetiredLedger};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::SweepConfig;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    AttemptBudgetExhausted,
    NoProgressBudgetExhausted,
    /// Stopped from outside (Ctrl-C).
    Cancelled,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::AttemptBudgetExhausted => "attempt-budget-exhausted",
            TerminationReason::NoProgressBudgetExhausted => "no-progress-budget-exhausted",
            TerminationReason::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    Scanning,
    Processing,
    Advancing,
    Terminated(TerminationReason),
}

/// Counters and ledger for one run. Owned by the loop, never shared.
#[derive(Debug, Clone)]
pub struct RunState {
    pub owner: OwnerId,
    pub attempts: u32,
    pub deleted: u32,
    pub no_progress: u32,
    pub retired: RetiredLedger,
    pub phase: LoopPhase,
}

impl RunState {
    pub fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            attempts: 0,
            deleted: 0,
            no_progress: 0,
            retired: RetiredLedger::new(),
            phase: LoopPhase::Scanning,
        }
    }

    /// Budget check made on every entry to `Scanning`.
    pub fn exhausted_budget(&self, config: &SweepConfig) -> Option<TerminationReason> {
        if self.attempts >= config.attempt_budget {
            Some(TerminationReason::AttemptBudgetExhausted)
        } else if self.no_progress >= config.no_progress_budget {
            Some(TerminationReason::NoProgressBudgetExhausted)
        } else {
            None
        }
    }

    pub fn record_deleted(&mut self) {
        self.deleted += 1;
        self.no_progress = 0;
    }

    pub fn record_idle(&mut self) {
        self.no_progress += 1;
    }

    pub fn enter(&mut self, phase: LoopPhase) {
        self.phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> RunState {
        RunState::new(OwnerId::parse("alice").unwrap())
    }

    #[test]
    fn attempts_are_checked_before_progress() {
        let config = SweepConfig::new().attempts(3).no_progress(3);
        let mut state = state();
        assert_eq!(state.exhausted_budget(&config), None);
        state.attempts = 3;
        state.no_progress = 3;
        assert_eq!(
            state.exhausted_budget(&config),
            Some(TerminationReason::AttemptBudgetExhausted)
        );
        state.attempts = 1;
        assert_eq!(
            state.exhausted_budget(&config),
            Some(TerminationReason::NoProgressBudgetExhausted)
        );
    }

    #[test]
    fn deletion_resets_no_progress() {
        let mut state = state();
        state.record_idle();
        state.record_idle();
        state.record_deleted();
        assert_eq!(state.deleted, 1);
        assert_eq!(state.no_progress, 0);
    }

    #[test]
    fn zero_budget_terminates_immediately() {
        let config = SweepConfig::new().attempts(0);
        assert_eq!(
            state().exhausted_budget(&config),
            Some(TerminationReason::AttemptBudgetExhausted)
        );
    }
}
