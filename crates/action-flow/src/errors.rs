//! Driver error types

use action_primitives::ActionError;
use thiserror::Error;

use crate::types::DeleteStep;

/// Failure of a single step of the delete flow.
///
/// Never escapes the driver: it is folded into [`crate::DeleteOutcome::Errored`].
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{step} failed: {source}")]
    Step {
        step: DeleteStep,
        #[source]
        source: ActionError,
    },
}

impl DriverError {
    pub fn step(step: DeleteStep) -> impl FnOnce(ActionError) -> DriverError {
        move |source| DriverError::Step { step, source }
    }

    pub fn failed_step(&self) -> DeleteStep {
        match self {
            DriverError::Step { step, .. } => *step,
        }
    }
}
