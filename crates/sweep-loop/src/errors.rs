use action_primitives::ActionError;
use thiserror::Error;

/// Errors emitted by the sweep loop.
#[derive(Debug, Error)]
pub enum SweepError {
    /// The owning account cannot be derived from the page location.
    /// Fatal before the loop starts; transient once it runs.
    #[error("cannot determine timeline owner from '{0}'")]
    OwnerUndetectable(String),

    /// The page navigated away from the owner's timeline.
    #[error("page left the timeline of '{expected}' (now at '{location}')")]
    OwnerDrift { expected: String, location: String },

    /// A host interaction outside the delete flow failed.
    #[error("host interaction failed: {0}")]
    Host(#[from] ActionError),
}

impl SweepError {
    /// Helper for undetectable owner scenarios.
    pub fn owner_undetectable(location: impl Into<String>) -> Self {
        Self::OwnerUndetectable(location.into())
    }

    /// Whether the next iteration may succeed without outside help.
    pub fn is_retryable(&self) -> bool {
        match self {
            SweepError::Host(err) => err.is_retryable(),
            SweepError::OwnerUndetectable(_) | SweepError::OwnerDrift { .. } => false,
        }
    }
}
