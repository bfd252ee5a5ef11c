//! Error types for host page operations

use cdp_adapter::{AdapterError, AdapterErrorKind};
use thiserror::Error;

/// Failures raised while talking to the host page.
#[derive(Debug, Error, Clone)]
pub enum ActionError {
    /// Wait operation timed out
    #[error("Wait timeout: {0}")]
    WaitTimeout(String),

    /// Operation was cancelled or interrupted
    #[error("Operation interrupted: {0}")]
    Interrupted(String),

    /// The element behind a handle is gone from the document
    #[error("Handle not found: {0}")]
    HandleNotFound(String),

    /// A page script threw or returned something unexpected
    #[error("Script failure: {0}")]
    Script(String),

    /// CDP communication or protocol error
    #[error("CDP I/O error: {0}")]
    CdpIo(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActionError::WaitTimeout(_) | ActionError::HandleNotFound(_) | ActionError::CdpIo(_)
        )
    }
}

impl From<AdapterError> for ActionError {
    fn from(err: AdapterError) -> Self {
        let message = err.to_string();
        match err.kind {
            AdapterErrorKind::TargetNotFound => {
                ActionError::HandleNotFound(err.hint.unwrap_or(message))
            }
            AdapterErrorKind::NavTimeout => ActionError::WaitTimeout(err.hint.unwrap_or(message)),
            AdapterErrorKind::ScriptException => ActionError::Script(message),
            AdapterErrorKind::CdpIo => ActionError::CdpIo(message),
            AdapterErrorKind::Internal => ActionError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_adapter_kinds() {
        let err: ActionError = AdapterError::new(AdapterErrorKind::NavTimeout)
            .with_hint("slow page")
            .into();
        assert!(matches!(err, ActionError::WaitTimeout(ref m) if m == "slow page"));
        assert!(err.is_retryable());

        let err: ActionError = AdapterError::new(AdapterErrorKind::ScriptException).into();
        assert!(matches!(err, ActionError::Script(_)));
        assert!(!err.is_retryable());
    }
}
