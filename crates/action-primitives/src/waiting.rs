//! Waiting for the timeline to render before the loop starts

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::ActionError;
use crate::host::HostPage;

/// Waiting strategy trait
#[async_trait]
pub trait WaitStrategy: Send + Sync {
    /// Execute the wait strategy
    async fn wait(&self, host: &dyn HostPage, cancel: &CancellationToken)
        -> Result<(), ActionError>;
}

/// Polls until at least one content unit is rendered.
///
/// Used after a fresh launch, when the user may still have to sign in.
pub struct ContentReadyWait {
    /// Give up after this long (milliseconds)
    pub timeout_ms: u64,

    /// Delay between polls (milliseconds)
    pub poll_ms: u64,
}

impl Default for ContentReadyWait {
    fn default() -> Self {
        Self {
            timeout_ms: 120_000,
            poll_ms: 1_000,
        }
    }
}

#[async_trait]
impl WaitStrategy for ContentReadyWait {
    async fn wait(
        &self,
        host: &dyn HostPage,
        cancel: &CancellationToken,
    ) -> Result<(), ActionError> {
        let deadline = Instant::now() + Duration::from_millis(self.timeout_ms);
        let mut announced = false;
        loop {
            match host.content_units().await {
                Ok(units) if !units.is_empty() => {
                    debug!(units = units.len(), "timeline content rendered");
                    return Ok(());
                }
                Ok(_) => {}
                Err(err) => debug!(%err, "content probe failed"),
            }

            if Instant::now() >= deadline {
                return Err(ActionError::WaitTimeout(format!(
                    "no timeline content after {}ms",
                    self.timeout_ms
                )));
            }
            if !announced {
                info!("waiting for timeline content (sign in if prompted)");
                announced = true;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(ActionError::Interrupted("wait cancelled".to_string()));
                }
                _ = tokio::time::sleep(Duration::from_millis(self.poll_ms)) => {}
            }
        }
    }
}
