//! Viewport advancer: scroll roughly one content unit, then let the page render.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::errors::ActionError;
use crate::host::HostPage;
use crate::tempo::{Pacer, Pause};
use crate::types::ScrollBehavior;

/// Scroll distance policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepPolicy {
    /// Distance used when no unit height is known.
    pub scroll_step_px: f64,
    pub min_step_px: f64,
    pub max_step_px: f64,
}

impl Default for StepPolicy {
    fn default() -> Self {
        Self {
            scroll_step_px: 500.0,
            min_step_px: 200.0,
            max_step_px: 1_200.0,
        }
    }
}

impl StepPolicy {
    /// Measured height clamped into bounds, or the default step.
    pub fn distance(&self, hint: Option<f64>) -> f64 {
        let low = self.min_step_px.min(self.max_step_px);
        let high = self.min_step_px.max(self.max_step_px);
        match hint {
            Some(height) if height.is_finite() && height > 0.0 => height.clamp(low, high),
            _ => self.scroll_step_px,
        }
    }
}

pub struct ViewportAdvancer {
    host: Arc<dyn HostPage>,
    policy: StepPolicy,
    pacer: Arc<Pacer>,
}

impl ViewportAdvancer {
    pub fn new(host: Arc<dyn HostPage>, policy: StepPolicy, pacer: Arc<Pacer>) -> Self {
        Self {
            host,
            policy,
            pacer,
        }
    }

    /// Smooth-scrolls one page and waits the scroll settle delay.
    /// Returns the distance scrolled.
    pub async fn advance_one_page(&self, hint: Option<f64>) -> Result<f64, ActionError> {
        let distance = self.policy.distance(hint);
        debug!(distance, "advancing viewport");
        self.host.scroll_by(distance, ScrollBehavior::Smooth).await?;
        self.pacer.pause(Pause::ScrollSettle).await;
        Ok(distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tempo::Tempo;
    use crate::testing::FakeTimeline;

    #[test]
    fn distance_clamps_measured_height() {
        let policy = StepPolicy::default();
        assert_eq!(policy.distance(None), 500.0);
        assert_eq!(policy.distance(Some(50.0)), 200.0);
        assert_eq!(policy.distance(Some(640.0)), 640.0);
        assert_eq!(policy.distance(Some(5_000.0)), 1_200.0);
        assert_eq!(policy.distance(Some(f64::NAN)), 500.0);
        assert_eq!(policy.distance(Some(0.0)), 500.0);
    }

    #[tokio::test]
    async fn scrolls_smoothly_by_policy_distance() {
        let fake = Arc::new(FakeTimeline::new("https://x.com/alice"));
        let advancer = ViewportAdvancer::new(
            fake.clone(),
            StepPolicy::default(),
            Arc::new(Pacer::new(Tempo::instant())),
        );
        assert_eq!(advancer.advance_one_page(Some(300.0)).await.unwrap(), 300.0);
        assert_eq!(advancer.advance_one_page(None).await.unwrap(), 500.0);
        assert_eq!(
            fake.scrolls(),
            vec![(300.0, ScrollBehavior::Smooth), (500.0, ScrollBehavior::Smooth)]
        );
    }
}
