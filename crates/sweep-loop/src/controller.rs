//! Sweep controller: the scan / process / advance cycle.

use action_flow::{DeleteExecutor, DeleteOutcome, UiActionDriver};
use action_primitives::{
    detect_owner, CandidateItem, DeleteIntent, HostPage, ItemRemover, OwnerId, Pacer, Pause,
    StepPolicy, TimelineView, ViewportAdvancer,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::SweepConfig;
use crate::errors::SweepError;
use crate::metrics;
use crate::state::{LoopPhase, RunState, TerminationReason};

const PROGRESS_EVERY_ATTEMPTS: u32 = 10;
const MILESTONE_EVERY_DELETIONS: u32 = 5;

/// Result of a sweep run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSummary {
    pub owner: String,
    pub deleted: u32,
    pub attempts: u32,
    pub reason: TerminationReason,
    /// Owner items still visible at the end, `None` when the final query failed.
    pub remaining: Option<usize>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl SweepSummary {
    /// Whether the run ended with owner items still on screen (or unknown).
    pub fn has_remaining(&self) -> bool {
        self.remaining != Some(0)
    }
}

/// Owns the wiring of one sweep run.
pub struct SweepController {
    config: SweepConfig,
    host: Arc<dyn HostPage>,
    view: TimelineView,
    driver: Arc<dyn DeleteExecutor>,
    advancer: ViewportAdvancer,
    remover: ItemRemover,
    pacer: Arc<Pacer>,
    cancel: CancellationToken,
}

impl SweepController {
    /// Create a controller from already built parts.
    pub fn new(
        config: SweepConfig,
        view: TimelineView,
        driver: Arc<dyn DeleteExecutor>,
        advancer: ViewportAdvancer,
        remover: ItemRemover,
        pacer: Arc<Pacer>,
    ) -> Self {
        Self {
            config,
            host: view.host().clone(),
            view,
            driver,
            advancer,
            remover,
            pacer,
            cancel: CancellationToken::new(),
        }
    }

    /// Wire the default UI driver, advancer and remover around `host`.
    pub fn for_host(
        config: SweepConfig,
        host: Arc<dyn HostPage>,
        intent: DeleteIntent,
        steps: StepPolicy,
        container_marker: &str,
        pacer: Arc<Pacer>,
    ) -> Self {
        let view = TimelineView::new(host.clone(), intent);
        let driver = Arc::new(UiActionDriver::new(view.clone(), pacer.clone()));
        let advancer = ViewportAdvancer::new(host.clone(), steps, pacer.clone());
        let remover = ItemRemover::new(host, container_marker);
        Self::new(config, view, driver, advancer, remover, pacer)
    }

    /// Builder: stop the run when `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Owner of the timeline the page currently shows.
    pub async fn detect_owner(&self) -> Result<OwnerId, SweepError> {
        let location = self.host.location().await?;
        detect_owner(&location).ok_or_else(|| SweepError::owner_undetectable(location))
    }

    /// Runs until a budget is exhausted or the run is cancelled.
    ///
    /// Fails only when the owner cannot be determined once the page has settled.
    pub async fn run(&self) -> Result<SweepSummary, SweepError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        if self.config.startup_delay_ms > 0 {
            debug!(delay_ms = self.config.startup_delay_ms, "waiting for page to settle");
            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_millis(self.config.startup_delay_ms)) => {}
            }
        }

        let owner = self.detect_owner().await?;
        info!(owner = %owner, "sweeping timeline");
        let mut state = RunState::new(owner);

        let reason = loop {
            if self.cancel.is_cancelled() {
                break TerminationReason::Cancelled;
            }
            if let Some(reason) = state.exhausted_budget(&self.config) {
                break reason;
            }

            state.attempts += 1;
            state.enter(LoopPhase::Scanning);
            metrics::record_iteration();
            let settled = (state.deleted, state.no_progress);
            if let Err(err) = self.iterate(&mut state).await {
                metrics::record_iteration_failure();
                // An iteration that already counted itself is not counted twice.
                if (state.deleted, state.no_progress) == settled {
                    state.record_idle();
                }
                warn!(
                    attempt = state.attempts,
                    no_progress = state.no_progress,
                    retryable = err.is_retryable(),
                    %err,
                    "iteration failed; backing off"
                );
                self.pacer
                    .pause_or_cancel(Pause::ErrorBackoff, &self.cancel)
                    .await;
            }
        };
        state.enter(LoopPhase::Terminated(reason));

        let remaining = match self.view.list_candidates(&state.owner, &state.retired).await {
            Ok(candidates) => Some(candidates.len()),
            Err(err) => {
                warn!(%err, "final candidate count unavailable");
                None
            }
        };

        let summary = SweepSummary {
            owner: state.owner.to_string(),
            deleted: state.deleted,
            attempts: state.attempts,
            reason,
            remaining,
            started_at,
            elapsed_ms: clock.elapsed().as_millis() as u64,
        };
        info!(
            deleted = summary.deleted,
            attempts = summary.attempts,
            reason = %summary.reason,
            remaining = ?summary.remaining,
            "sweep finished"
        );
        Ok(summary)
    }

    async fn iterate(&self, state: &mut RunState) -> Result<(), SweepError> {
        self.ensure_owner(&state.owner).await?;

        let candidates = self
            .view
            .list_candidates(&state.owner, &state.retired)
            .await?;
        if state.attempts % PROGRESS_EVERY_ATTEMPTS == 0 {
            info!(
                attempt = state.attempts,
                visible = candidates.len(),
                deleted = state.deleted,
                "sweep progress"
            );
        }

        let Some(item) = candidates.into_iter().next() else {
            state.record_idle();
            trace!(no_progress = state.no_progress, "no candidates in view");
            return self.advance(state, None).await;
        };

        state.enter(LoopPhase::Processing);
        self.process(state, &item).await;
        self.advance(state, item.height_px).await
    }

    async fn ensure_owner(&self, owner: &OwnerId) -> Result<(), SweepError> {
        let location = self.host.location().await?;
        match detect_owner(&location) {
            Some(current) if &current == owner => Ok(()),
            _ => Err(SweepError::OwnerDrift {
                expected: owner.to_string(),
                location,
            }),
        }
    }

    async fn process(&self, state: &mut RunState, item: &CandidateItem) {
        let outcome = self.driver.attempt_delete(item).await;
        metrics::record_outcome(outcome.as_str());

        match &outcome {
            DeleteOutcome::Deleted => {
                state.record_deleted();
                info!(handle = %item.handle, deleted = state.deleted, "item deleted");
                if state.deleted % MILESTONE_EVERY_DELETIONS == 0 {
                    info!(deleted = state.deleted, "deletion milestone reached");
                }
                self.pacer.pause_or_cancel(Pause::PostDelete, &self.cancel).await;
                self.remover.retire(item, &mut state.retired).await;
            }
            DeleteOutcome::SkippedNoMenu
            | DeleteOutcome::SkippedNoDeleteOption
            | DeleteOutcome::SkippedNoConfirm => {
                debug!(handle = %item.handle, outcome = outcome.as_str(), "item skipped");
                self.pacer.pause_or_cancel(Pause::PostSkip, &self.cancel).await;
                self.remover.retire(item, &mut state.retired).await;
                state.record_idle();
            }
            DeleteOutcome::Errored(reason) => {
                debug!(handle = %item.handle, %reason, "item errored; retiring");
                self.pacer.pause_or_cancel(Pause::PostSkip, &self.cancel).await;
                self.remover.retire(item, &mut state.retired).await;
            }
        }

        if self.config.declutter {
            match self.host.declutter().await {
                Ok(hidden) => trace!(hidden, "declutter pass"),
                Err(err) => debug!(%err, "declutter failed"),
            }
        }
    }

    async fn advance(&self, state: &mut RunState, hint: Option<f64>) -> Result<(), SweepError> {
        state.enter(LoopPhase::Advancing);
        self.advancer.advance_one_page(hint).await?;
        self.pacer.pause_or_cancel(Pause::Jitter, &self.cancel).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::testing::{FakeTimeline, FakeUnit, CONTAINER_MARKER};
    use action_primitives::Tempo;

    fn controller(fake: &Arc<FakeTimeline>, config: SweepConfig) -> SweepController {
        SweepController::for_host(
            config,
            fake.clone(),
            DeleteIntent::with_defaults().unwrap(),
            StepPolicy::default(),
            CONTAINER_MARKER,
            Arc::new(Pacer::new(Tempo::instant())),
        )
    }

    #[tokio::test]
    async fn zero_attempt_budget_never_scans() {
        let fake = Arc::new(FakeTimeline::new("https://x.com/alice"));
        fake.push(FakeUnit::by("alice"));
        let summary = controller(&fake, SweepConfig::minimal().attempts(0))
            .run()
            .await
            .unwrap();
        assert_eq!(summary.attempts, 0);
        assert_eq!(summary.reason, TerminationReason::AttemptBudgetExhausted);
        assert_eq!(summary.remaining, Some(1));
        assert!(fake.activations().is_empty());
    }

    #[tokio::test]
    async fn declutters_after_each_processed_item() {
        let fake = Arc::new(FakeTimeline::new("https://x.com/alice"));
        fake.push(FakeUnit::by("alice"));
        fake.push(FakeUnit::by("alice"));
        controller(&fake, SweepConfig::minimal().declutter(true))
            .run()
            .await
            .unwrap();
        assert_eq!(fake.declutters(), 2);
    }

    #[tokio::test]
    async fn advance_uses_processed_item_height() {
        let fake = Arc::new(FakeTimeline::new("https://x.com/alice"));
        fake.push(FakeUnit::by("alice").height(640.0));
        controller(&fake, SweepConfig::minimal().no_progress(1))
            .run()
            .await
            .unwrap();
        let scrolls: Vec<f64> = fake.scrolls().iter().map(|(d, _)| *d).collect();
        assert_eq!(scrolls, vec![640.0, 500.0]);
    }
}
