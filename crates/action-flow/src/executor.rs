//! Delete flow executor

use action_primitives::{CandidateItem, ControlKind, Pacer, Pause, TimelineView};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::DriverError;
use crate::types::{DeleteOutcome, DeleteStep};

/// Delete executor trait
#[async_trait]
pub trait DeleteExecutor: Send + Sync {
    /// Try to delete `item` through the site's UI.
    ///
    /// Infallible by contract: every failure is reported as an outcome.
    async fn attempt_delete(&self, item: &CandidateItem) -> DeleteOutcome;
}

/// Drives the menu / delete / confirm sequence on the live page.
pub struct UiActionDriver {
    view: TimelineView,
    pacer: Arc<Pacer>,
}

impl UiActionDriver {
    /// Create a new driver
    pub fn new(view: TimelineView, pacer: Arc<Pacer>) -> Self {
        Self { view, pacer }
    }

    async fn run_steps(&self, item: &CandidateItem) -> Result<DeleteOutcome, DriverError> {
        let trigger = self
            .view
            .locate_control(item, ControlKind::MenuTrigger)
            .await
            .map_err(DriverError::step(DeleteStep::LocateMenu))?;
        let Some(trigger) = trigger.filter(|control| control.visible) else {
            return Ok(DeleteOutcome::SkippedNoMenu);
        };

        self.view
            .host()
            .activate(&trigger.handle)
            .await
            .map_err(DriverError::step(DeleteStep::OpenMenu))?;
        self.pacer.pause(Pause::MenuSettle).await;

        let delete = self
            .view
            .locate_control(item, ControlKind::DeleteAffordance)
            .await
            .map_err(DriverError::step(DeleteStep::LocateDelete))?;
        let Some(delete) = delete else {
            self.dismiss().await;
            return Ok(DeleteOutcome::SkippedNoDeleteOption);
        };
        debug!(handle = %item.handle, label = %delete.label, "delete item found");

        self.view
            .host()
            .activate(&delete.handle)
            .await
            .map_err(DriverError::step(DeleteStep::ChooseDelete))?;
        self.pacer.pause(Pause::ConfirmSettle).await;

        let confirm = match self
            .view
            .locate_control(item, ControlKind::ConfirmAffordance)
            .await
            .map_err(DriverError::step(DeleteStep::LocateConfirm))?
        {
            Some(control) => Some(control),
            None => {
                let fallback = self
                    .view
                    .scan_confirm_fallback()
                    .await
                    .map_err(DriverError::step(DeleteStep::LocateConfirm))?;
                if let Some(control) = &fallback {
                    debug!(label = %control.label, "confirming through label fallback");
                }
                fallback
            }
        };
        let Some(confirm) = confirm else {
            self.dismiss().await;
            return Ok(DeleteOutcome::SkippedNoConfirm);
        };

        self.view
            .host()
            .activate(&confirm.handle)
            .await
            .map_err(DriverError::step(DeleteStep::Confirm))?;
        Ok(DeleteOutcome::Deleted)
    }

    /// Closes whatever menu or sheet may be open. Failures are only logged.
    async fn dismiss(&self) {
        if let Err(err) = self.view.host().dismiss_overlays().await {
            debug!(%err, "dismissing overlays failed");
        }
        self.pacer.pause(Pause::DismissSettle).await;
    }
}

#[async_trait]
impl DeleteExecutor for UiActionDriver {
    async fn attempt_delete(&self, item: &CandidateItem) -> DeleteOutcome {
        match self.run_steps(item).await {
            Ok(outcome) => {
                debug!(handle = %item.handle, outcome = outcome.as_str(), "delete attempt finished");
                outcome
            }
            Err(err) => {
                warn!(handle = %item.handle, step = %err.failed_step(), %err, "delete attempt failed");
                self.dismiss().await;
                DeleteOutcome::Errored(err.to_string())
            }
        }
    }
}
