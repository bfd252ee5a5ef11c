//! Item remover: take a processed item out of the view so it is never picked again.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::ActionError;
use crate::host::HostPage;
use crate::types::{CandidateItem, ElementHandle, NodeInfo, RetiredLedger};

/// Hop bound for the container walk.
pub const DEFAULT_MAX_HOPS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetireStrategy {
    DetachContainer,
    DetachItem,
    HideInPlace,
}

impl RetireStrategy {
    pub const ORDER: [RetireStrategy; 3] = [
        RetireStrategy::DetachContainer,
        RetireStrategy::DetachItem,
        RetireStrategy::HideInPlace,
    ];
}

/// What happened to one retired item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RetireReport {
    /// The strategy that took effect, `None` when all of them failed or none was needed.
    pub applied: Option<RetireStrategy>,
    pub failures: Vec<(RetireStrategy, String)>,
    /// The node had already left the document (the site removed it after the delete).
    pub vanished: bool,
}

/// Walks up from the parent of `start` looking for a node accepted by `predicate`.
///
/// Examines at most `max_hops` ancestors and never returns or passes the document root.
pub async fn nearest_container<F>(
    host: &dyn HostPage,
    start: &ElementHandle,
    predicate: F,
    max_hops: usize,
) -> Result<Option<NodeInfo>, ActionError>
where
    F: Fn(&NodeInfo) -> bool + Send + Sync,
{
    let mut current = host.parent_of(start).await?;
    for _ in 0..max_hops {
        let Some(node) = current else {
            return Ok(None);
        };
        if node.is_root {
            return Ok(None);
        }
        if predicate(&node) {
            return Ok(Some(node));
        }
        current = host.parent_of(&node.handle).await?;
    }
    Ok(None)
}

pub struct ItemRemover {
    host: Arc<dyn HostPage>,
    container_marker: String,
    max_hops: usize,
}

impl ItemRemover {
    pub fn new(host: Arc<dyn HostPage>, container_marker: impl Into<String>) -> Self {
        Self {
            host,
            container_marker: container_marker.into(),
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    /// Removes `item` from the view, trying each strategy in order.
    ///
    /// Never fails: strategy errors are logged and the item lands in `ledger` regardless.
    pub async fn retire(&self, item: &CandidateItem, ledger: &mut RetiredLedger) -> RetireReport {
        let mut report = RetireReport::default();
        ledger.insert(item.handle.clone());

        match self.host.node_info(&item.handle).await {
            Ok(None) => {
                debug!(handle = %item.handle, "item already left the document");
                report.vanished = true;
                return report;
            }
            Ok(Some(_)) => {}
            Err(err) => debug!(handle = %item.handle, %err, "node probe failed; retiring anyway"),
        }

        for strategy in RetireStrategy::ORDER {
            match self.apply(strategy, &item.handle).await {
                Ok(()) => {
                    debug!(handle = %item.handle, ?strategy, "item retired");
                    report.applied = Some(strategy);
                    break;
                }
                Err(reason) => {
                    debug!(handle = %item.handle, ?strategy, %reason, "retire strategy failed");
                    report.failures.push((strategy, reason));
                }
            }
        }
        if report.applied.is_none() {
            warn!(handle = %item.handle, "every retire strategy failed; item only tracked");
        }
        report
    }

    async fn apply(&self, strategy: RetireStrategy, handle: &ElementHandle) -> Result<(), String> {
        match strategy {
            RetireStrategy::DetachContainer => {
                let marker = self.container_marker.as_str();
                let container = nearest_container(
                    self.host.as_ref(),
                    handle,
                    |node| node.marker.as_deref() == Some(marker),
                    self.max_hops,
                )
                .await
                .map_err(|err| err.to_string())?
                .ok_or_else(|| "no enclosing container".to_string())?;
                self.host
                    .detach(&container.handle)
                    .await
                    .map_err(|err| err.to_string())
            }
            RetireStrategy::DetachItem => {
                self.host.detach(handle).await.map_err(|err| err.to_string())
            }
            RetireStrategy::HideInPlace => {
                self.host.hide(handle).await.map_err(|err| err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTimeline, FakeUnit};
    use crate::types::OwnerId;

    fn candidate(handle: &ElementHandle) -> CandidateItem {
        CandidateItem {
            handle: handle.clone(),
            owner: OwnerId::parse("alice").unwrap(),
            height_px: None,
        }
    }

    #[tokio::test]
    async fn detaches_enclosing_container_first() {
        let fake = Arc::new(FakeTimeline::new("https://x.com/alice"));
        let handle = fake.push(FakeUnit::by("alice").nested(3));
        let remover = ItemRemover::new(fake.clone(), "cellInnerDiv");
        let mut ledger = RetiredLedger::new();

        let report = remover.retire(&candidate(&handle), &mut ledger).await;
        assert_eq!(report.applied, Some(RetireStrategy::DetachContainer));
        assert!(report.failures.is_empty());
        assert!(ledger.contains(&handle));
        assert!(!fake.is_rendered(&handle));
    }

    #[tokio::test]
    async fn container_walk_respects_hop_bound() {
        let fake = Arc::new(FakeTimeline::new("https://x.com/alice"));
        let handle = fake.push(FakeUnit::by("alice").nested(12));
        let remover = ItemRemover::new(fake.clone(), "cellInnerDiv");
        let mut ledger = RetiredLedger::new();

        let report = remover.retire(&candidate(&handle), &mut ledger).await;
        assert_eq!(report.applied, Some(RetireStrategy::DetachItem));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, RetireStrategy::DetachContainer);
    }

    #[tokio::test]
    async fn container_walk_checks_ten_ancestors() {
        let fake = Arc::new(FakeTimeline::new("https://x.com/alice"));
        let reachable = fake.push(FakeUnit::by("alice").nested(9));
        let too_deep = fake.push(FakeUnit::by("alice").nested(10));
        let is_cell = |node: &NodeInfo| node.marker.as_deref() == Some("cellInnerDiv");

        let found = nearest_container(fake.as_ref(), &reachable, is_cell, DEFAULT_MAX_HOPS)
            .await
            .unwrap();
        assert_eq!(found.map(|node| node.handle), Some(ElementHandle::new("cell-0")));

        let missed = nearest_container(fake.as_ref(), &too_deep, is_cell, DEFAULT_MAX_HOPS)
            .await
            .unwrap();
        assert!(missed.is_none());
    }

    #[tokio::test]
    async fn item_removed_by_the_site_counts_as_retired() {
        let fake = Arc::new(FakeTimeline::new("https://x.com/alice"));
        let handle = fake.push(FakeUnit::by("alice"));
        fake.detach(&handle).await.unwrap();
        assert!(matches!(
            fake.hide(&handle).await,
            Err(ActionError::HandleNotFound(_))
        ));
        let remover = ItemRemover::new(fake.clone(), "cellInnerDiv");
        let mut ledger = RetiredLedger::new();

        let report = remover.retire(&candidate(&handle), &mut ledger).await;
        assert!(report.vanished);
        assert_eq!(report.applied, None);
        assert!(report.failures.is_empty());
        assert!(ledger.contains(&handle));
    }

    #[tokio::test]
    async fn container_walk_stops_at_root() {
        let fake = Arc::new(FakeTimeline::new("https://x.com/alice"));
        let handle = fake.push(FakeUnit::by("alice").without_container());
        let found = nearest_container(
            fake.as_ref(),
            &handle,
            |node| node.marker.as_deref() == Some("cellInnerDiv"),
            DEFAULT_MAX_HOPS,
        )
        .await
        .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn falls_through_all_strategies_and_still_records() {
        let fake = Arc::new(FakeTimeline::new("https://x.com/alice"));
        let handle = fake.push(FakeUnit::by("alice"));
        fake.fail_detach(true);
        fake.fail_hide(true);
        let remover = ItemRemover::new(fake.clone(), "cellInnerDiv");
        let mut ledger = RetiredLedger::new();

        let report = remover.retire(&candidate(&handle), &mut ledger).await;
        assert_eq!(report.applied, None);
        let tried: Vec<_> = report.failures.iter().map(|(s, _)| *s).collect();
        assert_eq!(tried, RetireStrategy::ORDER.to_vec());
        assert!(ledger.contains(&handle));
        assert!(fake.is_rendered(&handle));
    }

    #[tokio::test]
    async fn hides_when_detach_is_refused() {
        let fake = Arc::new(FakeTimeline::new("https://x.com/alice"));
        let handle = fake.push(FakeUnit::by("alice"));
        fake.fail_detach(true);
        let remover = ItemRemover::new(fake.clone(), "cellInnerDiv");
        let mut ledger = RetiredLedger::new();

        let report = remover.retire(&candidate(&handle), &mut ledger).await;
        assert_eq!(report.applied, Some(RetireStrategy::HideInPlace));
        assert!(!fake.is_rendered(&handle));
    }
}
