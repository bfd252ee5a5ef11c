//! View query: which owner items are rendered, and where their controls are.

use std::sync::Arc;
use tracing::{debug, trace};

use crate::errors::ActionError;
use crate::host::HostPage;
use crate::intent::DeleteIntent;
use crate::owner::owner_from_href;
use crate::types::{CandidateItem, Control, ControlKind, OwnerId, RetiredLedger};

/// Read-only queries over the rendered timeline.
#[derive(Clone)]
pub struct TimelineView {
    host: Arc<dyn HostPage>,
    intent: DeleteIntent,
}

impl TimelineView {
    pub fn new(host: Arc<dyn HostPage>, intent: DeleteIntent) -> Self {
        Self { host, intent }
    }

    pub fn host(&self) -> &Arc<dyn HostPage> {
        &self.host
    }

    /// Units authored by `owner` and not yet retired, in document order.
    ///
    /// Units whose author link is missing or unparseable are skipped.
    pub async fn list_candidates(
        &self,
        owner: &OwnerId,
        ledger: &RetiredLedger,
    ) -> Result<Vec<CandidateItem>, ActionError> {
        let units = self.host.content_units().await?;
        let total = units.len();
        let candidates: Vec<CandidateItem> = units
            .into_iter()
            .filter(|unit| !ledger.contains(&unit.handle))
            .filter_map(|unit| {
                let author = unit.author_href.as_deref().and_then(owner_from_href);
                match author {
                    Some(author) if &author == owner => Some(CandidateItem {
                        handle: unit.handle,
                        owner: author,
                        height_px: unit.height_px,
                    }),
                    Some(_) => None,
                    None => {
                        trace!(handle = %unit.handle, "unit without parseable author");
                        None
                    }
                }
            })
            .collect();
        debug!(rendered = total, candidates = candidates.len(), "view query");
        Ok(candidates)
    }

    /// Finds one control for `item`. Absence is `Ok(None)`.
    pub async fn locate_control(
        &self,
        item: &CandidateItem,
        kind: ControlKind,
    ) -> Result<Option<Control>, ActionError> {
        match kind {
            ControlKind::MenuTrigger => self.host.menu_trigger(&item.handle).await,
            ControlKind::DeleteAffordance => Ok(self
                .host
                .open_menu_items()
                .await?
                .into_iter()
                .find(|control| self.intent.matches(&control.label))),
            ControlKind::ConfirmAffordance => self.host.confirm_control().await,
        }
    }

    /// Visible clickables whose label reads as a delete action.
    pub async fn scan_confirm_fallback(&self) -> Result<Option<Control>, ActionError> {
        Ok(self
            .host
            .clickable_controls()
            .await?
            .into_iter()
            .find(|control| control.visible && self.intent.matches(&control.label)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ConfirmStyle, FakeTimeline, FakeUnit};

    fn view(fake: &Arc<FakeTimeline>) -> TimelineView {
        TimelineView::new(fake.clone(), DeleteIntent::with_defaults().unwrap())
    }

    #[tokio::test]
    async fn lists_only_owner_units_in_order() {
        let fake = Arc::new(FakeTimeline::new("https://x.com/alice"));
        let a1 = fake.push(FakeUnit::by("Alice"));
        fake.push(FakeUnit::by("bob"));
        fake.push(FakeUnit::anonymous());
        let a2 = fake.push(FakeUnit::by("alice").height(320.0));

        let owner = OwnerId::parse("alice").unwrap();
        let found = view(&fake)
            .list_candidates(&owner, &RetiredLedger::new())
            .await
            .unwrap();
        let handles: Vec<_> = found.iter().map(|c| c.handle.clone()).collect();
        assert_eq!(handles, vec![a1, a2]);
        assert_eq!(found[1].height_px, Some(320.0));
        assert!(found.iter().all(|c| c.owner == owner));
    }

    #[tokio::test]
    async fn retired_units_are_never_listed() {
        let fake = Arc::new(FakeTimeline::new("https://x.com/alice"));
        let a1 = fake.push(FakeUnit::by("alice"));
        let a2 = fake.push(FakeUnit::by("alice"));
        let mut ledger = RetiredLedger::new();
        ledger.insert(a1);

        let owner = OwnerId::parse("alice").unwrap();
        let found = view(&fake).list_candidates(&owner, &ledger).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].handle, a2);
    }

    #[tokio::test]
    async fn locates_delete_item_by_label() {
        let fake = Arc::new(FakeTimeline::new("https://x.com/alice"));
        let handle = fake.push(FakeUnit::by("alice").menu(&["Pin", "পোস্ট মুছে ফেলুন"]));
        let view = view(&fake);
        let owner = OwnerId::parse("alice").unwrap();
        let item = view
            .list_candidates(&owner, &RetiredLedger::new())
            .await
            .unwrap()
            .remove(0);
        assert_eq!(item.handle, handle);

        let trigger = view
            .locate_control(&item, ControlKind::MenuTrigger)
            .await
            .unwrap()
            .expect("menu trigger");
        assert!(
            view.locate_control(&item, ControlKind::DeleteAffordance)
                .await
                .unwrap()
                .is_none(),
            "menu is closed before activation"
        );

        fake.activate(&trigger.handle).await.unwrap();
        let delete = view
            .locate_control(&item, ControlKind::DeleteAffordance)
            .await
            .unwrap()
            .expect("delete item");
        assert!(delete.label.contains("মুছে"));
    }

    #[tokio::test]
    async fn confirm_fallback_requires_visible_matching_label() {
        let fake = Arc::new(FakeTimeline::new("https://x.com/alice"));
        fake.push(FakeUnit::by("alice").confirm(ConfirmStyle::Labelled("Delete".into())));
        let view = view(&fake);
        assert!(view.scan_confirm_fallback().await.unwrap().is_none());

        fake.add_clickable("Cancel", true);
        fake.add_clickable("Delete", false);
        assert!(view.scan_confirm_fallback().await.unwrap().is_none());

        fake.add_clickable("Delete", true);
        let found = view.scan_confirm_fallback().await.unwrap().expect("fallback");
        assert_eq!(found.label, "Delete");
        assert!(found.visible);
    }
}
