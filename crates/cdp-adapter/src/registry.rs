//! Registry of the page targets the adapter is attached to.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::ids::PageId;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TargetContext {
    pub target_id: String,
    pub cdp_session: String,
    pub recent_url: Option<String>,
}

/// Concurrent map from adapter page ids to their CDP target/session pair.
#[derive(Default)]
pub struct Registry {
    pages: DashMap<PageId, TargetContext>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_page(
        &self,
        page: PageId,
        target_id: String,
        cdp_session: String,
        url: Option<String>,
    ) {
        self.pages.insert(
            page,
            TargetContext {
                target_id,
                cdp_session,
                recent_url: url,
            },
        );
    }

    pub fn remove_page(&self, page: &PageId) -> Option<TargetContext> {
        self.pages.remove(page).map(|(_, ctx)| ctx)
    }

    pub fn get(&self, page: &PageId) -> Option<TargetContext> {
        self.pages.get(page).map(|entry| entry.value().clone())
    }

    pub fn pages(&self) -> Vec<PageId> {
        self.pages.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page_for_target(&self, target_id: &str) -> Option<PageId> {
        self.pages
            .iter()
            .find(|entry| entry.value().target_id == target_id)
            .map(|entry| *entry.key())
    }

    pub fn page_for_session(&self, session: &str) -> Option<PageId> {
        self.pages
            .iter()
            .find(|entry| entry.value().cdp_session == session)
            .map(|entry| *entry.key())
    }

    pub fn set_recent_url(&self, page: &PageId, url: String) {
        if let Some(mut entry) = self.pages.get_mut(page) {
            entry.recent_url = Some(url);
        }
    }
}
