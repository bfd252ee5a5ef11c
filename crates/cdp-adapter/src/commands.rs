//! Command parameter and result types exposed by the adapter.

use serde::{Deserialize, Serialize};

/// Viewport coordinates for synthetic pointer input.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
}

/// Subset of `Target.TargetInfo` the adapter cares about.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageTarget {
    pub target_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub attached: bool,
}

impl PageTarget {
    pub fn is_page(&self) -> bool {
        self.kind == "page"
    }
}
