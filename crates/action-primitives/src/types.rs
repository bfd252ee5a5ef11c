//! Core data types shared by the timeline primitives

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Opaque identity of a node rendered in the host page.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lower-cased account handle owning the timeline.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    /// Normalizes a raw handle: trims, drops a leading `@`, lower-cases.
    /// Returns `None` when nothing usable is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_start_matches('@').trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A rendered content unit authored by the run's owner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub handle: ElementHandle,
    pub owner: OwnerId,
    pub height_px: Option<f64>,
}

/// Raw content unit as reported by the host, before owner filtering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub handle: ElementHandle,
    pub author_href: Option<String>,
    pub height_px: Option<f64>,
}

/// UI controls the driver needs to find.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlKind {
    MenuTrigger,
    DeleteAffordance,
    ConfirmAffordance,
}

/// A clickable control discovered on the page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub handle: ElementHandle,
    pub label: String,
    pub visible: bool,
}

/// One step of a structural walk: the node itself plus the facts the walk needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub handle: ElementHandle,
    pub tag: String,
    pub marker: Option<String>,
    pub is_root: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollBehavior {
    #[default]
    Smooth,
    Instant,
}

impl ScrollBehavior {
    pub fn as_css(&self) -> &'static str {
        match self {
            ScrollBehavior::Smooth => "smooth",
            ScrollBehavior::Instant => "auto",
        }
    }
}

/// Handles retired during a run; never handed out by the view query again.
#[derive(Clone, Debug, Default)]
pub struct RetiredLedger {
    retired: HashSet<ElementHandle>,
}

impl RetiredLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the handle was not yet retired.
    pub fn insert(&mut self, handle: ElementHandle) -> bool {
        self.retired.insert(handle)
    }

    pub fn contains(&self, handle: &ElementHandle) -> bool {
        self.retired.contains(handle)
    }

    pub fn len(&self) -> usize {
        self.retired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retired.is_empty()
    }
}
