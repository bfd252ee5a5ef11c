//! The host page contract the timeline primitives are written against.

use async_trait::async_trait;

use crate::errors::ActionError;
use crate::types::{Control, ContentUnit, ElementHandle, NodeInfo, ScrollBehavior};

/// Semantic view of the timeline page.
///
/// Implementations resolve site-specific selectors; callers only deal with handles and labels.
/// Every method is a single round-trip to the page and may fail with an [`ActionError`].
#[async_trait]
pub trait HostPage: Send + Sync {
    /// Current navigation URL.
    async fn location(&self) -> Result<String, ActionError>;

    /// Rendered content units in document order.
    async fn content_units(&self) -> Result<Vec<ContentUnit>, ActionError>;

    /// The per-unit "more options" trigger, if the unit renders one.
    async fn menu_trigger(&self, unit: &ElementHandle) -> Result<Option<Control>, ActionError>;

    /// Items of the currently open menu, in display order.
    async fn open_menu_items(&self) -> Result<Vec<Control>, ActionError>;

    /// The confirmation control identified by its stable identifier.
    async fn confirm_control(&self) -> Result<Option<Control>, ActionError>;

    /// Every button-like control currently rendered.
    async fn clickable_controls(&self) -> Result<Vec<Control>, ActionError>;

    async fn activate(&self, handle: &ElementHandle) -> Result<(), ActionError>;

    /// Closes open menus and dialogs.
    async fn dismiss_overlays(&self) -> Result<(), ActionError>;

    async fn scroll_by(&self, delta_px: f64, behavior: ScrollBehavior) -> Result<(), ActionError>;

    /// Structural facts about a node, `None` once it left the document.
    async fn node_info(&self, handle: &ElementHandle) -> Result<Option<NodeInfo>, ActionError>;

    /// The parent node, `None` at the top of the tree.
    async fn parent_of(&self, handle: &ElementHandle) -> Result<Option<NodeInfo>, ActionError>;

    /// Removes the node from the document.
    async fn detach(&self, handle: &ElementHandle) -> Result<(), ActionError>;

    /// Keeps the node but stops rendering it.
    async fn hide(&self, handle: &ElementHandle) -> Result<(), ActionError>;

    /// Hides site chrome unrelated to the timeline. Returns how many nodes were hidden.
    async fn declutter(&self) -> Result<usize, ActionError>;
}
