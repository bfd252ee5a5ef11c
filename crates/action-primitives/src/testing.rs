//! In-memory [`HostPage`] used by the test suites of this workspace.
//!
//! The fake keeps a tiny node tree (`html > body > timeline > cell > wrappers > unit`), a
//! per-unit menu and a confirmation sheet, and records every interaction so tests can assert
//! on what the driver and the loop actually did.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::errors::ActionError;
use crate::host::HostPage;
use crate::types::{ContentUnit, Control, ElementHandle, NodeInfo, ScrollBehavior};

pub const CONTAINER_MARKER: &str = "cellInnerDiv";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuStyle {
    Visible,
    Hidden,
    Absent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmStyle {
    /// Confirm button carrying the stable identifier.
    Stable,
    /// Only a plain button with this label.
    Labelled(String),
    Missing,
}

/// Builder for one rendered content unit.
#[derive(Clone, Debug)]
pub struct FakeUnit {
    author_href: Option<String>,
    height_px: Option<f64>,
    menu: MenuStyle,
    menu_labels: Vec<String>,
    confirm: ConfirmStyle,
    depth: usize,
    container: bool,
    revealed_after: usize,
    fail_activation: bool,
}

impl FakeUnit {
    pub fn by(author: &str) -> Self {
        Self {
            author_href: Some(format!("/{author}")),
            height_px: None,
            menu: MenuStyle::Visible,
            menu_labels: vec!["Pin to your profile".into(), "Delete".into()],
            confirm: ConfirmStyle::Stable,
            depth: 2,
            container: true,
            revealed_after: 0,
            fail_activation: false,
        }
    }

    /// A unit without an author link.
    pub fn anonymous() -> Self {
        Self {
            author_href: None,
            ..Self::by("nobody")
        }
    }

    pub fn href(mut self, href: &str) -> Self {
        self.author_href = Some(href.to_string());
        self
    }

    pub fn height(mut self, px: f64) -> Self {
        self.height_px = Some(px);
        self
    }

    pub fn without_menu(mut self) -> Self {
        self.menu = MenuStyle::Absent;
        self
    }

    pub fn hidden_menu(mut self) -> Self {
        self.menu = MenuStyle::Hidden;
        self
    }

    pub fn menu(mut self, labels: &[&str]) -> Self {
        self.menu_labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn confirm(mut self, style: ConfirmStyle) -> Self {
        self.confirm = style;
        self
    }

    /// Number of wrapper nodes between the container and the unit.
    pub fn nested(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn without_container(mut self) -> Self {
        self.container = false;
        self
    }

    /// Only rendered once the viewport was scrolled `scrolls` times.
    pub fn revealed_after(mut self, scrolls: usize) -> Self {
        self.revealed_after = scrolls;
        self
    }

    /// Every click on this unit's controls fails.
    pub fn failing_activation(mut self) -> Self {
        self.fail_activation = true;
        self
    }
}

#[derive(Clone, Debug)]
struct Node {
    tag: String,
    marker: Option<String>,
    parent: Option<String>,
    root: bool,
    detached: bool,
    hidden: bool,
}

#[derive(Clone, Debug)]
struct UnitState {
    handle: ElementHandle,
    spec: FakeUnit,
}

#[derive(Default)]
struct State {
    location: String,
    nodes: HashMap<String, Node>,
    units: Vec<UnitState>,
    scrolls: Vec<(f64, ScrollBehavior)>,
    open_menu: Option<usize>,
    confirm_open: Option<usize>,
    extra_clickables: Vec<Control>,
    deleted: Vec<ElementHandle>,
    activations: Vec<ElementHandle>,
    dismissals: usize,
    declutters: usize,
    fail_detach: bool,
    fail_hide: bool,
    failing_queries: usize,
    fail_location: bool,
}

impl State {
    fn node(&mut self, id: &str, tag: &str, marker: Option<&str>, parent: Option<&str>) {
        self.nodes.insert(
            id.to_string(),
            Node {
                tag: tag.to_string(),
                marker: marker.map(str::to_string),
                parent: parent.map(str::to_string),
                root: matches!(tag, "HTML" | "BODY"),
                detached: false,
                hidden: false,
            },
        );
    }

    fn rendered(&self, id: &str) -> bool {
        let mut cursor = Some(id.to_string());
        let mut seen = false;
        while let Some(current) = cursor {
            let Some(node) = self.nodes.get(&current) else {
                return false;
            };
            if node.detached || node.hidden {
                return false;
            }
            seen = true;
            cursor = node.parent.clone();
        }
        seen
    }

    fn in_document(&self, id: &str) -> bool {
        let mut cursor = Some(id.to_string());
        while let Some(current) = cursor {
            match self.nodes.get(&current) {
                Some(node) if !node.detached => cursor = node.parent.clone(),
                _ => return false,
            }
        }
        true
    }

    fn info(&self, id: &str) -> Option<NodeInfo> {
        if !self.in_document(id) {
            return None;
        }
        self.nodes.get(id).map(|node| NodeInfo {
            handle: ElementHandle::new(id),
            tag: node.tag.clone(),
            marker: node.marker.clone(),
            is_root: node.root,
        })
    }

    fn unit_index(&self, handle: &str) -> Option<usize> {
        self.units.iter().position(|u| u.handle.as_str() == handle)
    }
}

/// Scriptable in-memory timeline page.
pub struct FakeTimeline {
    state: Mutex<State>,
}

impl FakeTimeline {
    pub fn new(location: &str) -> Self {
        let mut state = State {
            location: location.to_string(),
            ..State::default()
        };
        state.node("html", "HTML", None, None);
        state.node("body", "BODY", None, Some("html"));
        state.node("timeline", "SECTION", None, Some("body"));
        Self {
            state: Mutex::new(state),
        }
    }

    /// Appends a unit at the end of the document and returns its handle.
    pub fn push(&self, unit: FakeUnit) -> ElementHandle {
        let mut state = self.state.lock();
        let index = state.units.len();
        let mut parent = "timeline".to_string();
        if unit.container {
            let cell = format!("cell-{index}");
            state.node(&cell, "DIV", Some(CONTAINER_MARKER), Some(&parent));
            parent = cell;
        }
        for depth in 0..unit.depth {
            let wrapper = format!("wrap-{index}-{depth}");
            state.node(&wrapper, "DIV", None, Some(&parent));
            parent = wrapper;
        }
        let handle = ElementHandle::new(format!("unit-{index}"));
        state.node(handle.as_str(), "ARTICLE", Some("tweet"), Some(&parent));
        state.units.push(UnitState {
            handle: handle.clone(),
            spec: unit,
        });
        handle
    }

    pub fn add_clickable(&self, label: &str, visible: bool) -> ElementHandle {
        let mut state = self.state.lock();
        let handle = ElementHandle::new(format!("extra-{}", state.extra_clickables.len()));
        state.extra_clickables.push(Control {
            handle: handle.clone(),
            label: label.to_string(),
            visible,
        });
        handle
    }

    pub fn set_location(&self, location: &str) {
        self.state.lock().location = location.to_string();
    }

    pub fn fail_detach(&self, fail: bool) {
        self.state.lock().fail_detach = fail;
    }

    pub fn fail_hide(&self, fail: bool) {
        self.state.lock().fail_hide = fail;
    }

    /// The next `count` calls to `content_units` fail.
    pub fn fail_next_queries(&self, count: usize) {
        self.state.lock().failing_queries = count;
    }

    pub fn fail_location(&self, fail: bool) {
        self.state.lock().fail_location = fail;
    }

    pub fn is_rendered(&self, handle: &ElementHandle) -> bool {
        self.state.lock().rendered(handle.as_str())
    }

    /// Units whose deletion was confirmed, in order.
    pub fn deleted(&self) -> Vec<ElementHandle> {
        self.state.lock().deleted.clone()
    }

    pub fn activations(&self) -> Vec<ElementHandle> {
        self.state.lock().activations.clone()
    }

    pub fn scrolls(&self) -> Vec<(f64, ScrollBehavior)> {
        self.state.lock().scrolls.clone()
    }

    pub fn dismissals(&self) -> usize {
        self.state.lock().dismissals
    }

    pub fn declutters(&self) -> usize {
        self.state.lock().declutters
    }

    pub fn menu_open(&self) -> bool {
        self.state.lock().open_menu.is_some()
    }
}

fn host_failure(what: &str) -> ActionError {
    ActionError::CdpIo(format!("fake host refused {what}"))
}

#[async_trait]
impl HostPage for FakeTimeline {
    async fn location(&self) -> Result<String, ActionError> {
        let state = self.state.lock();
        if state.fail_location {
            return Err(host_failure("location"));
        }
        Ok(state.location.clone())
    }

    async fn content_units(&self) -> Result<Vec<ContentUnit>, ActionError> {
        let mut state = self.state.lock();
        if state.failing_queries > 0 {
            state.failing_queries -= 1;
            return Err(host_failure("content query"));
        }
        let scrolled = state.scrolls.len();
        Ok(state
            .units
            .iter()
            .filter(|unit| unit.spec.revealed_after <= scrolled)
            .filter(|unit| state.rendered(unit.handle.as_str()))
            .map(|unit| ContentUnit {
                handle: unit.handle.clone(),
                author_href: unit.spec.author_href.clone(),
                height_px: unit.spec.height_px,
            })
            .collect())
    }

    async fn menu_trigger(&self, unit: &ElementHandle) -> Result<Option<Control>, ActionError> {
        let state = self.state.lock();
        let index = state
            .unit_index(unit.as_str())
            .ok_or_else(|| ActionError::HandleNotFound(unit.to_string()))?;
        let visible = match state.units[index].spec.menu {
            MenuStyle::Absent => return Ok(None),
            MenuStyle::Visible => true,
            MenuStyle::Hidden => false,
        };
        Ok(Some(Control {
            handle: ElementHandle::new(format!("{unit}/caret")),
            label: "More".into(),
            visible,
        }))
    }

    async fn open_menu_items(&self) -> Result<Vec<Control>, ActionError> {
        let state = self.state.lock();
        let Some(index) = state.open_menu else {
            return Ok(Vec::new());
        };
        let unit = &state.units[index];
        Ok(unit
            .spec
            .menu_labels
            .iter()
            .enumerate()
            .map(|(i, label)| Control {
                handle: ElementHandle::new(format!("{}/menu/{i}", unit.handle)),
                label: label.clone(),
                visible: true,
            })
            .collect())
    }

    async fn confirm_control(&self) -> Result<Option<Control>, ActionError> {
        let state = self.state.lock();
        Ok(state.confirm_open.and_then(|index| {
            let unit = &state.units[index];
            (unit.spec.confirm == ConfirmStyle::Stable).then(|| Control {
                handle: ElementHandle::new(format!("{}/confirm", unit.handle)),
                label: "Delete".into(),
                visible: true,
            })
        }))
    }

    async fn clickable_controls(&self) -> Result<Vec<Control>, ActionError> {
        let state = self.state.lock();
        let mut controls = state.extra_clickables.clone();
        if let Some(index) = state.confirm_open {
            let unit = &state.units[index];
            controls.push(Control {
                handle: ElementHandle::new(format!("{}/cancel", unit.handle)),
                label: "Cancel".into(),
                visible: true,
            });
            if let ConfirmStyle::Labelled(label) = &unit.spec.confirm {
                controls.push(Control {
                    handle: ElementHandle::new(format!("{}/confirm-fallback", unit.handle)),
                    label: label.clone(),
                    visible: true,
                });
            }
        }
        Ok(controls)
    }

    async fn activate(&self, handle: &ElementHandle) -> Result<(), ActionError> {
        let mut state = self.state.lock();
        state.activations.push(handle.clone());

        if handle.as_str().starts_with("extra-") {
            return Ok(());
        }

        let (unit, control) = handle
            .as_str()
            .split_once('/')
            .ok_or_else(|| ActionError::HandleNotFound(handle.to_string()))?;
        let index = state
            .unit_index(unit)
            .ok_or_else(|| ActionError::HandleNotFound(handle.to_string()))?;
        if state.units[index].spec.fail_activation {
            return Err(host_failure("click"));
        }

        match control {
            "caret" => {
                state.open_menu = Some(index);
                state.confirm_open = None;
            }
            c if c.starts_with("menu/") && state.open_menu == Some(index) => {
                state.open_menu = None;
                if state.units[index].spec.confirm != ConfirmStyle::Missing {
                    state.confirm_open = Some(index);
                }
            }
            "confirm" | "confirm-fallback" if state.confirm_open == Some(index) => {
                state.confirm_open = None;
                let handle = state.units[index].handle.clone();
                // The site drops the post from the document once the delete is confirmed.
                if let Some(node) = state.nodes.get_mut(handle.as_str()) {
                    node.detached = true;
                }
                state.deleted.push(handle);
            }
            "cancel" => state.confirm_open = None,
            _ => return Err(ActionError::HandleNotFound(handle.to_string())),
        }
        Ok(())
    }

    async fn dismiss_overlays(&self) -> Result<(), ActionError> {
        let mut state = self.state.lock();
        state.open_menu = None;
        state.confirm_open = None;
        state.dismissals += 1;
        Ok(())
    }

    async fn scroll_by(&self, delta_px: f64, behavior: ScrollBehavior) -> Result<(), ActionError> {
        self.state.lock().scrolls.push((delta_px, behavior));
        Ok(())
    }

    async fn node_info(&self, handle: &ElementHandle) -> Result<Option<NodeInfo>, ActionError> {
        Ok(self.state.lock().info(handle.as_str()))
    }

    async fn parent_of(&self, handle: &ElementHandle) -> Result<Option<NodeInfo>, ActionError> {
        let state = self.state.lock();
        let parent = state
            .nodes
            .get(handle.as_str())
            .ok_or_else(|| ActionError::HandleNotFound(handle.to_string()))?
            .parent
            .clone();
        Ok(parent.and_then(|id| state.info(&id)))
    }

    async fn detach(&self, handle: &ElementHandle) -> Result<(), ActionError> {
        let mut state = self.state.lock();
        if state.fail_detach {
            return Err(host_failure("detach"));
        }
        if !state.in_document(handle.as_str()) {
            return Err(ActionError::HandleNotFound(handle.to_string()));
        }
        if let Some(node) = state.nodes.get_mut(handle.as_str()) {
            node.detached = true;
        }
        Ok(())
    }

    async fn hide(&self, handle: &ElementHandle) -> Result<(), ActionError> {
        let mut state = self.state.lock();
        if state.fail_hide {
            return Err(host_failure("hide"));
        }
        if !state.in_document(handle.as_str()) {
            return Err(ActionError::HandleNotFound(handle.to_string()));
        }
        match state.nodes.get_mut(handle.as_str()) {
            Some(node) => {
                node.hidden = true;
                Ok(())
            }
            None => Err(ActionError::HandleNotFound(handle.to_string())),
        }
    }

    async fn declutter(&self) -> Result<usize, ActionError> {
        self.state.lock().declutters += 1;
        Ok(1)
    }
}
