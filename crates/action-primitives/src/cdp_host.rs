//! [`HostPage`] backed by a live Chromium page.
//!
//! Every operation is one `Runtime.evaluate` round-trip. Nodes handed out to callers are
//! stamped with a `data-sweeper-handle` attribute; querying the same node again reuses the
//! existing token, so a handle stays valid for as long as the node is in the document.

use async_trait::async_trait;
use cdp_adapter::{Anchor, Cdp, PageId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::errors::ActionError;
use crate::host::HostPage;
use crate::intent::DEFAULT_DELETE_LABELS;
use crate::advance::StepPolicy;
use crate::types::{Control, ContentUnit, ElementHandle, NodeInfo, ScrollBehavior};

const HANDLE_ATTR: &str = "data-sweeper-handle";

/// Site-specific selectors and labels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    pub content_unit: String,
    pub author_link: String,
    pub menu_trigger: String,
    pub menu_item: String,
    pub confirm_button: String,
    pub clickable: String,
    /// `data-testid` of the per-item structural container.
    pub container_marker: String,
    /// Site chrome hidden by the declutter step.
    pub declutter: String,
    pub delete_labels: Vec<String>,
    #[serde(flatten)]
    pub steps: StepPolicy,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            content_unit: r#"article[data-testid="tweet"]"#.into(),
            author_link: r#"[data-testid="User-Name"] a[href*="/"]"#.into(),
            menu_trigger: r#"[data-testid="caret"]"#.into(),
            menu_item: r#"[role="menuitem"]"#.into(),
            confirm_button: r#"[data-testid="confirmationSheetConfirm"]"#.into(),
            clickable: r#"button, div[role="button"]"#.into(),
            container_marker: "cellInnerDiv".into(),
            declutter: r#"[data-testid="sidebarColumn"] > div"#.into(),
            delete_labels: DEFAULT_DELETE_LABELS.iter().map(|s| s.to_string()).collect(),
            steps: StepPolicy::default(),
        }
    }
}

/// Result envelope every page script returns.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    value: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUnit {
    handle: String,
    author_href: Option<String>,
    height: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawControl {
    handle: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    visible: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    handle: String,
    tag: String,
    marker: Option<String>,
    is_root: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPoint {
    x: f64,
    y: f64,
    hit: bool,
}

impl From<RawControl> for Control {
    fn from(raw: RawControl) -> Self {
        Control {
            handle: ElementHandle(raw.handle),
            label: raw.label,
            visible: raw.visible,
        }
    }
}

impl From<RawNode> for NodeInfo {
    fn from(raw: RawNode) -> Self {
        NodeInfo {
            handle: ElementHandle(raw.handle),
            tag: raw.tag,
            marker: raw.marker,
            is_root: raw.is_root,
        }
    }
}

pub struct CdpHostPage {
    adapter: Arc<dyn Cdp>,
    page: PageId,
    profile: SiteProfile,
    prefix: String,
}

impl CdpHostPage {
    pub fn new(adapter: Arc<dyn Cdp>, page: PageId, profile: SiteProfile) -> Self {
        let prefix = format!("sw{}", &Uuid::new_v4().simple().to_string()[..8]);
        Self {
            adapter,
            page,
            profile,
            prefix,
        }
    }

    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    fn literal(value: &str) -> Result<String, ActionError> {
        serde_json::to_string(value)
            .map_err(|err| ActionError::Internal(format!("invalid script literal: {err}")))
    }

    /// Wraps `body` with the shared helpers and runs it in the page.
    async fn run<T: DeserializeOwned>(&self, body: &str) -> Result<Envelope<T>, ActionError> {
        let expression = format!(
            r#"(() => {{
    const ATTR = {attr};
    const PREFIX = {prefix};
    const stamp = (el) => {{
        let token = el.getAttribute(ATTR);
        if (!token) {{
            window.__sweeperSeq = (window.__sweeperSeq || 0) + 1;
            token = PREFIX + '-' + window.__sweeperSeq;
            el.setAttribute(ATTR, token);
        }}
        return token;
    }};
    const find = (token) => document.querySelector('[' + ATTR + '="' + CSS.escape(token) + '"]');
    const visible = (el) => !!el && el.offsetParent !== null;
    const label = (el) => ((el.innerText || el.textContent || el.getAttribute('aria-label') || '') + '').trim();
    const control = (el) => ({{ handle: stamp(el), label: label(el), visible: visible(el) }});
    const isRoot = (el) => el === document.body || el === document.documentElement;
    const node = (el) => ({{ handle: stamp(el), tag: el.tagName, marker: el.getAttribute('data-testid'), isRoot: isRoot(el) }});
    {body}
}})()"#,
            attr = Self::literal(HANDLE_ATTR)?,
            prefix = Self::literal(&self.prefix)?,
            body = body,
        );
        trace!(page = ?self.page, "evaluating host script");
        let value: Value = self.adapter.evaluate_script(self.page, &expression).await?;
        serde_json::from_value(value)
            .map_err(|err| ActionError::Script(format!("unexpected script result: {err}")))
    }

    /// Runs a script that must find `handle` first; `missing` maps to `HandleNotFound`.
    async fn on_handle<T: DeserializeOwned>(
        &self,
        handle: &ElementHandle,
        body: &str,
    ) -> Result<Option<T>, ActionError> {
        let script = format!(
            "const el = find({token});\n    if (!el) {{ return {{ status: 'missing' }}; }}\n    {body}",
            token = Self::literal(handle.as_str())?,
        );
        let envelope = self.run::<T>(&script).await?;
        match envelope.status.as_str() {
            "ok" => Ok(envelope.value),
            "missing" => Err(ActionError::HandleNotFound(handle.to_string())),
            other => Err(ActionError::Script(format!("unexpected status '{other}'"))),
        }
    }

    async fn collect<T: DeserializeOwned>(&self, body: &str) -> Result<Vec<T>, ActionError> {
        let envelope = self.run::<Vec<T>>(body).await?;
        Ok(envelope.value.unwrap_or_default())
    }
}

#[async_trait]
impl HostPage for CdpHostPage {
    async fn location(&self) -> Result<String, ActionError> {
        let envelope = self
            .run::<String>("return { status: 'ok', value: window.location.href };")
            .await?;
        envelope
            .value
            .ok_or_else(|| ActionError::Script("location unavailable".to_string()))
    }

    async fn content_units(&self) -> Result<Vec<ContentUnit>, ActionError> {
        let body = format!(
            r#"const units = Array.from(document.querySelectorAll({unit})).map((el) => {{
        const link = el.querySelector({author});
        return {{
            handle: stamp(el),
            authorHref: link ? link.getAttribute('href') : null,
            height: el.getBoundingClientRect().height,
        }};
    }});
    return {{ status: 'ok', value: units }};"#,
            unit = Self::literal(&self.profile.content_unit)?,
            author = Self::literal(&self.profile.author_link)?,
        );
        let units: Vec<RawUnit> = self.collect(&body).await?;
        Ok(units
            .into_iter()
            .map(|raw| ContentUnit {
                handle: ElementHandle(raw.handle),
                author_href: raw.author_href,
                height_px: raw.height,
            })
            .collect())
    }

    async fn menu_trigger(&self, unit: &ElementHandle) -> Result<Option<Control>, ActionError> {
        let body = format!(
            "const trigger = el.querySelector({sel});\n    return {{ status: 'ok', value: trigger ? control(trigger) : null }};",
            sel = Self::literal(&self.profile.menu_trigger)?,
        );
        Ok(self
            .on_handle::<RawControl>(unit, &body)
            .await?
            .map(Control::from))
    }

    async fn open_menu_items(&self) -> Result<Vec<Control>, ActionError> {
        let body = format!(
            "return {{ status: 'ok', value: Array.from(document.querySelectorAll({sel})).map(control) }};",
            sel = Self::literal(&self.profile.menu_item)?,
        );
        let items: Vec<RawControl> = self.collect(&body).await?;
        Ok(items.into_iter().map(Control::from).collect())
    }

    async fn confirm_control(&self) -> Result<Option<Control>, ActionError> {
        let body = format!(
            "const btn = document.querySelector({sel});\n    return {{ status: 'ok', value: btn ? control(btn) : null }};",
            sel = Self::literal(&self.profile.confirm_button)?,
        );
        let envelope = self.run::<RawControl>(&body).await?;
        Ok(envelope.value.map(Control::from))
    }

    async fn clickable_controls(&self) -> Result<Vec<Control>, ActionError> {
        let body = format!(
            "return {{ status: 'ok', value: Array.from(document.querySelectorAll({sel})).map(control) }};",
            sel = Self::literal(&self.profile.clickable)?,
        );
        let controls: Vec<RawControl> = self.collect(&body).await?;
        Ok(controls.into_iter().map(Control::from).collect())
    }

    async fn activate(&self, handle: &ElementHandle) -> Result<(), ActionError> {
        // Pointer input when the element is the hit target at its centre, DOM click otherwise.
        let point = self
            .on_handle::<RawPoint>(
                handle,
                r#"const rect = el.getBoundingClientRect();
    const x = rect.left + rect.width / 2;
    const y = rect.top + rect.height / 2;
    const inView = rect.width > 0 && rect.height > 0 && y >= 0 && y <= window.innerHeight && x >= 0 && x <= window.innerWidth;
    const top = inView ? document.elementFromPoint(x, y) : null;
    const hit = !!top && (top === el || el.contains(top));
    if (!hit) { el.click(); }
    return { status: 'ok', value: { x, y, hit } };"#,
            )
            .await?
            .ok_or_else(|| ActionError::Script("activate returned no point".to_string()))?;

        if point.hit {
            self.adapter
                .click_at(
                    self.page,
                    Anchor {
                        x: point.x,
                        y: point.y,
                    },
                )
                .await?;
        } else {
            debug!(%handle, "element not hit-testable; used DOM click");
        }
        Ok(())
    }

    async fn dismiss_overlays(&self) -> Result<(), ActionError> {
        self.run::<Value>(
            "document.body.click();\n    document.dispatchEvent(new KeyboardEvent('keydown', { key: 'Escape', bubbles: true }));\n    return { status: 'ok' };",
        )
        .await?;
        Ok(())
    }

    async fn scroll_by(&self, delta_px: f64, behavior: ScrollBehavior) -> Result<(), ActionError> {
        let body = format!(
            "window.scrollBy({{ left: 0, top: {delta}, behavior: '{behavior}' }});\n    return {{ status: 'ok' }};",
            delta = delta_px,
            behavior = behavior.as_css(),
        );
        self.run::<Value>(&body).await?;
        Ok(())
    }

    async fn node_info(&self, handle: &ElementHandle) -> Result<Option<NodeInfo>, ActionError> {
        match self
            .on_handle::<RawNode>(handle, "return { status: 'ok', value: node(el) };")
            .await
        {
            Ok(node) => Ok(node.map(NodeInfo::from)),
            Err(ActionError::HandleNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn parent_of(&self, handle: &ElementHandle) -> Result<Option<NodeInfo>, ActionError> {
        Ok(self
            .on_handle::<RawNode>(
                handle,
                "const parent = el.parentElement;\n    return { status: 'ok', value: parent ? node(parent) : null };",
            )
            .await?
            .map(NodeInfo::from))
    }

    async fn detach(&self, handle: &ElementHandle) -> Result<(), ActionError> {
        self.on_handle::<Value>(handle, "el.remove();\n    return { status: 'ok' };")
            .await?;
        Ok(())
    }

    async fn hide(&self, handle: &ElementHandle) -> Result<(), ActionError> {
        self.on_handle::<Value>(
            handle,
            "el.style.display = 'none';\n    return { status: 'ok' };",
        )
        .await?;
        Ok(())
    }

    async fn declutter(&self) -> Result<usize, ActionError> {
        let body = format!(
            r#"let hidden = 0;
    document.querySelectorAll({sel}).forEach((el) => {{
        if (el.style.display !== 'none') {{ el.style.display = 'none'; hidden += 1; }}
    }});
    return {{ status: 'ok', value: hidden }};"#,
            sel = Self::literal(&self.profile.declutter)?,
        );
        let envelope = self.run::<usize>(&body).await?;
        Ok(envelope.value.unwrap_or(0))
    }
}
