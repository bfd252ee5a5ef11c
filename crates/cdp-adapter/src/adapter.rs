use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio::{select, spawn};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::commands::{Anchor, PageTarget};
use crate::config::CdpConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::events::RawEvent;
use crate::ids::{BrowserId, PageId};
use crate::launch::resolve_executable;
use crate::metrics;
use crate::registry::Registry;
use crate::transport::{CdpTransport, ChromiumTransport, CommandTarget, NoopTransport, TransportEvent};
use crate::AdapterMode;

pub type EventBus = broadcast::Sender<RawEvent>;

/// Page-level command surface consumed by the host layer.
#[async_trait]
pub trait Cdp: Send + Sync {
    async fn navigate(
        &self,
        page: PageId,
        url: &str,
        deadline: Duration,
    ) -> Result<(), AdapterError>;
    async fn evaluate_script(&self, page: PageId, expression: &str)
        -> Result<Value, AdapterError>;
    async fn click_at(&self, page: PageId, anchor: Anchor) -> Result<(), AdapterError>;
}

pub struct CdpAdapter {
    pub browser_id: BrowserId,
    pub cfg: CdpConfig,
    pub bus: EventBus,
    pub registry: Arc<Registry>,
    mode: AdapterMode,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    transport: Arc<dyn CdpTransport>,
}

impl CdpAdapter {
    pub fn new(mut cfg: CdpConfig, bus: EventBus) -> Self {
        if cfg.websocket_url.is_some() {
            info!(target: "cdp-adapter", "attaching to existing browser over websocket");
            let transport = Arc::new(ChromiumTransport::new(cfg.clone()));
            return Self::build(cfg, bus, transport, AdapterMode::Real);
        }

        match resolve_executable(&cfg) {
            Some(path) => {
                info!(target: "cdp-adapter", chrome = %path.display(), "using real Chromium transport");
                cfg.executable = path;
                let transport = Arc::new(ChromiumTransport::new(cfg.clone()));
                Self::build(cfg, bus, transport, AdapterMode::Real)
            }
            None => {
                warn!(
                    target: "cdp-adapter",
                    event = "cdp_adapter.stub_mode",
                    mode = %AdapterMode::Stub.as_str(),
                    remediation = "Install Chrome/Chromium and set SWEEPER_CHROME=/path/to/chrome or pass --chrome-path/--ws-url",
                    "CDP adapter initialized without a real browser; page commands will fail"
                );
                Self::build(cfg, bus, Arc::new(NoopTransport), AdapterMode::Stub)
            }
        }
    }

    pub fn with_transport(
        cfg: CdpConfig,
        bus: EventBus,
        transport: Arc<dyn CdpTransport>,
    ) -> Self {
        Self::build(cfg, bus, transport, AdapterMode::Real)
    }

    fn build(
        cfg: CdpConfig,
        bus: EventBus,
        transport: Arc<dyn CdpTransport>,
        mode: AdapterMode,
    ) -> Self {
        Self {
            browser_id: BrowserId::new(),
            cfg,
            bus,
            registry: Arc::new(Registry::new()),
            mode,
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
            transport,
        }
    }

    pub fn mode(&self) -> AdapterMode {
        self.mode
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RawEvent> {
        self.bus.subscribe()
    }

    pub async fn start(self: Arc<Self>) -> Result<(), AdapterError> {
        {
            let guard = self.tasks.lock().await;
            if !guard.is_empty() {
                return Ok(());
            }
        }

        self.transport.start().await?;
        let loop_task = spawn(Self::event_loop(Arc::clone(&self)));
        self.tasks.lock().await.push(loop_task);
        info!(target: "cdp-adapter", mode = self.mode.as_str(), "event loop started");
        Ok(())
    }

    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let mut handles = self.tasks.lock().await;
        while let Some(handle) = handles.pop() {
            let _ = handle.await;
        }
    }

    /// Lists the page targets currently open in the browser.
    pub async fn list_page_targets(&self) -> Result<Vec<PageTarget>, AdapterError> {
        let response = self.send_command("Target.getTargets", json!({})).await?;
        let infos = response
            .get("targetInfos")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        let targets: Vec<PageTarget> = serde_json::from_value(infos).map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string())
        })?;
        Ok(targets.into_iter().filter(PageTarget::is_page).collect())
    }

    /// Attaches a flat session to `target` and registers it as a page.
    pub async fn attach_target(&self, target: &PageTarget) -> Result<PageId, AdapterError> {
        if let Some(page) = self.registry.page_for_target(&target.target_id) {
            return Ok(page);
        }

        let response = self
            .send_command(
                "Target.attachToTarget",
                json!({ "targetId": target.target_id, "flatten": true }),
            )
            .await?;
        let session = response
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint("attachToTarget missing sessionId")
            })?
            .to_string();

        let page = PageId::new();
        let url = (!target.url.is_empty()).then(|| target.url.clone());
        self.registry
            .insert_page(page, target.target_id.clone(), session, url.clone());
        self.send_page_command(page, "Page.enable", json!({})).await?;

        debug!(target: "cdp-adapter", target_id = %target.target_id, ?page, "attached to page target");
        let _ = self.bus.send(RawEvent::PageAttached {
            page,
            url,
            ts: timestamp_now(),
        });
        Ok(page)
    }

    pub async fn create_page(&self, url: &str) -> Result<PageId, AdapterError> {
        let response = self
            .send_command("Target.createTarget", json!({ "url": url }))
            .await?;
        let target_id = response
            .get("targetId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint("createTarget missing targetId")
            })?
            .to_string();

        let page = self
            .attach_target(&PageTarget {
                target_id,
                kind: "page".into(),
                url: url.to_string(),
                title: String::new(),
                attached: false,
            })
            .await?;
        let deadline = Instant::now() + Duration::from_millis(self.cfg.default_deadline_ms);
        self.wait_for_dom_ready(page, deadline).await?;
        Ok(page)
    }

    /// Reuses an open tab on the same host as `url`, or opens a new one there.
    pub async fn adopt_or_create(&self, url: &str) -> Result<PageId, AdapterError> {
        let wanted = Url::parse(url).map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("invalid url '{url}': {err}"))
        })?;

        let targets = self.list_page_targets().await?;
        if let Some(existing) = targets.iter().find(|target| same_site(&wanted, &target.url)) {
            info!(target: "cdp-adapter", url = %existing.url, "adopting open tab");
            return self.attach_target(existing).await;
        }

        info!(target: "cdp-adapter", %url, "no matching tab open; creating one");
        self.create_page(url).await
    }

    pub fn page_url(&self, page: PageId) -> Option<String> {
        self.registry.get(&page).and_then(|ctx| ctx.recent_url)
    }

    async fn event_loop(self: Arc<Self>) {
        debug!(target: "cdp-adapter", "event loop entered");
        const MIN_BACKOFF: Duration = Duration::from_millis(100);
        const MAX_BACKOFF: Duration = Duration::from_secs(5);
        let mut backoff = MIN_BACKOFF;

        loop {
            select! {
                _ = self.shutdown.cancelled() => break,
                event = self.transport.next_event() => {
                    match event {
                        Some(ev) => {
                            backoff = MIN_BACKOFF;
                            self.handle_event(ev).await;
                        }
                        None => {
                            if self.shutdown.is_cancelled() {
                                break;
                            }
                            self.handle_transport_disconnect();
                            if let Err(err) = self.transport.start().await {
                                warn!(target: "cdp-adapter", ?err, "transport restart failed");
                            }
                            sleep(backoff).await;
                            backoff = (backoff + MIN_BACKOFF).min(MAX_BACKOFF);
                        }
                    }
                }
            }
        }
        debug!(target: "cdp-adapter", "event loop exiting");
    }

    fn handle_transport_disconnect(&self) {
        let pages = self.registry.pages();
        for page in &pages {
            self.registry.remove_page(page);
            let _ = self.bus.send(RawEvent::PageClosed {
                page: *page,
                ts: timestamp_now(),
            });
        }
        if !pages.is_empty() {
            let _ = self.bus.send(RawEvent::Error {
                page: None,
                message: "cdp transport restarted; attached pages were dropped".to_string(),
            });
        }
    }

    async fn handle_event(&self, event: TransportEvent) {
        if let Err(err) = self.process_event(event) {
            let _ = self.bus.send(RawEvent::Error {
                page: None,
                message: format!("cdp event handling error: {err}"),
            });
        }
    }

    fn process_event(&self, event: TransportEvent) -> Result<(), AdapterError> {
        metrics::record_event();
        match event.method.as_str() {
            "Target.targetDestroyed" => {
                let payload: TargetDestroyedParams = decode(event.params)?;
                if let Some(page) = self.registry.page_for_target(&payload.target_id) {
                    self.registry.remove_page(&page);
                    let _ = self.bus.send(RawEvent::PageClosed {
                        page,
                        ts: timestamp_now(),
                    });
                }
            }
            "Target.detachedFromTarget" => {
                let payload: DetachedFromTargetParams = decode(event.params)?;
                if let Some(page) = self.registry.page_for_session(&payload.session_id) {
                    self.registry.remove_page(&page);
                    let _ = self.bus.send(RawEvent::PageClosed {
                        page,
                        ts: timestamp_now(),
                    });
                }
            }
            "Target.targetInfoChanged" => {
                let payload: TargetInfoChangedParams = decode(event.params)?;
                let info = payload.target_info;
                if let Some(page) = self.registry.page_for_target(&info.target_id) {
                    let known = self.registry.get(&page).and_then(|ctx| ctx.recent_url);
                    if !info.url.is_empty() && known.as_deref() != Some(info.url.as_str()) {
                        self.registry.set_recent_url(&page, info.url.clone());
                        let _ = self.bus.send(RawEvent::PageNavigated {
                            page,
                            url: info.url,
                            ts: timestamp_now(),
                        });
                    }
                }
            }
            "Runtime.exceptionThrown" => {
                let payload: ExceptionThrownParams = decode(event.params)?;
                let message = payload
                    .exception_details
                    .exception
                    .and_then(|ex| ex.description)
                    .or(payload.exception_details.text)
                    .unwrap_or_else(|| "runtime exception".to_string());
                let page = event
                    .session_id
                    .as_deref()
                    .and_then(|sid| self.registry.page_for_session(sid));
                let _ = self.bus.send(RawEvent::Error { page, message });
            }
            _ => {
                debug!(target: "cdp-adapter", method = %event.method, "unhandled cdp event");
            }
        }
        Ok(())
    }

    async fn wait_for_dom_ready(&self, page: PageId, deadline: Instant) -> Result<(), AdapterError> {
        loop {
            if Instant::now() >= deadline {
                return Err(AdapterError::new(AdapterErrorKind::NavTimeout)
                    .with_hint("document never reached interactive state"));
            }

            let response = self
                .send_page_command(
                    page,
                    "Runtime.evaluate",
                    json!({
                        "expression": "document.readyState",
                        "returnByValue": true,
                    }),
                )
                .await?;

            let ready = response
                .get("result")
                .and_then(|v| v.get("value"))
                .and_then(Value::as_str)
                .map(|state| matches!(state, "interactive" | "complete"))
                .unwrap_or(false);

            if ready {
                return Ok(());
            }

            sleep(Duration::from_millis(100)).await;
        }
    }

    async fn send_command(&self, method: &str, params: Value) -> Result<Value, AdapterError> {
        self.dispatch(CommandTarget::Browser, method, params).await
    }

    async fn send_page_command(
        &self,
        page: PageId,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        let ctx = self.registry.get(&page).ok_or_else(|| {
            AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("page {page:?} is not attached"))
        })?;
        self.dispatch(CommandTarget::Session(ctx.cdp_session), method, params)
            .await
    }

    async fn dispatch(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        let start = Instant::now();
        let result = self.transport.send_command(target, method, params).await;
        metrics::record_command(method, start.elapsed(), result.is_ok());
        result
    }
}

#[async_trait]
impl Cdp for CdpAdapter {
    async fn navigate(
        &self,
        page: PageId,
        url: &str,
        deadline: Duration,
    ) -> Result<(), AdapterError> {
        self.send_page_command(page, "Page.navigate", json!({ "url": url }))
            .await?;
        self.registry.set_recent_url(&page, url.to_string());
        let start = Instant::now();
        let deadline_at = start
            .checked_add(deadline)
            .unwrap_or_else(|| start + Duration::from_secs(30));
        self.wait_for_dom_ready(page, deadline_at).await
    }

    async fn evaluate_script(
        &self,
        page: PageId,
        expression: &str,
    ) -> Result<Value, AdapterError> {
        let response = self
            .send_page_command(
                page,
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "awaitPromise": true,
                    "returnByValue": true,
                    "userGesture": true,
                }),
            )
            .await?;

        if let Some(details) = response.get("exceptionDetails") {
            return Err(AdapterError::new(AdapterErrorKind::ScriptException)
                .with_hint("evaluate_script raised exception")
                .with_data(details.clone()));
        }

        Ok(response
            .get("result")
            .and_then(|res| res.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn click_at(&self, page: PageId, anchor: Anchor) -> Result<(), AdapterError> {
        for kind in ["mouseMoved", "mousePressed", "mouseReleased"] {
            let moving = kind == "mouseMoved";
            let payload = json!({
                "type": kind,
                "x": anchor.x,
                "y": anchor.y,
                "button": if moving { "none" } else { "left" },
                "buttons": if kind == "mousePressed" { 1 } else { 0 },
                "clickCount": if moving { 0 } else { 1 },
                "pointerType": "mouse",
            });
            self.send_page_command(page, "Input.dispatchMouseEvent", payload)
                .await?;
        }
        Ok(())
    }
}

fn same_site(wanted: &Url, candidate: &str) -> bool {
    let Ok(candidate) = Url::parse(candidate) else {
        return false;
    };
    match (wanted.host_str(), candidate.host_str()) {
        (Some(a), Some(b)) => strip_www(a).eq_ignore_ascii_case(strip_www(b)),
        _ => false,
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

fn decode<T: for<'de> Deserialize<'de>>(params: Value) -> Result<T, AdapterError> {
    serde_json::from_value(params)
        .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetDestroyedParams {
    target_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetachedFromTargetParams {
    session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetInfoChangedParams {
    target_info: PageTarget,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExceptionThrownParams {
    exception_details: ExceptionDetails,
}

#[derive(Debug, Deserialize)]
struct ExceptionDetails {
    text: Option<String>,
    exception: Option<ExceptionObject>,
}

#[derive(Debug, Deserialize)]
struct ExceptionObject {
    description: Option<String>,
}

fn timestamp_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    struct MockTransport {
        started: AtomicBool,
        rx: Mutex<mpsc::Receiver<TransportEvent>>,
        commands: Mutex<Vec<(String, Value)>>,
        responses: Mutex<VecDeque<Value>>,
    }

    impl MockTransport {
        fn new_pair() -> (Arc<Self>, mpsc::Sender<TransportEvent>) {
            let (tx, rx) = mpsc::channel(16);
            (
                Arc::new(Self {
                    started: AtomicBool::new(false),
                    rx: Mutex::new(rx),
                    commands: Mutex::new(Vec::new()),
                    responses: Mutex::new(VecDeque::new()),
                }),
                tx,
            )
        }

        async fn commands(&self) -> Vec<(String, Value)> {
            self.commands.lock().await.clone()
        }

        async fn push_response(&self, value: Value) {
            self.responses.lock().await.push_back(value);
        }
    }

    #[async_trait]
    impl CdpTransport for MockTransport {
        async fn start(&self) -> Result<(), AdapterError> {
            self.started.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn next_event(&self) -> Option<TransportEvent> {
            let mut guard = self.rx.lock().await;
            guard.recv().await
        }

        async fn send_command(
            &self,
            _target: CommandTarget,
            method: &str,
            params: Value,
        ) -> Result<Value, AdapterError> {
            self.commands
                .lock()
                .await
                .push((method.to_string(), params));
            Ok(self
                .responses
                .lock()
                .await
                .pop_front()
                .unwrap_or(Value::Null))
        }
    }

    async fn started_adapter() -> (
        Arc<CdpAdapter>,
        Arc<MockTransport>,
        mpsc::Sender<TransportEvent>,
        broadcast::Receiver<RawEvent>,
    ) {
        let (bus, rx) = crate::event_bus(16);
        let (transport, tx) = MockTransport::new_pair();
        let adapter = Arc::new(CdpAdapter::with_transport(
            CdpConfig::default(),
            bus,
            transport.clone() as Arc<dyn CdpTransport>,
        ));
        Arc::clone(&adapter).start().await.expect("start adapter");
        assert!(transport.started.load(Ordering::SeqCst));
        (adapter, transport, tx, rx)
    }

    fn page_target(id: &str, url: &str) -> Value {
        json!({ "targetId": id, "type": "page", "url": url, "title": "", "attached": false })
    }

    #[tokio::test]
    async fn ignores_unknown_events() {
        let (adapter, _transport, tx, mut rx) = started_adapter().await;

        tx.send(TransportEvent {
            method: "Test.Event".into(),
            params: Value::Null,
            session_id: None,
        })
        .await
        .unwrap();

        let result = timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(result.is_err(), "unexpected raw event broadcast: {result:?}");

        adapter.shutdown().await;
    }

    #[tokio::test]
    async fn adopts_tab_on_same_host() {
        let (adapter, transport, _tx, mut rx) = started_adapter().await;

        transport
            .push_response(json!({
                "targetInfos": [
                    page_target("T-blank", "about:blank"),
                    { "targetId": "W1", "type": "service_worker", "url": "https://x.com/sw.js" },
                    page_target("T-x", "https://www.x.com/someone/with_replies"),
                ]
            }))
            .await;
        transport.push_response(json!({ "sessionId": "S-x" })).await;

        let page = adapter
            .adopt_or_create("https://x.com/someone")
            .await
            .expect("adopt existing tab");

        let ctx = adapter.registry.get(&page).expect("page registered");
        assert_eq!(ctx.target_id, "T-x");
        assert_eq!(ctx.cdp_session, "S-x");

        let methods: Vec<String> = transport
            .commands()
            .await
            .into_iter()
            .map(|(method, _)| method)
            .collect();
        assert_eq!(
            methods,
            vec!["Target.getTargets", "Target.attachToTarget", "Page.enable"]
        );

        match rx.recv().await.expect("attach event") {
            RawEvent::PageAttached { page: seen, .. } => assert_eq!(seen, page),
            other => panic!("unexpected event {other:?}"),
        }

        adapter.shutdown().await;
    }

    #[tokio::test]
    async fn creates_tab_when_none_matches() {
        let (adapter, transport, _tx, _rx) = started_adapter().await;

        transport
            .push_response(json!({ "targetInfos": [page_target("T-blank", "about:blank")] }))
            .await;
        transport.push_response(json!({ "targetId": "T-new" })).await;
        transport.push_response(json!({ "sessionId": "S-new" })).await;
        transport.push_response(Value::Null).await;
        transport
            .push_response(json!({ "result": { "value": "complete" } }))
            .await;

        let page = adapter
            .adopt_or_create("https://x.com/someone")
            .await
            .expect("create tab");
        assert_eq!(
            adapter.page_url(page).as_deref(),
            Some("https://x.com/someone")
        );

        let commands = transport.commands().await;
        assert!(commands
            .iter()
            .any(|(method, params)| method == "Target.createTarget"
                && params["url"] == "https://x.com/someone"));

        adapter.shutdown().await;
    }

    #[tokio::test]
    async fn evaluate_surfaces_script_exceptions() {
        let (adapter, transport, _tx, _rx) = started_adapter().await;
        let page = PageId::new();
        adapter
            .registry
            .insert_page(page, "T1".into(), "S1".into(), None);

        transport
            .push_response(json!({ "result": { "value": { "status": "ok" } } }))
            .await;
        let value = adapter
            .evaluate_script(page, "({status: 'ok'})")
            .await
            .expect("evaluate");
        assert_eq!(value["status"], "ok");

        transport
            .push_response(json!({
                "result": { "type": "object" },
                "exceptionDetails": { "text": "Uncaught" }
            }))
            .await;
        let err = adapter
            .evaluate_script(page, "throw new Error('boom')")
            .await
            .expect_err("exception must surface");
        assert_eq!(err.kind, AdapterErrorKind::ScriptException);

        adapter.shutdown().await;
    }

    #[tokio::test]
    async fn click_dispatches_move_press_release() {
        let (adapter, transport, _tx, _rx) = started_adapter().await;
        let page = PageId::new();
        adapter
            .registry
            .insert_page(page, "T1".into(), "S1".into(), None);

        adapter
            .click_at(page, Anchor { x: 10.0, y: 20.0 })
            .await
            .expect("click");

        let kinds: Vec<String> = transport
            .commands()
            .await
            .into_iter()
            .filter(|(method, _)| method == "Input.dispatchMouseEvent")
            .map(|(_, params)| params["type"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(kinds, vec!["mouseMoved", "mousePressed", "mouseReleased"]);

        adapter.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_page_is_target_not_found() {
        let (adapter, _transport, _tx, _rx) = started_adapter().await;
        let err = adapter
            .evaluate_script(PageId::new(), "1")
            .await
            .expect_err("unattached page");
        assert_eq!(err.kind, AdapterErrorKind::TargetNotFound);
        adapter.shutdown().await;
    }

    #[tokio::test]
    async fn target_destroyed_unregisters_page() {
        let (adapter, _transport, tx, mut rx) = started_adapter().await;
        let page = PageId::new();
        adapter
            .registry
            .insert_page(page, "T1".into(), "S1".into(), None);

        tx.send(TransportEvent {
            method: "Target.targetDestroyed".into(),
            params: json!({ "targetId": "T1" }),
            session_id: None,
        })
        .await
        .unwrap();

        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("closed event")
            .expect("bus open");
        assert!(matches!(event, RawEvent::PageClosed { page: closed, .. } if closed == page));
        assert!(adapter.registry.get(&page).is_none());

        adapter.shutdown().await;
    }
}
