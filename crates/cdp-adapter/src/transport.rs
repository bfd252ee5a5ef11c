//! Websocket link to Chromium.
//!
//! A single pump task owns the `chromiumoxide` connection: it submits queued commands, routes
//! responses back to their callers and forwards events. Callers talk to it over channels, so
//! the link is shared freely. A dead link is replaced on the next command.

use std::collections::HashMap;
use std::convert::TryInto;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::async_process::Child;
use chromiumoxide::cdp::browser_protocol::target::SessionId as CdpSessionId;
use chromiumoxide::cdp::events::CdpEventMessage;
use chromiumoxide::conn::Connection;
use chromiumoxide::error::CdpError;
use chromiumoxide_types::{CallId, CdpJsonEventMessage, Message, MethodId, Response};
use futures::future::BoxFuture;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::CdpConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::launch::spawn_chromium;

#[derive(Clone, Debug)]
pub struct TransportEvent {
    pub method: String,
    pub params: Value,
    pub session_id: Option<String>,
}

#[derive(Clone, Debug)]
pub enum CommandTarget {
    Browser,
    Session(String),
}

#[async_trait]
pub trait CdpTransport: Send + Sync {
    async fn start(&self) -> Result<(), AdapterError>;
    async fn next_event(&self) -> Option<TransportEvent>;
    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError>;
}

/// Used when no browser is available; every command fails.
#[derive(Default)]
pub struct NoopTransport;

#[async_trait]
impl CdpTransport for NoopTransport {
    async fn start(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        None
    }

    async fn send_command(
        &self,
        _target: CommandTarget,
        method: &str,
        _params: Value,
    ) -> Result<Value, AdapterError> {
        Err(AdapterError::new(AdapterErrorKind::Internal)
            .with_hint(format!("no browser transport for {method}")))
    }
}

type LinkFuture = BoxFuture<'static, Result<Arc<BrowserLink>, AdapterError>>;
type Connector = Arc<dyn Fn(CdpConfig) -> LinkFuture + Send + Sync>;

fn open_link(cfg: CdpConfig) -> LinkFuture {
    Box::pin(async move { BrowserLink::open(cfg).await.map(Arc::new) })
}

pub struct ChromiumTransport {
    cfg: CdpConfig,
    link: Mutex<Option<Arc<BrowserLink>>>,
    connect: Connector,
}

impl ChromiumTransport {
    pub fn new(cfg: CdpConfig) -> Self {
        Self::with_connector(cfg, Arc::new(open_link))
    }

    fn with_connector(cfg: CdpConfig, connect: Connector) -> Self {
        Self {
            cfg,
            link: Mutex::new(None),
            connect,
        }
    }

    fn deadline(&self) -> Duration {
        Duration::from_millis(self.cfg.default_deadline_ms)
    }

    /// Live link, reconnecting when the previous one has died.
    async fn link(&self) -> Result<Arc<BrowserLink>, AdapterError> {
        let mut slot = self.link.lock().await;
        if let Some(link) = slot.as_ref().filter(|link| link.is_alive()) {
            return Ok(link.clone());
        }
        if slot.is_some() {
            warn!(target: "cdp-transport", "browser link lost; reconnecting");
        }
        let link = (self.connect)(self.cfg.clone()).await?;
        *slot = Some(link.clone());
        Ok(link)
    }
}

#[async_trait]
impl CdpTransport for ChromiumTransport {
    async fn start(&self) -> Result<(), AdapterError> {
        let link = self.link().await?;
        link.request(
            CommandTarget::Browser,
            "Target.setDiscoverTargets",
            json!({ "discover": true }),
            self.deadline(),
        )
        .await?;
        debug!(target: "cdp-transport", "target discovery enabled");
        Ok(())
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        match self.link().await {
            Ok(link) => link.next_event().await,
            Err(err) => {
                warn!(target: "cdp-transport", ?err, "browser link unavailable");
                None
            }
        }
    }

    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        self.link()
            .await?
            .request(target, method, params, self.deadline())
            .await
    }
}

type Reply = oneshot::Sender<Result<Value, AdapterError>>;

struct Outbound {
    target: CommandTarget,
    method: String,
    params: Value,
    reply: Reply,
}

/// Queues a command on the pump and waits for its response.
async fn round_trip(
    outbound: &mpsc::Sender<Outbound>,
    target: CommandTarget,
    method: &str,
    params: Value,
    deadline: Duration,
) -> Result<Value, AdapterError> {
    let (reply, response) = oneshot::channel();
    outbound
        .send(Outbound {
            target,
            method: method.to_string(),
            params,
            reply,
        })
        .await
        .map_err(|_| AdapterError::new(AdapterErrorKind::CdpIo).with_hint("browser link closed"))?;

    match tokio::time::timeout(deadline, response).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(AdapterError::new(AdapterErrorKind::CdpIo)
            .with_hint(format!("{method} dropped without a response"))),
        Err(_) => Err(AdapterError::new(AdapterErrorKind::NavTimeout)
            .with_hint(format!("{method} timed out after {}ms", deadline.as_millis()))
            .retriable(true)),
    }
}

struct BrowserLink {
    outbound: mpsc::Sender<Outbound>,
    events: Mutex<mpsc::Receiver<TransportEvent>>,
    pump: JoinHandle<()>,
    heartbeat: Option<JoinHandle<()>>,
    child: Mutex<Option<Child>>,
    alive: Arc<AtomicBool>,
}

impl BrowserLink {
    async fn open(cfg: CdpConfig) -> Result<Self, AdapterError> {
        let (child, endpoint) = match cfg.websocket_url.clone() {
            Some(url) => (None, url),
            None => {
                let (child, url) = spawn_chromium(&cfg).await?;
                (Some(child), url)
            }
        };

        let conn = Connection::<CdpEventMessage>::connect(&endpoint)
            .await
            .map_err(|err| AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string()))?;
        info!(target: "cdp-transport", %endpoint, attached = child.is_none(), "browser link open");

        let (outbound, queue) = mpsc::channel(128);
        let (events_tx, events) = mpsc::channel(512);
        let alive = Arc::new(AtomicBool::new(true));

        let pump = {
            let alive = alive.clone();
            let pump = Pump {
                conn,
                pending: HashMap::new(),
                events: events_tx,
            };
            tokio::spawn(async move {
                if let Err(err) = pump.run(queue).await {
                    error!(target: "cdp-transport", ?err, "browser link failed");
                }
                alive.store(false, Ordering::Relaxed);
            })
        };

        let heartbeat = spawn_heartbeat(
            outbound.clone(),
            alive.clone(),
            Duration::from_millis(cfg.heartbeat_interval_ms),
            Duration::from_millis(cfg.default_deadline_ms),
        );

        Ok(Self {
            outbound,
            events: Mutex::new(events),
            pump,
            heartbeat,
            child: Mutex::new(child),
            alive,
        })
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    async fn request(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
        deadline: Duration,
    ) -> Result<Value, AdapterError> {
        round_trip(&self.outbound, target, method, params, deadline).await
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        self.events.lock().await.recv().await
    }

    #[cfg(test)]
    fn detached() -> (Self, Arc<AtomicBool>) {
        let (outbound, _queue) = mpsc::channel(1);
        let (_events_tx, events) = mpsc::channel(1);
        let alive = Arc::new(AtomicBool::new(true));
        let link = Self {
            outbound,
            events: Mutex::new(events),
            pump: tokio::spawn(futures::future::pending()),
            heartbeat: None,
            child: Mutex::new(None),
            alive: alive.clone(),
        };
        (link, alive)
    }
}

impl Drop for BrowserLink {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Relaxed);
        self.pump.abort();
        if let Some(heartbeat) = &self.heartbeat {
            heartbeat.abort();
        }
        let Some(mut child) = self.child.get_mut().take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = child.kill().await {
                        warn!(target: "cdp-transport", ?err, "failed to stop chromium");
                    }
                });
            }
            Err(_) => debug!(target: "cdp-transport", "no runtime left to stop chromium"),
        }
    }
}

/// Pings the browser so a silently dropped socket is noticed between commands.
fn spawn_heartbeat(
    outbound: mpsc::Sender<Outbound>,
    alive: Arc<AtomicBool>,
    every: Duration,
    deadline: Duration,
) -> Option<JoinHandle<()>> {
    if every.is_zero() {
        return None;
    }
    let deadline = deadline.min(Duration::from_secs(5));

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if !alive.load(Ordering::Relaxed) {
                break;
            }
            let ping = round_trip(
                &outbound,
                CommandTarget::Browser,
                "Browser.getVersion",
                json!({}),
                deadline,
            )
            .await;
            if let Err(err) = ping {
                warn!(target: "cdp-transport", ?err, "heartbeat failed");
                break;
            }
        }
    }))
}

struct Pump {
    conn: Connection<CdpEventMessage>,
    pending: HashMap<CallId, Reply>,
    events: mpsc::Sender<TransportEvent>,
}

impl Pump {
    async fn run(mut self, mut queue: mpsc::Receiver<Outbound>) -> Result<(), AdapterError> {
        loop {
            tokio::select! {
                Some(command) = queue.recv() => self.submit(command)?,
                message = self.conn.next() => match message {
                    Some(Ok(Message::Response(response))) => self.settle(response),
                    Some(Ok(Message::Event(event))) => self.forward(event).await,
                    Some(Err(err)) => {
                        let err = adapter_error_from_cdp(err);
                        self.fail_pending(&err);
                        return Err(err);
                    }
                    None => {
                        self.fail_pending(
                            &AdapterError::new(AdapterErrorKind::CdpIo)
                                .with_hint("browser closed the connection"),
                        );
                        return Ok(());
                    }
                },
            }
        }
    }

    fn submit(&mut self, command: Outbound) -> Result<(), AdapterError> {
        let session = match command.target {
            CommandTarget::Browser => None,
            CommandTarget::Session(id) => Some(CdpSessionId::from(id)),
        };
        let method: MethodId = command.method.into();
        match self.conn.submit_command(method, session, command.params) {
            Ok(call) => {
                self.pending.insert(call, command.reply);
                Ok(())
            }
            Err(err) => {
                let err = AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string());
                let _ = command.reply.send(Err(err.clone()));
                Err(err)
            }
        }
    }

    fn settle(&mut self, response: Response) {
        if let Some(reply) = self.pending.remove(&response.id) {
            let _ = reply.send(response_payload(response));
        }
    }

    async fn forward(&mut self, event: CdpEventMessage) {
        let raw: CdpJsonEventMessage = match event.try_into() {
            Ok(raw) => raw,
            Err(err) => {
                warn!(target: "cdp-transport", ?err, "undecodable cdp event");
                return;
            }
        };
        let event = TransportEvent {
            method: raw.method.into_owned(),
            params: raw.params,
            session_id: raw.session_id,
        };
        if self.events.send(event).await.is_err() {
            debug!(target: "cdp-transport", "event receiver dropped");
        }
    }

    fn fail_pending(&mut self, err: &AdapterError) {
        for (_, reply) in self.pending.drain() {
            let _ = reply.send(Err(err.clone()));
        }
    }
}

fn response_payload(response: Response) -> Result<Value, AdapterError> {
    match (response.result, response.error) {
        (Some(result), _) => Ok(result),
        (None, Some(error)) => Err(AdapterError::new(AdapterErrorKind::CdpIo)
            .with_hint(format!("cdp error {}: {}", error.code, error.message))
            .retriable(error.code >= 500)),
        (None, None) => {
            Err(AdapterError::new(AdapterErrorKind::Internal).with_hint("empty cdp response"))
        }
    }
}

fn adapter_error_from_cdp(err: CdpError) -> AdapterError {
    let hint = err.to_string();
    let (kind, retriable) = match err {
        CdpError::Timeout => (AdapterErrorKind::NavTimeout, true),
        CdpError::JavascriptException(_) => (AdapterErrorKind::ScriptException, false),
        CdpError::FrameNotFound(_) | CdpError::Serde(_) => (AdapterErrorKind::Internal, false),
        _ => (AdapterErrorKind::CdpIo, true),
    };
    AdapterError::new(kind).with_hint(hint).retriable(retriable)
}
