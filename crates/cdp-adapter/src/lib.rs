//! Chromium DevTools Protocol adapter for the timeline sweeper.
//!
//! The adapter owns the connection to a Chromium instance (launched locally or attached through
//! a DevTools websocket), keeps track of the page targets it is attached to, and exposes the
//! small command surface the higher layers need: navigation, script evaluation and synthetic
//! mouse input.

use tokio::sync::broadcast;

pub mod ids {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    /// Unique identifier for the browser instance managed by the adapter.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
    pub struct BrowserId(pub Uuid);

    /// Unique identifier for a page/tab.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
    pub struct PageId(pub Uuid);

    impl BrowserId {
        pub fn new() -> Self {
            Self(Uuid::new_v4())
        }
    }

    impl Default for BrowserId {
        fn default() -> Self {
            Self::new()
        }
    }

    impl PageId {
        pub fn new() -> Self {
            Self(Uuid::new_v4())
        }
    }

    impl Default for PageId {
        fn default() -> Self {
            Self::new()
        }
    }
}

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by the adapter.
    #[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
    pub enum AdapterErrorKind {
        #[error("navigation timed out")]
        NavTimeout,
        #[error("cdp i/o failure")]
        CdpIo,
        #[error("target not found")]
        TargetNotFound,
        #[error("script raised an exception")]
        ScriptException,
        #[error("internal error")]
        Internal,
    }

    /// Enriched error metadata passed back to higher layers.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
        pub retriable: bool,
        pub data: Option<serde_json::Value>,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self {
                kind,
                hint: None,
                retriable: false,
                data: None,
            }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn retriable(mut self, flag: bool) -> Self {
            self.retriable = flag;
            self
        }

        pub fn with_data(mut self, data: serde_json::Value) -> Self {
            self.data = Some(data);
            self
        }
    }
}

pub mod events {
    use super::ids::PageId;
    use serde::{Deserialize, Serialize};

    /// Raw events emitted by the adapter for interested observers.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub enum RawEvent {
        PageAttached {
            page: PageId,
            url: Option<String>,
            ts: u64,
        },
        PageNavigated {
            page: PageId,
            url: String,
            ts: u64,
        },
        PageClosed {
            page: PageId,
            ts: u64,
        },
        Error {
            page: Option<PageId>,
            message: String,
        },
    }
}

pub mod config {
    use serde::{Deserialize, Serialize};
    use std::{
        env,
        path::{Path, PathBuf},
    };

    /// Configuration for launching and tuning the adapter.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(default)]
    pub struct CdpConfig {
        pub executable: PathBuf,
        pub user_data_dir: PathBuf,
        pub headless: bool,
        pub default_deadline_ms: u64,
        pub websocket_url: Option<String>,
        pub heartbeat_interval_ms: u64,
        pub disable_sandbox: bool,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                executable: default_chrome_path(),
                user_data_dir: default_profile_dir(),
                headless: resolve_headless_default(),
                default_deadline_ms: 30_000,
                websocket_url: None,
                heartbeat_interval_ms: 15_000,
                disable_sandbox: resolve_disable_sandbox(),
            }
        }
    }

    /// The timeline needs a signed-in session, so the window is visible unless asked otherwise.
    fn resolve_headless_default() -> bool {
        env_flag("SWEEPER_HEADLESS")
    }

    fn resolve_disable_sandbox() -> bool {
        env_flag("SWEEPER_DISABLE_SANDBOX")
    }

    fn env_flag(name: &str) -> bool {
        env::var(name)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false)
    }

    fn default_chrome_path() -> PathBuf {
        crate::launch::find_chromium().unwrap_or_default()
    }

    fn default_profile_dir() -> PathBuf {
        if let Ok(path) = env::var("SWEEPER_CHROME_PROFILE") {
            return PathBuf::from(path);
        }

        let default = Path::new("./.sweeper-profile");
        default.into()
    }
}

/// Whether the adapter talks to a real browser or to the inert stub transport.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AdapterMode {
    Real,
    Stub,
}

impl AdapterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterMode::Real => "real",
            AdapterMode::Stub => "stub",
        }
    }

    pub fn is_stub(&self) -> bool {
        matches!(self, AdapterMode::Stub)
    }
}

pub mod adapter;
pub mod commands;
pub mod metrics;
pub mod registry;
pub mod transport;
mod launch;

pub use adapter::{Cdp, CdpAdapter, EventBus};
pub use commands::{Anchor, PageTarget};
pub use config::CdpConfig;
pub use error::{AdapterError, AdapterErrorKind};
pub use events::RawEvent;
pub use ids::{BrowserId, PageId};
pub use transport::{CdpTransport, CommandTarget, TransportEvent};

/// Create a broadcast bus for adapter events.
pub fn event_bus(buffer: usize) -> (EventBus, broadcast::Receiver<RawEvent>) {
    let (tx, rx) = broadcast::channel(buffer);
    (tx, rx)
}
