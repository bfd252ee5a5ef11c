//! Chromium process launch: profile directory, command line, DevTools endpoint discovery.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::async_process::Child;
use chromiumoxide::browser::BrowserConfig;
use futures::io::{AsyncBufReadExt, BufReader};
use futures::StreamExt;
use serde_json::json;
use which::which;

use crate::config::CdpConfig;
use crate::error::{AdapterError, AdapterErrorKind};

const LAUNCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Lines of Chromium stderr kept for the error hint when no endpoint shows up.
const STDERR_PREVIEW_LINES: usize = 8;

/// Quiet, first-run-free flags. Sign-in state lives in the profile, so nothing here
/// resets cookies or storage.
const CHROMIUM_FLAGS: &[&str] = &[
    "--disable-background-networking",
    "--disable-background-timer-throttling",
    "--disable-breakpad",
    "--disable-component-update",
    "--disable-default-apps",
    "--disable-dev-shm-usage",
    "--disable-hang-monitor",
    "--disable-popup-blocking",
    "--disable-sync",
    "--no-first-run",
    "--no-default-browser-check",
    "--password-store=basic",
    "--remote-allow-origins=*",
    "--use-mock-keychain",
];

const HEADLESS_FLAGS: &[&str] = &["--headless=new", "--hide-scrollbars", "--mute-audio"];

#[cfg(target_os = "windows")]
const BINARY_NAMES: &[&str] = &["chrome.exe", "chromium.exe", "msedge.exe"];
#[cfg(not(target_os = "windows"))]
const BINARY_NAMES: &[&str] = &[
    "google-chrome-stable",
    "google-chrome",
    "chromium",
    "chromium-browser",
];

#[cfg(target_os = "macos")]
const INSTALL_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];
#[cfg(target_os = "windows")]
const INSTALL_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const INSTALL_PATHS: &[&str] = &[
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium-browser",
    "/usr/bin/chromium",
];

/// Locates a Chromium build: `SWEEPER_CHROME`, then `PATH`, then well-known install
/// locations (skipped when `SWEEPER_SKIP_OS_PATHS` is set).
pub(crate) fn find_chromium() -> Option<PathBuf> {
    let from_env = env::var("SWEEPER_CHROME")
        .ok()
        .map(|raw| PathBuf::from(raw.trim()))
        .filter(|path| !path.as_os_str().is_empty() && path.exists());
    if from_env.is_some() {
        return from_env;
    }

    if let Some(found) = BINARY_NAMES.iter().find_map(|name| which(name).ok()) {
        return Some(found);
    }

    let skip_install_paths = env::var("SWEEPER_SKIP_OS_PATHS")
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);
    if skip_install_paths {
        return None;
    }
    INSTALL_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

/// Configured executable when it exists, otherwise whatever [`find_chromium`] turns up.
pub(crate) fn resolve_executable(cfg: &CdpConfig) -> Option<PathBuf> {
    if !cfg.executable.as_os_str().is_empty() && cfg.executable.exists() {
        return Some(cfg.executable.clone());
    }
    find_chromium()
}

/// Launches Chromium and returns the child together with its browser websocket URL.
pub(crate) async fn spawn_chromium(cfg: &CdpConfig) -> Result<(Child, String), AdapterError> {
    let mut child = browser_config(cfg)?.launch().map_err(|err| {
        AdapterError::new(AdapterErrorKind::Internal)
            .with_hint(format!("failed to launch chromium: {err}"))
    })?;
    let url = devtools_url(&mut child).await?;
    Ok((child, url))
}

fn browser_config(cfg: &CdpConfig) -> Result<BrowserConfig, AdapterError> {
    if !cfg.executable.as_os_str().is_empty() && !cfg.executable.exists() {
        return Err(AdapterError::new(AdapterErrorKind::CdpIo)
            .with_hint(format!(
                "chrome executable not found at {}",
                cfg.executable.display()
            ))
            .with_data(json!({
                "expected": cfg.executable,
                "hint": "Set SWEEPER_CHROME or pass --chrome-path."
            })));
    }

    let mut flags: Vec<&str> = CHROMIUM_FLAGS.to_vec();
    let mut builder = BrowserConfig::builder()
        .request_timeout(Duration::from_millis(cfg.default_deadline_ms))
        .launch_timeout(LAUNCH_TIMEOUT)
        .user_data_dir(ensure_profile_dir(cfg)?);

    if cfg.headless {
        flags.extend_from_slice(HEADLESS_FLAGS);
    } else {
        builder = builder.with_head();
    }
    if cfg.disable_sandbox {
        builder = builder.no_sandbox();
    }
    if !cfg.executable.as_os_str().is_empty() {
        builder = builder.chrome_executable(cfg.executable.clone());
    }

    builder.args(flags).build().map_err(|err| {
        AdapterError::new(AdapterErrorKind::Internal)
            .with_hint(format!("browser config error: {err}"))
    })
}

/// Absolute profile directory, created if missing.
fn ensure_profile_dir(cfg: &CdpConfig) -> Result<PathBuf, AdapterError> {
    let dir = if cfg.user_data_dir.is_absolute() {
        cfg.user_data_dir.clone()
    } else {
        std::env::current_dir()
            .map_err(|err| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint(format!("failed to resolve cwd for profile dir: {err}"))
            })?
            .join(&cfg.user_data_dir)
    };
    fs::create_dir_all(&dir).map_err(|err| {
        AdapterError::new(AdapterErrorKind::Internal)
            .with_hint(format!("failed to create profile dir {}: {err}", dir.display()))
    })?;
    Ok(dir)
}

async fn devtools_url(child: &mut Child) -> Result<String, AdapterError> {
    let stderr = child.stderr.take().ok_or_else(|| {
        AdapterError::new(AdapterErrorKind::Internal)
            .with_hint("chromium process has no stderr handle")
    })?;
    let mut lines = BufReader::new(stderr).lines();
    let mut preview = Vec::with_capacity(STDERR_PREVIEW_LINES);

    let scan = async {
        while let Some(line) = lines.next().await {
            let line = line.map_err(|err| {
                AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string())
            })?;
            if let Some(url) = parse_devtools_line(&line) {
                return Ok(url.to_string());
            }
            if preview.len() < STDERR_PREVIEW_LINES {
                preview.push(line);
            }
        }
        Err(AdapterError::new(AdapterErrorKind::CdpIo).with_hint(format!(
            "chromium exited before announcing its devtools endpoint: {}",
            preview.join(" | ")
        )))
    };

    tokio::time::timeout(LAUNCH_TIMEOUT, scan)
        .await
        .map_err(|_| {
            AdapterError::new(AdapterErrorKind::NavTimeout)
                .with_hint("timed out waiting for the chromium devtools endpoint")
        })?
}

/// Picks the browser endpoint out of `DevTools listening on ws://...`.
fn parse_devtools_line(line: &str) -> Option<&str> {
    let (_, url) = line.rsplit_once("listening on ")?;
    let url = url.trim();
    (url.starts_with("ws") && url.contains("/devtools/browser/")).then_some(url)
}
