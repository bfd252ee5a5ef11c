use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use action_primitives::{CdpHostPage, ContentReadyWait, Pacer, WaitStrategy};
use anyhow::{anyhow, bail, Context, Result};
use cdp_adapter::{event_bus, AdapterError, Cdp, CdpAdapter, PageId, RawEvent};
use clap::Args;
use sweep_loop::{SweepController, SweepSummary};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::context::CliContext;
use crate::cli::output::{emit, OutputFormat};
use crate::config::Config;

#[derive(Args, Clone, Debug)]
pub struct SweepArgs {
    /// Profile timeline to sweep, e.g. https://x.com/yourname
    #[arg(long)]
    pub url: String,

    /// Attach to an existing Chrome DevTools websocket instead of launching a new instance
    #[arg(long)]
    pub ws_url: Option<String>,

    /// Override Chrome/Chromium executable path (defaults to SWEEPER_CHROME or system path)
    #[arg(long)]
    pub chrome_path: Option<PathBuf>,

    /// Browser profile directory; reuse one to stay signed in between runs
    #[arg(long)]
    pub profile_dir: Option<PathBuf>,

    /// Run Chrome with a visible window even if the config says headless
    #[arg(long)]
    pub headful: bool,

    /// Maximum scan iterations
    #[arg(long)]
    pub attempt_budget: Option<u32>,

    /// Consecutive iterations without a deletion before stopping
    #[arg(long)]
    pub no_progress_budget: Option<u32>,

    /// Delay before the first scan (milliseconds)
    #[arg(long)]
    pub startup_delay_ms: Option<u64>,

    /// Leave the sidebar column in place
    #[arg(long)]
    pub keep_sidebar: bool,

    /// Wait up to SECS for timeline content (time to sign in) before sweeping
    #[arg(long, value_name = "SECS")]
    pub wait_for_login: Option<u64>,
}

impl SweepArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.ws_url {
            config.browser.websocket_url = Some(url.clone());
        }
        if let Some(path) = &self.chrome_path {
            config.browser.executable = path.clone();
        }
        if let Some(dir) = &self.profile_dir {
            config.browser.user_data_dir = dir.clone();
        }
        if self.headful {
            config.browser.headless = false;
        }
        if let Some(budget) = self.attempt_budget {
            config.sweep.attempt_budget = budget;
        }
        if let Some(budget) = self.no_progress_budget {
            config.sweep.no_progress_budget = budget;
        }
        if let Some(delay) = self.startup_delay_ms {
            config.sweep.startup_delay_ms = delay;
        }
        if self.keep_sidebar {
            config.sweep.declutter = false;
        }
    }
}

pub async fn cmd_sweep(args: SweepArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let mut config = ctx.config().clone();
    args.apply(&mut config);
    let intent = config.delete_intent()?;

    let (bus, _) = event_bus(256);
    let adapter = Arc::new(CdpAdapter::new(config.browser.clone(), bus));
    if adapter.mode().is_stub() {
        bail!("no Chrome/Chromium executable found; pass --chrome-path, set SWEEPER_CHROME or use --ws-url");
    }
    if ctx.metrics_port() != 0 {
        info!(port = ctx.metrics_port(), "metrics exposed on /metrics");
    }

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; finishing current step");
                cancel.cancel();
            }
        })
    };

    let mut watcher = None;
    let result = async {
        Arc::clone(&adapter)
            .start()
            .await
            .map_err(|err| adapter_error("starting CDP adapter", err))?;
        let events = adapter.subscribe();

        let page = adapter
            .adopt_or_create(&args.url)
            .await
            .map_err(|err| adapter_error("opening timeline tab", err))?;
        adapter
            .navigate(
                page,
                &args.url,
                Duration::from_millis(config.browser.default_deadline_ms),
            )
            .await
            .map_err(|err| adapter_error("navigating to timeline", err))?;
        let loaded = adapter.page_url(page).unwrap_or_else(|| args.url.clone());
        info!(url = %loaded, "timeline loaded");
        watcher = Some(cancel_on_page_close(events, page, cancel.clone()));

        let cdp: Arc<dyn Cdp> = adapter.clone();
        let host = Arc::new(CdpHostPage::new(cdp, page, config.site.clone()));
        if let Some(secs) = args.wait_for_login {
            ContentReadyWait {
                timeout_ms: secs.saturating_mul(1_000),
                poll_ms: 1_000,
            }
            .wait(host.as_ref(), &cancel)
            .await
            .context("waiting for timeline content")?;
        }

        let controller = SweepController::for_host(
            config.sweep.clone(),
            host,
            intent,
            config.site.steps.clone(),
            &config.site.container_marker,
            Arc::new(Pacer::new(config.tempo.clone())),
        )
        .with_cancel(cancel.clone());

        controller.run().await.context("sweep aborted")
    }
    .await;

    ctrl_c.abort();
    if let Some(watcher) = watcher {
        watcher.abort();
    }
    adapter.shutdown().await;

    let summary = result?;
    emit(&output, &summary, render_summary)
}

/// Cancels the run once the swept tab is closed.
fn cancel_on_page_close(
    mut events: broadcast::Receiver<RawEvent>,
    page: PageId,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(RawEvent::PageClosed { page: closed, .. }) if closed == page => {
                    warn!("timeline tab closed; stopping sweep");
                    cancel.cancel();
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "page event watcher lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn render_summary(summary: &SweepSummary) -> String {
    let remaining = match summary.remaining {
        Some(0) => "none".to_string(),
        Some(count) => format!("{count} still visible"),
        None => "unknown".to_string(),
    };
    let elapsed = humantime::format_duration(Duration::from_secs(summary.elapsed_ms / 1_000));
    format!(
        "Sweep of @{} finished ({})\n  deleted:   {}\n  attempts:  {}\n  remaining: {}\n  elapsed:   {}",
        summary.owner, summary.reason, summary.deleted, summary.attempts, remaining, elapsed
    )
}

fn adapter_error(context: &str, err: AdapterError) -> anyhow::Error {
    let hint = err.hint.clone().unwrap_or_default();
    anyhow!(
        "{}: kind={:?}, retriable={}, hint={}",
        context,
        err.kind,
        err.retriable,
        hint
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweep_loop::TerminationReason;

    fn summary(remaining: Option<usize>) -> SweepSummary {
        SweepSummary {
            owner: "alice".into(),
            deleted: 3,
            attempts: 23,
            reason: TerminationReason::NoProgressBudgetExhausted,
            remaining,
            started_at: "2026-01-01T00:00:00Z".parse().unwrap(),
            elapsed_ms: 65_000,
        }
    }

    fn args() -> SweepArgs {
        SweepArgs {
            url: "https://x.com/alice".into(),
            ws_url: None,
            chrome_path: None,
            profile_dir: None,
            headful: false,
            attempt_budget: None,
            no_progress_budget: None,
            startup_delay_ms: None,
            keep_sidebar: false,
            wait_for_login: None,
        }
    }

    #[test]
    fn flags_override_config() {
        let mut config = Config::default();
        let args = SweepArgs {
            ws_url: Some("ws://127.0.0.1:9222/devtools/browser/x".into()),
            attempt_budget: Some(5),
            keep_sidebar: true,
            headful: true,
            ..args()
        };
        config.browser.headless = true;
        args.apply(&mut config);

        assert_eq!(config.sweep.attempt_budget, 5);
        assert_eq!(config.sweep.no_progress_budget, 20);
        assert!(!config.sweep.declutter);
        assert!(!config.browser.headless);
        assert!(config.browser.websocket_url.is_some());
    }

    #[tokio::test]
    async fn closing_the_swept_tab_cancels_the_run() {
        let (bus, events) = event_bus(8);
        let page = PageId::new();
        let cancel = CancellationToken::new();
        let watcher = cancel_on_page_close(events, page, cancel.clone());

        bus.send(RawEvent::PageClosed {
            page: PageId::new(),
            ts: 0,
        })
        .unwrap();
        tokio::task::yield_now().await;
        assert!(!cancel.is_cancelled());

        bus.send(RawEvent::PageClosed { page, ts: 1 }).unwrap();
        watcher.await.unwrap();
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn summary_renders_remaining_state() {
        let done = render_summary(&summary(Some(0)));
        assert!(done.contains("deleted:   3"));
        assert!(done.contains("remaining: none"));
        assert!(done.contains("1m 5s"));

        let unknown = render_summary(&summary(None));
        assert!(unknown.contains("remaining: unknown"));
    }
}
