//! Contract tests that drive a real Chromium binary through the adapter. They are ignored by
//! default because they need Chrome/Chromium on the host machine.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use cdp_adapter::{event_bus, Anchor, Cdp, CdpAdapter, CdpConfig};

fn contract_enabled() -> bool {
    env::var("SWEEPER_CDP_CONTRACT")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn headless_config() -> CdpConfig {
    CdpConfig {
        headless: true,
        user_data_dir: tempfile::tempdir()
            .expect("profile dir")
            .into_path(),
        ..CdpConfig::default()
    }
}

#[tokio::test]
#[ignore = "requires Chrome/Chromium; set SWEEPER_CDP_CONTRACT=1"]
async fn contract_create_evaluate_click() {
    if !contract_enabled() {
        eprintln!("skipping CDP contract test (SWEEPER_CDP_CONTRACT not enabled)");
        return;
    }

    let (bus, _rx) = event_bus(32);
    let adapter = Arc::new(CdpAdapter::new(headless_config(), bus));
    Arc::clone(&adapter).start().await.expect("adapter start");

    let page = adapter
        .create_page("data:text/html,<button onclick=\"document.title='hit'\" style=\"position:fixed;left:0;top:0;width:100px;height:100px\">b</button>")
        .await
        .expect("create page");

    adapter
        .click_at(page, Anchor { x: 50.0, y: 50.0 })
        .await
        .expect("click");

    let title = adapter
        .evaluate_script(page, "document.title")
        .await
        .expect("evaluate");
    assert_eq!(title, "hit");

    adapter
        .navigate(page, "about:blank", Duration::from_secs(10))
        .await
        .expect("navigate");

    adapter.shutdown().await;
}

#[tokio::test]
#[ignore = "requires Chrome/Chromium; set SWEEPER_CDP_CONTRACT=1"]
async fn contract_lists_page_targets() {
    if !contract_enabled() {
        eprintln!("skipping CDP contract test (SWEEPER_CDP_CONTRACT not enabled)");
        return;
    }

    let (bus, _rx) = event_bus(32);
    let adapter = Arc::new(CdpAdapter::new(headless_config(), bus));
    Arc::clone(&adapter).start().await.expect("adapter start");

    adapter.create_page("about:blank").await.expect("create page");
    let targets = adapter.list_page_targets().await.expect("list targets");
    assert!(targets.iter().all(|target| target.is_page()));
    assert!(!targets.is_empty());

    adapter.shutdown().await;
}
