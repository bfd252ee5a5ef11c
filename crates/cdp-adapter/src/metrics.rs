//! Prometheus collectors for adapter traffic. Registered into the binary's registry on demand.

use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{histogram_opts, opts, HistogramVec, IntCounter, IntCounterVec, Registry};
use tracing::error;

lazy_static! {
    static ref COMMANDS: IntCounterVec = IntCounterVec::new(
        opts!("sweeper_cdp_commands_total", "CDP commands sent, by method and outcome"),
        &["method", "outcome"]
    )
    .unwrap();
    static ref COMMAND_SECONDS: HistogramVec = HistogramVec::new(
        histogram_opts!(
            "sweeper_cdp_command_duration_seconds",
            "Round-trip latency of successful CDP commands",
            vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]
        ),
        &["method"]
    )
    .unwrap();
    static ref EVENTS: IntCounter =
        IntCounter::new("sweeper_cdp_events_total", "CDP events drained by the adapter").unwrap();
}

pub fn register_metrics(registry: &Registry) {
    let collectors: [Box<dyn prometheus::core::Collector>; 3] = [
        Box::new(COMMANDS.clone()),
        Box::new(COMMAND_SECONDS.clone()),
        Box::new(EVENTS.clone()),
    ];
    for collector in collectors {
        match registry.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(err) => error!(?err, "failed to register cdp metric"),
        }
    }
}

/// Records one command round trip; latency is only observed for successes.
pub fn record_command(method: &str, elapsed: Duration, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    COMMANDS.with_label_values(&[method, outcome]).inc();
    if ok {
        COMMAND_SECONDS
            .with_label_values(&[method])
            .observe(elapsed.as_secs_f64());
    }
}

pub fn record_event() {
    EVENTS.inc();
}
