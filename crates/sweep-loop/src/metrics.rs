use lazy_static::lazy_static;
use prometheus::{core::Collector, IntCounter, IntCounterVec, Opts, Registry};
use tracing::error;

lazy_static! {
    static ref SWEEP_ITERATIONS_TOTAL: IntCounter =
        IntCounter::new("sweeper_iterations_total", "Scan iterations started").unwrap();
    static ref SWEEP_ITERATION_FAILURES_TOTAL: IntCounter = IntCounter::new(
        "sweeper_iteration_failures_total",
        "Scan iterations aborted by a host error"
    )
    .unwrap();
    static ref SWEEP_OUTCOMES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("sweeper_delete_outcomes_total", "Delete attempts by outcome"),
        &["outcome"]
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register sweep metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, SWEEP_ITERATIONS_TOTAL.clone());
    register(registry, SWEEP_ITERATION_FAILURES_TOTAL.clone());
    register(registry, SWEEP_OUTCOMES_TOTAL.clone());
}

pub fn record_iteration() {
    SWEEP_ITERATIONS_TOTAL.inc();
}

pub fn record_iteration_failure() {
    SWEEP_ITERATION_FAILURES_TOTAL.inc();
}

pub fn record_outcome(outcome: &str) {
    SWEEP_OUTCOMES_TOTAL.with_label_values(&[outcome]).inc();
}
