//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relayer_ticks_total` (counter): reconciler ticks by outcome (ran, skipped)
//! - `relayer_tick_duration_seconds` (histogram): time spent per tick
//! - `relayer_subscription_actions_total` (counter): per-subscription decisions
//! - `relayer_rpc_failures_total` (counter): failed ledger calls by method
//! - `relayer_submissions_total` (counter): submission lifecycle events
//! - `relayer_relay_requests_total` (counter): relay outcomes
//! - `relayer_http_requests_total` (counter): API requests by route, status
//! - `relayer_tracked_subscriptions` (gauge): size of the stored list
//! - `relayer_ledger_up` (gauge): 1=probe succeeded, 0=failed
//!
//! Without an installed recorder every helper is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_tick(ran: bool, elapsed: Duration) {
    let outcome = if ran { "ran" } else { "skipped" };
    counter!("relayer_ticks_total", "outcome" => outcome).increment(1);
    if ran {
        histogram!("relayer_tick_duration_seconds").record(elapsed.as_secs_f64());
    }
}

pub fn record_action(action: &'static str) {
    counter!("relayer_subscription_actions_total", "action" => action).increment(1);
}

pub fn record_rpc_failure(method: &str) {
    counter!("relayer_rpc_failures_total", "method" => method.to_string()).increment(1);
}

pub fn record_submission_event(event: &'static str) {
    counter!("relayer_submissions_total", "event" => event).increment(1);
}

pub fn record_relay(outcome: &'static str) {
    counter!("relayer_relay_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_request(route: &str, status: u16) {
    counter!(
        "relayer_http_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_tracked_subscriptions(count: usize) {
    gauge!("relayer_tracked_subscriptions").set(count as f64);
}

pub fn record_ledger_up(up: bool) {
    gauge!("relayer_ledger_up").set(if up { 1.0 } else { 0.0 });
}
