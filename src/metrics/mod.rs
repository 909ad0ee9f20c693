//! Prometheus metrics for the relay.
//!
//! All collectors live in one process-wide registry and are exported by the
//! `/metrics` endpoint in text exposition format.
//!
//! ```no_run
//! use alert_relay::metrics::DECISIONS_TOTAL;
//!
//! DECISIONS_TOTAL.with_label_values(&["new_trigger"]).inc();
//! ```

use lazy_static::lazy_static;
use prometheus::{CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "alert_relay";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Inbound chat messages by admission outcome
    ///
    /// Labels: outcome (admitted, self_authored, own_channel, unwatched_channel,
    /// no_pattern_match, duplicate_delivery)
    pub static ref MESSAGES_RECEIVED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("messages_received_total", "Inbound chat messages by admission outcome")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create MESSAGES_RECEIVED_TOTAL metric");

    /// Classifier decisions
    ///
    /// Labels: decision
    pub static ref DECISIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("decisions_total", "Correlation decisions made by the classifier")
            .namespace(NAMESPACE),
        &["decision"]
    ).expect("Failed to create DECISIONS_TOTAL metric");

    /// Failed chat platform calls
    ///
    /// Labels: operation (forward, resolution_marker, ticket_reply)
    pub static ref FORWARD_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("forward_failures_total", "Failed chat platform calls")
            .namespace(NAMESPACE),
        &["operation"]
    ).expect("Failed to create FORWARD_FAILURES_TOTAL metric");

    /// Ticket bridge outcomes
    ///
    /// Labels: outcome (no_filter, note_appended, created, error)
    pub static ref TICKETS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("tickets_total", "Ticket bridge outcomes")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create TICKETS_TOTAL metric");

    /// Time spent forwarding one alert, including link lookups
    pub static ref FORWARD_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("forward_duration_seconds", "Time spent relaying one alert")
            .namespace(NAMESPACE)
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["actionable"]
    ).expect("Failed to create FORWARD_DURATION_SECONDS metric");

    /// Open incidents held by the correlation cache
    pub static ref CORRELATION_CACHE_ENTRIES: Gauge = Gauge::with_opts(
        Opts::new("correlation_cache_entries", "Open incidents held by the correlation cache")
            .namespace(NAMESPACE)
    ).expect("Failed to create CORRELATION_CACHE_ENTRIES metric");

    /// Build information
    ///
    /// Labels: version
    pub static ref BUILD_INFO: GaugeVec = GaugeVec::new(
        Opts::new("build_info", "Build information").namespace(NAMESPACE),
        &["version"]
    ).expect("Failed to create BUILD_INFO metric");
}

/// Register every collector with the global registry
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(MESSAGES_RECEIVED_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(DECISIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(FORWARD_FAILURES_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(TICKETS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(FORWARD_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(CORRELATION_CACHE_ENTRIES.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(BUILD_INFO.clone()))?;

    BUILD_INFO
        .with_label_values(&[env!("CARGO_PKG_VERSION")])
        .set(1.0);

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Render the registry in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        // Registry is global; a second registration in the same process fails.
        let _ = init_metrics();
        let output = gather_metrics();
        assert!(output.contains("alert_relay_build_info"));
    }

    #[test]
    fn test_decision_counter() {
        DECISIONS_TOTAL.with_label_values(&["duplicate"]).inc();
        assert!(DECISIONS_TOTAL.with_label_values(&["duplicate"]).get() >= 1.0);
    }
}
