use crate::correlation::{AlertClassifier, CorrelationCache, Decision};
use crate::error::{AppError, Result};
use crate::integrations::TicketBridge;
use crate::metrics::{
    CORRELATION_CACHE_ENTRIES, DECISIONS_TOTAL, FORWARD_DURATION_SECONDS, FORWARD_FAILURES_TOTAL,
    TICKETS_TOTAL,
};
use crate::models::InboundAlert;
use crate::notifications::NotificationForwarder;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Sending side of a worker's inbound queue
#[derive(Clone)]
pub struct AlertQueue {
    name: &'static str,
    tx: mpsc::Sender<InboundAlert>,
}

impl AlertQueue {
    /// Enqueue without waiting; a full or closed queue is an error
    pub fn submit(&self, alert: InboundAlert) -> Result<()> {
        self.tx.try_send(alert).map_err(|e| match e {
            mpsc::error::TrySendError::Full(alert) => AppError::Internal(format!(
                "{} queue full, dropping alert {}",
                self.name, alert.id
            )),
            mpsc::error::TrySendError::Closed(_) => {
                AppError::Internal(format!("{} queue closed", self.name))
            }
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Owns the correlation cache and applies classifier decisions.
///
/// Runs as a single task so every cache mutation is serialized.
pub struct RelayProcessor {
    classifier: AlertClassifier,
    cache: CorrelationCache,
    forwarder: Arc<NotificationForwarder>,
}

impl RelayProcessor {
    pub fn new(
        classifier: AlertClassifier,
        cache: CorrelationCache,
        forwarder: Arc<NotificationForwarder>,
    ) -> Self {
        Self {
            classifier,
            cache,
            forwarder,
        }
    }

    pub fn cache(&self) -> &CorrelationCache {
        &self.cache
    }

    /// Classify one alert and forward it when the decision calls for it.
    ///
    /// Forwarding failures are logged and counted; the cache effect of the
    /// decision stands either way.
    pub async fn process(&mut self, alert: &InboundAlert) -> Decision {
        let decision = self.classifier.classify(alert, &mut self.cache);

        DECISIONS_TOTAL.with_label_values(&[decision.as_ref()]).inc();
        CORRELATION_CACHE_ENTRIES.set(self.cache.len() as f64);

        match &decision {
            Decision::NewTrigger { key, unstable } => {
                tracing::info!(alert_id = %alert.id, key = %key, unstable = unstable, "New incident");
            }
            Decision::Duplicate { key, trigger_count } => {
                tracing::info!(
                    alert_id = %alert.id,
                    key = %key,
                    trigger_count = trigger_count,
                    "Duplicate trigger suppressed"
                );
            }
            Decision::RecoverySuppressed { key, trigger_count } => {
                tracing::info!(
                    alert_id = %alert.id,
                    key = %key,
                    trigger_count = trigger_count,
                    "Skipping recovery below flap threshold"
                );
            }
            Decision::Recovered { key } => {
                tracing::info!(alert_id = %alert.id, key = %key, "Incident recovered");
            }
            Decision::Unrelated => {
                tracing::debug!(alert_id = %alert.id, "Alert not correlatable");
            }
        }

        if let Some(actionable) = decision.forward() {
            let label = if actionable { "true" } else { "false" };
            let timer = FORWARD_DURATION_SECONDS
                .with_label_values(&[label])
                .start_timer();

            if let Err(e) = self.forwarder.forward(alert, actionable).await {
                FORWARD_FAILURES_TOTAL.with_label_values(&["forward"]).inc();
                tracing::error!(
                    alert_id = %alert.id,
                    channel = %alert.channel,
                    error = %e,
                    "Failed to relay alert"
                );
            }
            timer.observe_duration();
        }

        decision
    }

    pub async fn run(mut self, mut rx: mpsc::Receiver<InboundAlert>) {
        while let Some(alert) = rx.recv().await {
            self.process(&alert).await;
        }
        tracing::info!("Relay worker stopped");
    }

    /// Start the worker task and return its queue
    pub fn spawn(self, queue_size: usize) -> (AlertQueue, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(queue_size);
        let handle = tokio::spawn(self.run(rx));
        (AlertQueue { name: "relay", tx }, handle)
    }
}

/// Drives the ticket bridge off its own queue so tracker latency never
/// delays relaying
pub struct TicketWorker {
    bridge: Arc<TicketBridge>,
}

impl TicketWorker {
    pub fn new(bridge: Arc<TicketBridge>) -> Self {
        Self { bridge }
    }

    pub async fn run(self, mut rx: mpsc::Receiver<InboundAlert>) {
        while let Some(alert) = rx.recv().await {
            match self.bridge.handle(&alert).await {
                Ok(outcome) => {
                    TICKETS_TOTAL.with_label_values(&[outcome.as_ref()]).inc();
                    tracing::info!(alert_id = %alert.id, outcome = %outcome, "Ticket bridge finished");
                }
                Err(e) => {
                    TICKETS_TOTAL.with_label_values(&["error"]).inc();
                    tracing::error!(alert_id = %alert.id, error = %e, "Ticket bridge failed");
                }
            }
        }
        tracing::info!("Ticket worker stopped");
    }

    pub fn spawn(self, queue_size: usize) -> (AlertQueue, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(queue_size);
        let handle = tokio::spawn(self.run(rx));
        (AlertQueue { name: "ticket", tx }, handle)
    }
}
