use crate::integrations::TicketBridge;
use crate::metrics::MESSAGES_RECEIVED_TOTAL;
use crate::models::InboundAlert;
use crate::notifications::BotIdentity;
use crate::processing::filter::{Admission, MessageFilter};
use crate::processing::processor::AlertQueue;
use std::sync::Arc;

/// Routes inbound messages to the relay and ticket workers
pub struct AlertDispatcher {
    filter: MessageFilter,
    relay: AlertQueue,
    tickets: Option<(Arc<TicketBridge>, AlertQueue)>,
    identity: Option<BotIdentity>,
}

impl AlertDispatcher {
    pub fn new(filter: MessageFilter, relay: AlertQueue) -> Self {
        Self {
            filter,
            relay,
            tickets: None,
            identity: None,
        }
    }

    /// Drop messages the relay posted itself
    pub fn with_identity(mut self, identity: BotIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_tickets(mut self, bridge: Arc<TicketBridge>, queue: AlertQueue) -> Self {
        self.tickets = Some((bridge, queue));
        self
    }

    /// Hand the message to every worker that wants it.
    ///
    /// Ticketing is gated by its own channel list, not the relay filter.
    /// The relay's own posts reach neither worker.
    pub fn dispatch(&self, alert: InboundAlert) -> Admission {
        if self.identity.as_ref().is_some_and(|id| id.authored(&alert)) {
            MESSAGES_RECEIVED_TOTAL
                .with_label_values(&[Admission::SelfAuthored.as_ref()])
                .inc();
            tracing::debug!(alert_id = %alert.id, channel = %alert.channel, "Ignoring own message");
            return Admission::SelfAuthored;
        }

        let admission = self.filter.admit(&alert);
        MESSAGES_RECEIVED_TOTAL
            .with_label_values(&[admission.as_ref()])
            .inc();

        if let Some((bridge, queue)) = &self.tickets {
            if bridge.admits(&alert) {
                self.enqueue(queue, alert.clone());
            }
        }

        if admission.is_admitted() {
            self.enqueue(&self.relay, alert);
        } else {
            tracing::debug!(alert_id = %alert.id, channel = %alert.channel, admission = %admission, "Message not relayed");
        }

        admission
    }

    fn enqueue(&self, queue: &AlertQueue, alert: InboundAlert) {
        let alert_id = alert.id;
        if let Err(e) = queue.submit(alert) {
            tracing::warn!(alert_id = %alert_id, queue = queue.name(), error = %e, "Failed to enqueue alert");
        }
    }
}
