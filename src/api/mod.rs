pub mod handlers;
pub mod routes;
pub mod signature;

pub use routes::*;
pub use signature::RequestVerifier;

use crate::notifications::NotificationForwarder;
use crate::processing::AlertDispatcher;
use crate::state::DeliveryTracker;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<AlertDispatcher>,
    pub forwarder: Arc<NotificationForwarder>,
    pub deliveries: DeliveryTracker,
    pub verifier: Option<RequestVerifier>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        dispatcher: Arc<AlertDispatcher>,
        forwarder: Arc<NotificationForwarder>,
        deliveries: DeliveryTracker,
    ) -> Self {
        Self {
            dispatcher,
            forwarder,
            deliveries,
            verifier: None,
            started_at: Instant::now(),
        }
    }

    /// Require signed callbacks
    pub fn with_verifier(mut self, verifier: RequestVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }
}
