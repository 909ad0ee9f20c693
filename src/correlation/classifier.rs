use crate::config::RelayConfig;
use crate::correlation::cache::{CorrelationCache, SuppressionPolicy};
use crate::correlation::extractor::KeyExtractor;
use crate::correlation::markers::{MarkerSet, Markers};
use crate::models::{CorrelationKey, InboundAlert};
use serde::Serialize;
use strum::{AsRefStr, Display};

/// What to do with one inbound alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// First observation of the incident in its window: forward with the affordance
    NewTrigger { key: CorrelationKey, unstable: bool },
    /// Repeat within the window: cache updated, nothing forwarded
    Duplicate {
        key: CorrelationKey,
        trigger_count: u32,
    },
    /// Recovery of an incident that has not flapped enough: ignored
    RecoverySuppressed {
        key: CorrelationKey,
        trigger_count: u32,
    },
    /// Recovery accepted: incident closed, forwarded without the affordance
    Recovered { key: CorrelationKey },
    /// Not a correlatable alert
    Unrelated,
}

impl Decision {
    pub fn key(&self) -> Option<&CorrelationKey> {
        match self {
            Decision::NewTrigger { key, .. }
            | Decision::Duplicate { key, .. }
            | Decision::RecoverySuppressed { key, .. }
            | Decision::Recovered { key } => Some(key),
            Decision::Unrelated => None,
        }
    }

    /// `Some(actionable)` when the alert should be forwarded
    pub fn forward(&self) -> Option<bool> {
        match self {
            Decision::NewTrigger { .. } => Some(true),
            Decision::Recovered { .. } => Some(false),
            _ => None,
        }
    }
}

/// Trigger/recovery state machine over the correlation cache
#[derive(Debug, Clone)]
pub struct AlertClassifier {
    extractor: KeyExtractor,
    markers: MarkerSet,
    policy: SuppressionPolicy,
    flap_threshold: u32,
}

impl AlertClassifier {
    pub fn new(markers: MarkerSet, policy: SuppressionPolicy, flap_threshold: u32) -> Self {
        Self {
            extractor: KeyExtractor::new(),
            markers,
            policy,
            flap_threshold,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            MarkerSet::new(config.trigger_tags.iter().cloned()),
            SuppressionPolicy::new(config.issue_window(), config.triggered_window()),
            config.recovery_flap_threshold,
        )
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn policy(&self) -> &SuppressionPolicy {
        &self.policy
    }

    /// Classify one alert and apply its effect on the cache
    pub fn classify(&self, alert: &InboundAlert, cache: &mut CorrelationCache) -> Decision {
        let markers = self.markers.detect(alert);

        if markers.is_trigger() {
            let Some(key) = self.key_for(alert) else {
                return Decision::Unrelated;
            };
            self.on_trigger(alert, &markers, key, cache)
        } else if markers.is_recovery() {
            let Some(key) = self.key_for(alert) else {
                return Decision::Unrelated;
            };
            self.on_recovery(alert, &markers, key, cache)
        } else {
            Decision::Unrelated
        }
    }

    fn on_trigger(
        &self,
        alert: &InboundAlert,
        markers: &Markers,
        key: CorrelationKey,
        cache: &mut CorrelationCache,
    ) -> Decision {
        let unstable = markers.unstable_trigger();
        let suppressed = self
            .window_for(alert)
            .map_or(false, |window| cache.lookup(key.as_str(), window).is_some());

        let record = cache.touch(&key, unstable);

        if suppressed {
            Decision::Duplicate {
                key,
                trigger_count: record.trigger_count,
            }
        } else {
            Decision::NewTrigger { key, unstable }
        }
    }

    fn on_recovery(
        &self,
        alert: &InboundAlert,
        markers: &Markers,
        key: CorrelationKey,
        cache: &mut CorrelationCache,
    ) -> Decision {
        if markers.tagged_recovery() {
            let record = match self.window_for(alert) {
                Some(window) => cache.lookup(key.as_str(), window),
                None => cache.get(key.as_str()),
            };

            // No record means nothing left to gate: fall through to recovery.
            if let Some(record) = record {
                if record.trigger_count < self.flap_threshold {
                    return Decision::RecoverySuppressed {
                        key,
                        trigger_count: record.trigger_count,
                    };
                }
            }
        }

        cache.remove(key.as_str());
        Decision::Recovered { key }
    }

    /// Key from the correlation subject, falling back to the message text
    fn key_for(&self, alert: &InboundAlert) -> Option<CorrelationKey> {
        let key = self.extractor.extract(alert.subject()).or_else(|| {
            alert
                .attachment_title()
                .and_then(|_| self.extractor.extract(&alert.text))
        });

        if key.is_none() {
            tracing::info!(alert_id = %alert.id, "No correlation key in alert text");
        }
        key
    }

    /// Window from the text markers, falling back to the subject's markers
    fn window_for(&self, alert: &InboundAlert) -> Option<chrono::Duration> {
        self.policy
            .window_for(&alert.text)
            .or_else(|| self.policy.window_for(alert.subject()))
    }
}

impl Default for AlertClassifier {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}
