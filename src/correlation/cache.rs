use crate::correlation::clock::{Clock, SystemClock};
use crate::models::{CorrelationKey, IncidentRecord};
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;

pub const ISSUE_MARKER: &str = "Issue";
pub const TRIGGERED_MARKER: &str = "Triggered";

/// Suppression window selected by the alert's text shape.
///
/// "Issue" alerts use the short window, "Triggered" alerts the long one.
/// Any other text never gets a window, so it is never suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuppressionPolicy {
    pub issue_window: Duration,
    pub triggered_window: Duration,
}

impl SuppressionPolicy {
    pub fn new(issue_window: Duration, triggered_window: Duration) -> Self {
        Self {
            issue_window,
            triggered_window,
        }
    }

    pub fn window_for(&self, text: &str) -> Option<Duration> {
        if text.contains(ISSUE_MARKER) {
            Some(self.issue_window)
        } else if text.contains(TRIGGERED_MARKER) {
            Some(self.triggered_window)
        } else {
            None
        }
    }
}

impl Default for SuppressionPolicy {
    fn default() -> Self {
        Self::new(Duration::minutes(15), Duration::minutes(60))
    }
}

/// Open incidents keyed by correlation key.
///
/// Expiry is lazy: a record past its window is only evicted when a lookup
/// finds it. The cache is single-writer; the relay worker owns it.
pub struct CorrelationCache {
    records: HashMap<CorrelationKey, IncidentRecord>,
    clock: Arc<dyn Clock>,
}

impl CorrelationCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: HashMap::new(),
            clock,
        }
    }

    /// Return the record if it was seen within `window`, evicting it otherwise
    pub fn lookup(&mut self, key: &str, window: Duration) -> Option<IncidentRecord> {
        let now = self.clock.now();
        let record = *self.records.get(key)?;

        if record.is_expired(now, window) {
            self.records.remove(key);
            tracing::info!(
                key = %key,
                last_seen = %record.last_seen,
                window_secs = window.num_seconds(),
                "Evicted expired incident"
            );
            return None;
        }

        Some(record)
    }

    /// Read a record without applying any window
    pub fn get(&self, key: &str) -> Option<IncidentRecord> {
        self.records.get(key).copied()
    }

    /// Record an observation.
    ///
    /// Inserts `{now, 1}` for a new key. For an existing key, refreshes
    /// `last_seen` and bumps the count only when `unstable` is set.
    pub fn touch(&mut self, key: &CorrelationKey, unstable: bool) -> IncidentRecord {
        let now = self.clock.now();
        let record = self
            .records
            .entry(key.clone())
            .and_modify(|record| {
                record.last_seen = now;
                if unstable {
                    record.trigger_count += 1;
                }
            })
            .or_insert_with(|| IncidentRecord::new(now));

        *record
    }

    /// Unconditional eviction; a missing key is a no-op
    pub fn remove(&mut self, key: &str) -> Option<IncidentRecord> {
        let removed = self.records.remove(key);
        tracing::debug!(key = %key, existed = removed.is_some(), "Removed incident");
        removed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for CorrelationCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for CorrelationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationCache")
            .field("records", &self.records)
            .finish_non_exhaustive()
    }
}
