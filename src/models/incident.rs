use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Stable identity of a logical incident across its trigger/recovery lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CorrelationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CorrelationKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CorrelationKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// State of one open incident, owned by the correlation cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentRecord {
    /// Most recent observation
    pub last_seen: DateTime<Utc>,

    /// Starts at 1; grows only with unstable trigger observations
    pub trigger_count: u32,
}

impl IncidentRecord {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_seen: now,
            trigger_count: 1,
        }
    }

    /// Whether more than `window` has passed since the last observation
    pub fn is_expired(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        now - self.last_seen > window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_record_starts_at_one() {
        let now = Utc::now();
        let record = IncidentRecord::new(now);
        assert_eq!(record.trigger_count, 1);
        assert_eq!(record.last_seen, now);
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let start = Utc::now();
        let record = IncidentRecord::new(start);
        let window = Duration::minutes(15);

        assert!(!record.is_expired(start + window, window));
        assert!(record.is_expired(start + window + Duration::seconds(1), window));
    }

    #[test]
    fn test_key_borrows_as_str() {
        let mut map = std::collections::HashMap::new();
        map.insert(CorrelationKey::new("DiskFull"), 1);
        assert_eq!(map.get("DiskFull"), Some(&1));
    }
}
