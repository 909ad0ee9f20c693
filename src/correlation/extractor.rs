use crate::models::CorrelationKey;
use once_cell::sync::Lazy;
use regex::Regex;

/// `Triggered: <span>>` or `Recovered: <span>>`, span on a single line
static MARKER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(Triggered:|Recovered:)(.+)>").expect("valid marker pattern"));

/// `Name: <line>\n<line>`
static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Name:(.+\n.+)").expect("valid name pattern"));

/// Which alert text shape produced a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyShape {
    /// "Triggered:"/"Recovered:" span closed by `>`
    Marker,
    /// Two-line span following "Name:"
    NameBlock,
}

/// Derives a stable correlation key from raw alert text.
///
/// Pure: the same text always yields the same key.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyExtractor;

impl KeyExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the correlation key, or `None` when the text has no known shape
    pub fn extract(&self, text: &str) -> Option<CorrelationKey> {
        self.extract_with_shape(text).map(|(key, _)| key)
    }

    /// Extract the key along with the shape that matched
    pub fn extract_with_shape(&self, text: &str) -> Option<(CorrelationKey, KeyShape)> {
        let (span, shape) = if let Some(caps) = MARKER_PATTERN.captures(text) {
            (caps.get(2)?.as_str(), KeyShape::Marker)
        } else if let Some(caps) = NAME_PATTERN.captures(text) {
            (caps.get(1)?.as_str(), KeyShape::NameBlock)
        } else {
            tracing::debug!("No correlation key shape matched");
            return None;
        };

        let span = span.trim();
        if span.is_empty() {
            return None;
        }

        tracing::debug!(key = %span, shape = ?shape, "Extracted correlation key");
        Some((CorrelationKey::new(span), shape))
    }
}
