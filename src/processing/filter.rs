use crate::config::SlackConfig;
use crate::error::{AppError, Result};
use crate::models::InboundAlert;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use strum::{AsRefStr, Display};
use tracing::info;

#[derive(Debug, Deserialize)]
struct PatternsFile {
    #[serde(default)]
    patterns: Vec<String>,
}

/// Read the `{"patterns": [...]}` filter file
pub fn load_patterns(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::Configuration(format!(
            "Failed to load filter patterns {}: {}",
            path.display(),
            e
        ))
    })?;

    let file: PatternsFile = serde_json::from_str(&raw)
        .map_err(|e| AppError::Configuration(format!("Invalid filter patterns file: {}", e)))?;

    info!(path = %path.display(), patterns = ?file.patterns, "Loaded filter patterns");
    Ok(file.patterns)
}

/// Why a message was or was not handed to the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Admission {
    Admitted,
    /// Posted by the relay itself
    SelfAuthored,
    /// Posted in the broadcast channel itself
    OwnChannel,
    UnwatchedChannel,
    NoPatternMatch,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Channel allow-list plus text pattern gate in front of the classifier
#[derive(Debug, Clone)]
pub struct MessageFilter {
    pattern: Option<Regex>,
    channel_ids: HashSet<String>,
    target_channel: String,
}

impl MessageFilter {
    /// Fragments are joined with `|`; an empty list admits every text
    pub fn new<I, S>(patterns: &[String], channel_ids: I, target_channel: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pattern = if patterns.is_empty() {
            None
        } else {
            Some(Regex::new(&patterns.join("|"))?)
        };

        Ok(Self {
            pattern,
            channel_ids: channel_ids.into_iter().map(Into::into).collect(),
            target_channel: target_channel.into(),
        })
    }

    pub fn from_config(config: &SlackConfig, patterns: &[String]) -> Result<Self> {
        Self::new(
            patterns,
            config.channel_ids.iter().cloned(),
            config.target_channel_id.clone(),
        )
    }

    pub fn matches_text(&self, text: &str) -> bool {
        self.pattern.as_ref().map_or(true, |re| re.is_match(text))
    }

    pub fn admit(&self, alert: &InboundAlert) -> Admission {
        if alert.channel == self.target_channel {
            Admission::OwnChannel
        } else if !self.channel_ids.contains(&alert.channel) {
            Admission::UnwatchedChannel
        } else if !self.matches_text(&alert.text) {
            Admission::NoPatternMatch
        } else {
            Admission::Admitted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn patterns() -> Vec<String> {
        vec!["Triggered:".to_string(), "Problem started".to_string()]
    }

    #[test]
    fn test_admission_rules() {
        let filter = MessageFilter::new(&patterns(), ["C1"], "C9").unwrap();

        assert_eq!(
            filter.admit(&InboundAlert::new("Triggered: Disk>", "C1", "1")),
            Admission::Admitted
        );
        assert_eq!(
            filter.admit(&InboundAlert::new("Triggered: Disk>", "C2", "1")),
            Admission::UnwatchedChannel
        );
        assert_eq!(
            filter.admit(&InboundAlert::new("lunch?", "C1", "1")),
            Admission::NoPatternMatch
        );
        assert_eq!(
            filter.admit(&InboundAlert::new("Triggered: Disk>", "C9", "1")),
            Admission::OwnChannel
        );
    }

    #[test]
    fn test_own_channel_wins_even_when_listed() {
        let filter = MessageFilter::new(&patterns(), ["C1", "C9"], "C9").unwrap();
        let admission = filter.admit(&InboundAlert::new("Triggered: Disk>", "C9", "1"));
        assert_eq!(admission, Admission::OwnChannel);
        assert_eq!(admission.as_ref(), "own_channel");
    }

    #[test]
    fn test_empty_patterns_admit_everything() {
        let filter = MessageFilter::new(&[], ["C1"], "C9").unwrap();
        assert!(filter.admit(&InboundAlert::new("anything", "C1", "1")).is_admitted());
    }

    #[test]
    fn test_invalid_pattern_is_configuration_error() {
        let result = MessageFilter::new(&["(unclosed".to_string()], ["C1"], "C9");
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_load_patterns_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"patterns": ["Triggered:", "Recovered:"]}}"#).unwrap();

        let loaded = load_patterns(file.path()).unwrap();
        assert_eq!(loaded, vec!["Triggered:".to_string(), "Recovered:".to_string()]);
    }

    #[test]
    fn test_load_patterns_missing_file() {
        assert!(matches!(
            load_patterns("/nonexistent/patterns.json"),
            Err(AppError::Configuration(_))
        ));
    }
}
