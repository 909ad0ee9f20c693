use crate::models::InboundAlert;

pub const TRIGGERED: &str = "Triggered";
pub const RECOVERED: &str = "Recovered";
pub const STARTED: &str = "started";
pub const RESOLVED: &str = "resolved";

/// Text markers found on one inbound alert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Markers {
    /// Subject carries "Triggered"
    pub triggered: bool,
    /// Subject carries "Recovered"
    pub recovered: bool,
    /// Text carries "started"
    pub started: bool,
    /// Text carries "resolved"
    pub resolved: bool,
    /// Text carries at least one configured severity tag
    pub severity_tagged: bool,
}

impl Markers {
    /// "started" together with a severity tag: a volatile trigger that counts as a flap
    pub fn unstable_trigger(&self) -> bool {
        self.started && self.severity_tagged
    }

    /// "resolved" together with a severity tag: recovery subject to the flap gate
    pub fn tagged_recovery(&self) -> bool {
        self.resolved && self.severity_tagged
    }

    pub fn is_trigger(&self) -> bool {
        self.triggered || self.unstable_trigger()
    }

    pub fn is_recovery(&self) -> bool {
        self.recovered || self.tagged_recovery()
    }
}

/// Detects markers against a configured set of severity tags
#[derive(Debug, Clone)]
pub struct MarkerSet {
    trigger_tags: Vec<String>,
}

impl MarkerSet {
    pub fn new<I, S>(trigger_tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trigger_tags: trigger_tags
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty())
                .collect(),
        }
    }

    pub fn trigger_tags(&self) -> &[String] {
        &self.trigger_tags
    }

    pub fn has_severity_tag(&self, text: &str) -> bool {
        self.trigger_tags.iter().any(|tag| text.contains(tag.as_str()))
    }

    pub fn detect(&self, alert: &InboundAlert) -> Markers {
        let subject = alert.subject();
        let text = alert.text.as_str();

        Markers {
            triggered: subject.contains(TRIGGERED),
            recovered: subject.contains(RECOVERED),
            started: text.contains(STARTED),
            resolved: text.contains(RESOLVED),
            severity_tagged: self.has_severity_tag(text),
        }
    }
}
