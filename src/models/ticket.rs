use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// A saved filter on the issue tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerFilter {
    pub id: u64,
    pub name: String,
}

/// The user an issue is assigned to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueHandler {
    pub name: String,
}

/// An issue as listed by the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerIssue {
    pub id: u64,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub handler: Option<IssueHandler>,
}

impl TrackerIssue {
    pub fn handler_name(&self) -> Option<&str> {
        self.handler.as_ref().map(|h| h.name.as_str())
    }
}

/// Reference to an open ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRef {
    pub id: u64,

    /// Assigned handler, named in resolver notes
    pub resolver: Option<String>,
}

impl From<&TrackerIssue> for TicketRef {
    fn from(issue: &TrackerIssue) -> Self {
        Self {
            id: issue.id,
            resolver: issue.handler_name().map(str::to_string),
        }
    }
}

/// What the ticket bridge did with one message
#[derive(Debug, Clone, PartialEq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum TicketOutcome {
    /// No saved filter name appears in the message
    NoFilter,
    /// A matching open ticket received a resolver note
    NoteAppended(TicketRef),
    /// No matching ticket existed; one was created
    Created,
}
