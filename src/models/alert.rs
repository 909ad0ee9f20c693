use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to a message on the chat platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    /// Channel the message lives in
    pub channel: String,

    /// Platform timestamp identifying the message within its channel
    pub ts: String,
}

impl MessageRef {
    pub fn new(channel: impl Into<String>, ts: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ts: ts.into(),
        }
    }
}

/// Attachment carried by an inbound message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub title: Option<String>,
}

/// An alert-like message delivered by the chat platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundAlert {
    /// Local identifier used to tie log lines together
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Platform event id, used to drop redeliveries
    #[serde(default)]
    pub event_id: Option<String>,

    /// Raw message text
    pub text: String,

    /// Source channel id
    pub channel: String,

    /// Platform timestamp of the message
    pub ts: String,

    /// Attachments (only titles matter here)
    #[serde(default)]
    pub attachments: Vec<Attachment>,

    /// Posting user, when the platform reports one
    #[serde(default)]
    pub user: Option<String>,

    /// Posting bot integration, for bot-authored messages
    #[serde(default)]
    pub bot_id: Option<String>,

    /// When the relay received the message
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl InboundAlert {
    /// Create a new inbound alert
    pub fn new(text: impl Into<String>, channel: impl Into<String>, ts: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id: None,
            text: text.into(),
            channel: channel.into(),
            ts: ts.into(),
            attachments: Vec::new(),
            user: None,
            bot_id: None,
            received_at: Utc::now(),
        }
    }

    /// Attach a titled attachment
    pub fn with_attachment_title(mut self, title: impl Into<String>) -> Self {
        self.attachments.push(Attachment {
            title: Some(title.into()),
        });
        self
    }

    /// Record who posted the message
    pub fn with_author(mut self, user: Option<String>, bot_id: Option<String>) -> Self {
        self.user = user;
        self.bot_id = bot_id;
        self
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Title of the first attachment, if it has a non-empty one
    pub fn attachment_title(&self) -> Option<&str> {
        self.attachments
            .first()
            .and_then(|a| a.title.as_deref())
            .filter(|t| !t.is_empty())
    }

    /// Correlation subject: the first attachment title when present, else the text
    pub fn subject(&self) -> &str {
        self.attachment_title().unwrap_or(&self.text)
    }

    pub fn message_ref(&self) -> MessageRef {
        MessageRef::new(self.channel.clone(), self.ts.clone())
    }
}
