use serde::{Deserialize, Serialize};

use super::alert::MessageRef;

/// A relayed alert, ready to be posted to the broadcast channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Original alert text
    pub text: String,

    /// Link to the original message
    pub permalink: String,

    /// Where the original message was posted
    pub source: MessageRef,

    /// Human-readable name of the source channel
    pub source_channel_name: String,

    /// Broadcast channel to post into
    pub target_channel: String,

    /// Whether the post carries the "mark resolved" affordance
    pub actionable: bool,
}

impl Notification {
    /// Body posted to the broadcast channel
    pub fn render_text(&self) -> String {
        format!(
            "{}\n Link: <{}|View message>\n Channel: <#{}|{}>",
            self.text, self.permalink, self.source.channel, self.source_channel_name
        )
    }
}
