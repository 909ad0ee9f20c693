use crate::config::SlackConfig;
use crate::error::Result;
use crate::models::{InboundAlert, MessageRef, Notification};
use crate::notifications::slack::{ChatApi, PostMessage, SlackBlock, SlackElement, SlackText};
use crate::state::TtlCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Interactive control attached to actionable posts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affordance {
    pub label: String,
    pub action_id: String,
}

impl Default for Affordance {
    fn default() -> Self {
        Self {
            label: "Have you fixed it?".to_string(),
            action_id: "button_click".to_string(),
        }
    }
}

/// Composes relayed alerts and posts them to the broadcast channel
pub struct NotificationForwarder {
    chat: Arc<dyn ChatApi>,
    target_channel: String,
    affordance: Affordance,
    resolution_reaction: String,
    channel_names: TtlCache<String, String>,
}

impl NotificationForwarder {
    pub fn new(chat: Arc<dyn ChatApi>, target_channel: impl Into<String>) -> Self {
        Self {
            chat,
            target_channel: target_channel.into(),
            affordance: Affordance::default(),
            resolution_reaction: "white_check_mark".to_string(),
            channel_names: TtlCache::new(10_000, Duration::from_secs(3600)),
        }
    }

    pub fn from_config(chat: Arc<dyn ChatApi>, config: &SlackConfig) -> Self {
        Self::new(chat, config.target_channel_id.clone())
            .with_affordance(Affordance {
                label: config.affordance_label.clone(),
                action_id: config.affordance_action_id.clone(),
            })
            .with_resolution_reaction(config.resolution_reaction.clone())
    }

    pub fn with_affordance(mut self, affordance: Affordance) -> Self {
        self.affordance = affordance;
        self
    }

    pub fn with_resolution_reaction(mut self, reaction: impl Into<String>) -> Self {
        self.resolution_reaction = reaction.into();
        self
    }

    pub fn target_channel(&self) -> &str {
        &self.target_channel
    }

    pub fn affordance(&self) -> &Affordance {
        &self.affordance
    }

    pub fn chat(&self) -> &Arc<dyn ChatApi> {
        &self.chat
    }

    /// Resolve links for an alert and post it, with or without the affordance
    pub async fn forward(&self, alert: &InboundAlert, actionable: bool) -> Result<Notification> {
        let source = alert.message_ref();
        let permalink = self.chat.permalink(&source).await?;
        let source_channel_name = self.channel_name(&alert.channel).await;

        let notification = Notification {
            text: alert.text.clone(),
            permalink,
            source,
            source_channel_name,
            target_channel: self.target_channel.clone(),
            actionable,
        };

        self.post(&notification).await?;
        Ok(notification)
    }

    /// Post a composed notification
    pub async fn post(&self, notification: &Notification) -> Result<String> {
        let message = self.build_post(notification);
        let ts = self.chat.post_message(&message).await?;

        info!(
            source_channel = %notification.source.channel,
            source_ts = %notification.source.ts,
            target_channel = %notification.target_channel,
            actionable = notification.actionable,
            "Alert relayed"
        );
        Ok(ts)
    }

    /// Mark the message carrying the affordance as handled
    pub async fn apply_resolution_marker(&self, message: &MessageRef) -> Result<()> {
        self.chat
            .add_reaction(message, &self.resolution_reaction)
            .await?;
        info!(channel = %message.channel, ts = %message.ts, "Resolution marker applied");
        Ok(())
    }

    pub fn build_post(&self, notification: &Notification) -> PostMessage {
        let text = notification.render_text();
        let accessory = notification.actionable.then(|| SlackElement::Button {
            text: SlackText::plain(self.affordance.label.clone()),
            action_id: self.affordance.action_id.clone(),
        });

        PostMessage {
            channel: notification.target_channel.clone(),
            text: text.clone(),
            blocks: vec![SlackBlock::Section {
                text: SlackText::mrkdwn(text),
                accessory,
            }],
            unfurl_links: false,
            thread_ts: None,
        }
    }

    /// Channel display name, cached; falls back to the id when the lookup fails
    async fn channel_name(&self, channel: &str) -> String {
        if let Some(name) = self.channel_names.get(&channel.to_string()).await {
            return name;
        }

        match self.chat.channel_name(channel).await {
            Ok(name) => {
                self.channel_names
                    .insert(channel.to_string(), name.clone())
                    .await;
                name
            }
            Err(e) => {
                warn!(channel = %channel, error = %e, "Channel name lookup failed");
                channel.to_string()
            }
        }
    }
}
