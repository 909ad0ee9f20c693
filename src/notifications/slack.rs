use crate::config::SlackConfig;
use crate::error::{AppError, Result};
use crate::models::{InboundAlert, MessageRef};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Calls the relay makes against the chat platform
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Permalink to a message
    async fn permalink(&self, message: &MessageRef) -> Result<String>;

    /// Display name of a channel
    async fn channel_name(&self, channel: &str) -> Result<String>;

    /// Post a message, returning its timestamp
    async fn post_message(&self, message: &PostMessage) -> Result<String>;

    /// Add a reaction to a message
    async fn add_reaction(&self, message: &MessageRef, name: &str) -> Result<()>;

    /// Identity the relay posts under
    async fn identity(&self) -> Result<BotIdentity>;
}

/// The relay's own user and bot ids, as reported by `auth.test`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BotIdentity {
    pub user_id: String,
    #[serde(default)]
    pub bot_id: Option<String>,
}

impl BotIdentity {
    /// True when the relay itself posted the message
    pub fn authored(&self, alert: &InboundAlert) -> bool {
        alert.user.as_deref() == Some(self.user_id.as_str())
            || (alert.bot_id.is_some() && alert.bot_id == self.bot_id)
    }
}

/// `chat.postMessage` body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostMessage {
    pub channel: String,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<SlackBlock>,
    pub unfurl_links: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

impl PostMessage {
    /// Plain text message
    pub fn text(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
            blocks: Vec::new(),
            unfurl_links: false,
            thread_ts: None,
        }
    }

    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }

    /// The interactive button carried by this message, if any
    pub fn button(&self) -> Option<&SlackElement> {
        self.blocks.iter().find_map(|block| match block {
            SlackBlock::Section { accessory, .. } => accessory.as_ref(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum SlackBlock {
    #[serde(rename = "section")]
    Section {
        text: SlackText,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<SlackElement>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum SlackElement {
    #[serde(rename = "button")]
    Button { text: SlackText, action_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackText {
    #[serde(rename = "type")]
    pub text_type: String,
    pub text: String,
}

impl SlackText {
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self {
            text_type: "mrkdwn".to_string(),
            text: text.into(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text_type: "plain_text".to_string(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PermalinkResponse {
    permalink: String,
}

#[derive(Debug, Deserialize)]
struct ConversationInfoResponse {
    channel: ConversationInfo,
}

#[derive(Debug, Deserialize)]
struct ConversationInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ts: String,
}

#[derive(Debug, Serialize)]
struct ReactionRequest<'a> {
    channel: &'a str,
    name: &'a str,
    timestamp: &'a str,
}

/// Slack Web API client
#[derive(Clone)]
pub struct SlackClient {
    pub(crate) base_url: String,
    pub(crate) bot_token: String,
    pub(crate) client: Client,
}

impl SlackClient {
    /// Create a new Slack client
    pub fn new(base_url: impl Into<String>, bot_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            client,
        })
    }

    pub fn from_config(config: &SlackConfig) -> Result<Self> {
        Self::new(
            config.api_base_url.clone(),
            config.bot_token()?,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn get<T: DeserializeOwned>(&self, method: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self
            .client
            .get(self.url(method))
            .bearer_auth(&self.bot_token)
            .query(query)
            .send()
            .await?;

        decode(method, response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, method: &str, body: &B) -> Result<T> {
        let response = self
            .client
            .post(self.url(method))
            .bearer_auth(&self.bot_token)
            .json(body)
            .send()
            .await?;

        decode(method, response).await
    }
}

/// Unwrap a Web API response: HTTP status first, then the `ok` envelope
async fn decode<T: DeserializeOwned>(method: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(AppError::integration(
            "slack",
            format!("{} failed with status {}: {}", method, status, body),
        ));
    }

    let value: Value = response.json().await?;
    if value.get("ok").and_then(Value::as_bool) != Some(true) {
        let error = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error");
        return Err(AppError::integration("slack", format!("{}: {}", method, error)));
    }

    Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl ChatApi for SlackClient {
    async fn permalink(&self, message: &MessageRef) -> Result<String> {
        let response: PermalinkResponse = self
            .get(
                "chat.getPermalink",
                &[
                    ("channel", message.channel.as_str()),
                    ("message_ts", message.ts.as_str()),
                ],
            )
            .await?;
        Ok(response.permalink)
    }

    async fn channel_name(&self, channel: &str) -> Result<String> {
        let response: ConversationInfoResponse = self
            .get("conversations.info", &[("channel", channel)])
            .await?;
        Ok(response.channel.name)
    }

    async fn post_message(&self, message: &PostMessage) -> Result<String> {
        let response: PostMessageResponse = self.post("chat.postMessage", message).await?;
        info!(channel = %message.channel, ts = %response.ts, "Slack message posted");
        Ok(response.ts)
    }

    async fn add_reaction(&self, message: &MessageRef, name: &str) -> Result<()> {
        let request = ReactionRequest {
            channel: &message.channel,
            name,
            timestamp: &message.ts,
        };

        match self.post::<_, Value>("reactions.add", &request).await {
            Ok(_) => Ok(()),
            // Acknowledging twice is not a failure.
            Err(AppError::Integration { message: error, .. }) if error.ends_with("already_reacted") => {
                debug!(channel = %message.channel, ts = %message.ts, "Reaction already present");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn identity(&self) -> Result<BotIdentity> {
        let identity: BotIdentity = self.post("auth.test", &serde_json::json!({})).await?;
        info!(user_id = %identity.user_id, bot_id = ?identity.bot_id, "Resolved bot identity");
        Ok(identity)
    }
}
