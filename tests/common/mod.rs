//! Shared fakes for integration tests: an in-memory chat platform and issue
//! tracker that record every call.

#![allow(dead_code)]

use alert_relay::error::{AppError, Result};
use alert_relay::integrations::IssueTracker;
use alert_relay::models::{MessageRef, TicketRef, TrackerFilter, TrackerIssue};
use alert_relay::notifications::{BotIdentity, ChatApi, PostMessage};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Chat platform fake; records posts and reactions
#[derive(Default)]
pub struct RecordingChat {
    pub posts: Mutex<Vec<PostMessage>>,
    pub reactions: Mutex<Vec<(MessageRef, String)>>,
    pub channel_names: HashMap<String, String>,
    pub fail_posts: bool,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel_name(mut self, id: &str, name: &str) -> Self {
        self.channel_names.insert(id.to_string(), name.to_string());
        self
    }

    pub fn failing() -> Self {
        Self {
            fail_posts: true,
            ..Self::default()
        }
    }

    pub fn posts(&self) -> Vec<PostMessage> {
        self.posts.lock().clone()
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().len()
    }
}

#[async_trait]
impl ChatApi for RecordingChat {
    async fn permalink(&self, message: &MessageRef) -> Result<String> {
        Ok(format!(
            "https://example.slack.com/archives/{}/p{}",
            message.channel,
            message.ts.replace('.', "")
        ))
    }

    async fn channel_name(&self, channel: &str) -> Result<String> {
        self.channel_names
            .get(channel)
            .cloned()
            .ok_or_else(|| AppError::integration("slack", "conversations.info: channel_not_found"))
    }

    async fn post_message(&self, message: &PostMessage) -> Result<String> {
        if self.fail_posts {
            return Err(AppError::integration("slack", "chat.postMessage: not_in_channel"));
        }
        let mut posts = self.posts.lock();
        posts.push(message.clone());
        Ok(format!("{}.000100", posts.len()))
    }

    async fn add_reaction(&self, message: &MessageRef, name: &str) -> Result<()> {
        self.reactions.lock().push((message.clone(), name.to_string()));
        Ok(())
    }

    async fn identity(&self) -> Result<BotIdentity> {
        Ok(bot_identity())
    }
}

/// Identity the fake chat platform reports for the relay
pub fn bot_identity() -> BotIdentity {
    BotIdentity {
        user_id: "UBOT".to_string(),
        bot_id: Some("BBOT".to_string()),
    }
}

/// Issue tracker fake with fixed filters and issues
#[derive(Default)]
pub struct FakeTracker {
    pub filters: Vec<TrackerFilter>,
    pub issues: HashMap<u64, Vec<TrackerIssue>>,
    pub created: Mutex<Vec<String>>,
    pub notes: Mutex<Vec<(u64, String)>>,
    pub unavailable: bool,
}

impl FakeTracker {
    pub fn with_filter(mut self, id: u64, name: &str, issues: Vec<TrackerIssue>) -> Self {
        self.filters.push(TrackerFilter {
            id,
            name: name.to_string(),
        });
        self.issues.insert(id, issues);
        self
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn list_filters(&self) -> Result<Vec<TrackerFilter>> {
        if self.unavailable {
            return Err(AppError::Network("connection refused".to_string()));
        }
        Ok(self.filters.clone())
    }

    async fn issues_by_filter(&self, filter_id: u64) -> Result<Vec<TrackerIssue>> {
        Ok(self.issues.get(&filter_id).cloned().unwrap_or_default())
    }

    async fn create_issue(&self, summary: &str) -> Result<TicketRef> {
        let mut created = self.created.lock();
        created.push(summary.to_string());
        Ok(TicketRef {
            id: 1000 + created.len() as u64,
            resolver: None,
        })
    }

    async fn add_note(&self, issue_id: u64, text: &str) -> Result<()> {
        self.notes.lock().push((issue_id, text.to_string()));
        Ok(())
    }
}

pub fn issue(id: u64, summary: &str, handler: Option<&str>) -> TrackerIssue {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "summary": summary,
        "handler": handler.map(|name| serde_json::json!({ "name": name })),
    }))
    .unwrap()
}

/// "started" alert in the two-line Name block shape
pub fn problem_started(name: &str, host: &str, severity: &str) -> String {
    format!(
        "Problem started at 10:00\nName: {}\n{}\nSeverity: {}\nIssue ID: 77",
        name, host, severity
    )
}

pub fn problem_resolved(name: &str, host: &str, severity: &str) -> String {
    format!(
        "Problem has been resolved at 10:30\nName: {}\n{}\nSeverity: {}\nIssue ID: 77",
        name, host, severity
    )
}
