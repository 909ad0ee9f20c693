use crate::config::TrackerConfig;
use crate::error::Result;
use crate::integrations::mantis::IssueTracker;
use crate::models::{InboundAlert, TicketOutcome, TicketRef, TrackerFilter};
use crate::notifications::{ChatApi, PostMessage};
use std::collections::HashSet;
use std::sync::Arc;
use crate::metrics::FORWARD_FAILURES_TOTAL;
use tracing::{error, info};

/// Opens or updates tracker tickets for alerts seen in ticketed channels
pub struct TicketBridge {
    tracker: Arc<dyn IssueTracker>,
    chat: Option<Arc<dyn ChatApi>>,
    channel_ids: HashSet<String>,
    note_mention: String,
}

impl TicketBridge {
    pub fn new<I, S>(tracker: Arc<dyn IssueTracker>, channel_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tracker,
            chat: None,
            channel_ids: channel_ids.into_iter().map(Into::into).collect(),
            note_mention: "CSM".to_string(),
        }
    }

    pub fn from_config(
        tracker: Arc<dyn IssueTracker>,
        chat: Arc<dyn ChatApi>,
        config: &TrackerConfig,
    ) -> Self {
        let bridge = Self::new(tracker, config.channel_ids.iter().cloned())
            .with_note_mention(config.note_mention.clone());

        if config.reply_in_thread {
            bridge.with_thread_replies(chat)
        } else {
            bridge
        }
    }

    /// Post the outcome as a threaded reply to the source message
    pub fn with_thread_replies(mut self, chat: Arc<dyn ChatApi>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_note_mention(mut self, mention: impl Into<String>) -> Self {
        self.note_mention = mention.into();
        self
    }

    pub fn admits(&self, alert: &InboundAlert) -> bool {
        self.channel_ids.contains(&alert.channel)
    }

    /// First saved filter whose name appears in the text
    pub async fn find_filter(&self, text: &str) -> Result<Option<TrackerFilter>> {
        let filters = self.tracker.list_filters().await?;
        let matched = filters.into_iter().find(|f| !f.name.is_empty() && text.contains(&f.name));

        if matched.is_none() {
            info!("No tracker filter name appears in the message");
        }
        Ok(matched)
    }

    /// Ticket under `filter` whose summary equals `text` exactly
    pub async fn find_open_ticket_by_summary(
        &self,
        filter: &TrackerFilter,
        text: &str,
    ) -> Result<Option<TicketRef>> {
        let issues = self.tracker.issues_by_filter(filter.id).await?;
        Ok(issues
            .iter()
            .find(|issue| issue.summary.as_deref() == Some(text))
            .map(TicketRef::from))
    }

    pub async fn create_ticket(&self, summary: &str) -> Result<TicketRef> {
        self.tracker.create_issue(summary).await
    }

    /// Note reads `"{text} @{resolver} @{mention}"`; the resolver is skipped when unassigned
    pub async fn append_resolver_note(
        &self,
        ticket: &TicketRef,
        text: &str,
        resolver: Option<&str>,
    ) -> Result<()> {
        let note = match resolver {
            Some(name) => format!("{} @{} @{}", text, name, self.note_mention),
            None => format!("{} @{}", text, self.note_mention),
        };
        self.tracker.add_note(ticket.id, &note).await
    }

    /// Run the full lookup-then-create-or-annotate path for one alert
    pub async fn handle(&self, alert: &InboundAlert) -> Result<TicketOutcome> {
        let Some(filter) = self.find_filter(&alert.text).await? else {
            return Ok(TicketOutcome::NoFilter);
        };

        let outcome = match self.find_open_ticket_by_summary(&filter, &alert.text).await? {
            Some(ticket) => {
                info!(alert_id = %alert.id, issue_id = ticket.id, "Ticket exists, appending note");
                self.append_resolver_note(&ticket, &alert.text, ticket.resolver.as_deref())
                    .await?;
                TicketOutcome::NoteAppended(ticket)
            }
            None => {
                info!(alert_id = %alert.id, filter = %filter.name, "Creating new ticket");
                self.create_ticket(&alert.text).await?;
                TicketOutcome::Created
            }
        };

        self.reply(alert, &outcome).await;
        Ok(outcome)
    }

    async fn reply(&self, alert: &InboundAlert, outcome: &TicketOutcome) {
        let Some(chat) = &self.chat else {
            return;
        };

        let text = match outcome {
            TicketOutcome::NoteAppended(ticket) => format!("Matching issue: #{}", ticket.id),
            TicketOutcome::Created => format!("No issues found for {}; created a new ticket", alert.text),
            TicketOutcome::NoFilter => return,
        };

        let message = PostMessage::text(alert.channel.clone(), text).in_thread(alert.ts.clone());
        if let Err(e) = chat.post_message(&message).await {
            FORWARD_FAILURES_TOTAL
                .with_label_values(&["ticket_reply"])
                .inc();
            error!(alert_id = %alert.id, error = %e, "Failed to post ticket reply");
        }
    }
}
