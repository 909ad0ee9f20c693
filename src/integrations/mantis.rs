//! Mantis REST client
//!
//! Only the calls the ticket bridge needs: saved filters, issues under a
//! filter, issue creation and note appends. Payload bodies come from a JSON
//! template file so project/category/priority stay deployment-specific.

use crate::config::TrackerConfig;
use crate::error::{AppError, Result};
use crate::models::{TicketRef, TrackerFilter, TrackerIssue};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Issue tracker calls used by the ticket bridge
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Saved filters visible to the API token
    async fn list_filters(&self) -> Result<Vec<TrackerFilter>>;

    /// Issues matched by a saved filter
    async fn issues_by_filter(&self, filter_id: u64) -> Result<Vec<TrackerIssue>>;

    /// Create an issue with the given summary
    async fn create_issue(&self, summary: &str) -> Result<TicketRef>;

    /// Append a note to an issue
    async fn add_note(&self, issue_id: u64, text: &str) -> Result<()>;
}

/// Request bodies for issue creation and note appends
#[derive(Debug, Clone, PartialEq)]
pub struct IssueTemplates {
    issue: Value,
    update: Value,
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    issues: Vec<Value>,
    #[serde(default)]
    updates: Vec<Value>,
}

impl IssueTemplates {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!(
                "Failed to read issue templates {}: {}",
                path.display(),
                e
            ))
        })?;
        let templates = Self::from_json(&raw)?;
        info!(path = %path.display(), "Loaded issue templates");
        Ok(templates)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: TemplateFile = serde_json::from_str(raw)
            .map_err(|e| AppError::Configuration(format!("Invalid issue templates: {}", e)))?;

        let issue = file.issues.into_iter().next().unwrap_or_else(|| json!({}));
        let update = file.updates.into_iter().next().unwrap_or_else(|| json!({}));

        if !issue.is_object() || !update.is_object() {
            return Err(AppError::Configuration(
                "Issue templates must be JSON objects".to_string(),
            ));
        }

        Ok(Self { issue, update })
    }

    /// Creation body: the issue template with its summary replaced
    pub fn issue_payload(&self, summary: &str) -> Value {
        let mut payload = self.issue.clone();
        payload["summary"] = Value::String(summary.to_string());
        payload
    }

    /// Update body: the update template with its first note's text replaced
    pub fn note_payload(&self, text: &str) -> Value {
        let mut payload = self.update.clone();
        match payload.get_mut("notes").and_then(Value::as_array_mut) {
            Some(notes) if !notes.is_empty() && notes[0].is_object() => {
                notes[0]["text"] = Value::String(text.to_string());
            }
            _ => {
                payload["notes"] = json!([{ "text": text }]);
            }
        }
        payload
    }
}

impl Default for IssueTemplates {
    fn default() -> Self {
        Self {
            issue: json!({}),
            update: json!({}),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FiltersResponse {
    #[serde(default)]
    filters: Vec<TrackerFilter>,
}

#[derive(Debug, Deserialize)]
struct IssuesResponse {
    #[serde(default)]
    issues: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct CreatedIssueResponse {
    issue: TrackerIssue,
}

/// Mantis REST API client
#[derive(Clone)]
pub struct MantisClient {
    base_url: String,
    token: String,
    templates: IssueTemplates,
    client: Client,
}

impl MantisClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        templates: IssueTemplates,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            templates,
            client,
        })
    }

    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        let base_url = config.base_url.clone().ok_or_else(|| {
            AppError::Configuration("tracker.base_url is required".to_string())
        })?;

        Self::new(
            base_url,
            config.token()?,
            IssueTemplates::load(&config.issue_template_file)?,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/rest/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", &self.token)
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = self.authorized(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::integration(
                "mantis",
                format!("{} failed with status {}: {}", operation, status, body),
            ));
        }

        debug!(operation = operation, status = status.as_u16(), "Tracker request succeeded");
        Ok(response)
    }
}

#[async_trait]
impl IssueTracker for MantisClient {
    async fn list_filters(&self) -> Result<Vec<TrackerFilter>> {
        let response = self
            .send("get filters", self.client.get(self.url("filters")))
            .await?;
        let body: FiltersResponse = response.json().await?;
        Ok(body.filters)
    }

    async fn issues_by_filter(&self, filter_id: u64) -> Result<Vec<TrackerIssue>> {
        let request = self
            .client
            .get(self.url("issues"))
            .query(&[("filter_id", filter_id)]);
        let response = self.send("get issues", request).await?;
        let body: IssuesResponse = response.json().await?;

        let issues = body
            .issues
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<TrackerIssue>(raw) {
                Ok(issue) => Some(issue),
                Err(e) => {
                    warn!(filter_id = filter_id, error = %e, "Skipping malformed issue entry");
                    None
                }
            })
            .collect();

        Ok(issues)
    }

    async fn create_issue(&self, summary: &str) -> Result<TicketRef> {
        let request = self
            .client
            .post(self.url("issues"))
            .json(&self.templates.issue_payload(summary));
        let response = self.send("create issue", request).await?;
        let body: CreatedIssueResponse = response.json().await?;

        info!(issue_id = body.issue.id, "Issue created successfully");
        Ok(TicketRef::from(&body.issue))
    }

    async fn add_note(&self, issue_id: u64, text: &str) -> Result<()> {
        let request = self
            .client
            .patch(self.url(&format!("issues/{}", issue_id)))
            .json(&self.templates.note_payload(text));
        self.send("modify issue", request).await?;

        info!(issue_id = issue_id, "Issue modified successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATES: &str = r#"{
        "issues": [{"summary": "", "project": {"name": "Ops"}}],
        "updates": [{"notes": [{"text": "", "view_state": {"name": "public"}}]}]
    }"#;

    #[test]
    fn test_issue_payload_sets_summary() {
        let templates = IssueTemplates::from_json(TEMPLATES).unwrap();
        let payload = templates.issue_payload("Disk full on db01");
        assert_eq!(payload["summary"], "Disk full on db01");
        assert_eq!(payload["project"]["name"], "Ops");
    }

    #[test]
    fn test_note_payload_keeps_note_fields() {
        let templates = IssueTemplates::from_json(TEMPLATES).unwrap();
        let payload = templates.note_payload("still broken @jdoe @CSM");
        assert_eq!(payload["notes"][0]["text"], "still broken @jdoe @CSM");
        assert_eq!(payload["notes"][0]["view_state"]["name"], "public");
    }

    #[test]
    fn test_empty_templates_still_produce_payloads() {
        let templates = IssueTemplates::from_json("{}").unwrap();
        assert_eq!(templates.issue_payload("x")["summary"], "x");
        assert_eq!(templates.note_payload("y")["notes"][0]["text"], "y");
    }

    #[test]
    fn test_invalid_templates_are_configuration_errors() {
        assert!(matches!(
            IssueTemplates::from_json("not json"),
            Err(AppError::Configuration(_))
        ));
        assert!(matches!(
            IssueTemplates::from_json(r#"{"issues": ["summary"]}"#),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_url_building() {
        let client = MantisClient::new(
            "https://tracker.example.com/",
            "token",
            IssueTemplates::default(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.url("filters"), "https://tracker.example.com/api/rest/filters");
    }
}
