use crate::api::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::metrics::{self, FORWARD_FAILURES_TOTAL, MESSAGES_RECEIVED_TOTAL};
use crate::models::{Attachment, InboundAlert, MessageRef};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Prometheus text exposition
pub async fn prometheus_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

/// Events API envelope
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        #[serde(default)]
        event_id: Option<String>,
        event: MessageEvent,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct MessageEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl MessageEvent {
    /// Convert a posted message into an alert; edits, deletions and other
    /// textless events yield nothing
    pub fn into_alert(self, event_id: Option<String>) -> Option<InboundAlert> {
        if self.kind != "message" {
            return None;
        }
        if matches!(
            self.subtype.as_deref(),
            Some("message_changed" | "message_deleted")
        ) {
            return None;
        }

        let mut alert = InboundAlert::new(self.text?, self.channel?, self.ts?)
            .with_author(self.user, self.bot_id);
        alert.attachments = self.attachments;
        alert.event_id = event_id;
        Some(alert)
    }
}

/// Slack Events API callback
pub async fn slack_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    verify_request(&state, &headers, &body)?;

    let envelope: EventEnvelope = serde_json::from_slice(&body)?;

    match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            Ok(Json(json!({ "challenge": challenge })).into_response())
        }
        EventEnvelope::EventCallback { event_id, event } => {
            let Some(alert) = event.into_alert(event_id) else {
                return Ok(StatusCode::OK.into_response());
            };

            if let Some(event_id) = &alert.event_id {
                if !state.deliveries.first_delivery(event_id).await {
                    MESSAGES_RECEIVED_TOTAL
                        .with_label_values(&["duplicate_delivery"])
                        .inc();
                    tracing::debug!(event_id = %event_id, "Dropping redelivered event");
                    return Ok(StatusCode::OK.into_response());
                }
            }

            tracing::info!(
                alert_id = %alert.id,
                channel = %alert.channel,
                ts = %alert.ts,
                "Received message"
            );
            state.dispatcher.dispatch(alert);
            Ok(StatusCode::OK.into_response())
        }
        EventEnvelope::Other => Ok(StatusCode::OK.into_response()),
    }
}

/// Interactivity payload for `block_actions`
#[derive(Debug, Deserialize)]
pub struct ActionPayload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub actions: Vec<BlockAction>,
    #[serde(default)]
    pub channel: Option<ChannelRef>,
    #[serde(default)]
    pub message: Option<ActionMessage>,
}

#[derive(Debug, Deserialize)]
pub struct BlockAction {
    pub action_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ChannelRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ActionMessage {
    pub ts: String,
}

impl ActionPayload {
    /// The message an action with `action_id` was clicked on, if any
    pub fn acknowledged_message(&self, action_id: &str) -> Option<MessageRef> {
        if self.kind != "block_actions" || !self.actions.iter().any(|a| a.action_id == action_id) {
            return None;
        }
        let channel = self.channel.as_ref()?;
        let message = self.message.as_ref()?;
        Some(MessageRef::new(channel.id.clone(), message.ts.clone()))
    }
}

/// Slack interactivity callback: the affordance button
pub async fn slack_actions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    verify_request(&state, &headers, &body)?;

    let raw = url::form_urlencoded::parse(&body)
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| AppError::Validation("missing payload field".to_string()))?;
    let payload: ActionPayload = serde_json::from_str(&raw)?;

    let action_id = state.forwarder.affordance().action_id.clone();
    if let Some(message) = payload.acknowledged_message(&action_id) {
        let forwarder = state.forwarder.clone();
        tokio::spawn(async move {
            if let Err(e) = forwarder.apply_resolution_marker(&message).await {
                FORWARD_FAILURES_TOTAL
                    .with_label_values(&["resolution_marker"])
                    .inc();
                tracing::error!(
                    channel = %message.channel,
                    ts = %message.ts,
                    error = %e,
                    "Failed to apply resolution marker"
                );
            }
        });
    }

    Ok(StatusCode::OK)
}

fn verify_request(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<()> {
    let Some(verifier) = &state.verifier else {
        return Ok(());
    };

    let timestamp = header_str(headers, TIMESTAMP_HEADER)?;
    let signature = header_str(headers, SIGNATURE_HEADER)?;
    verifier.verify(timestamp, signature, body, chrono::Utc::now().timestamp())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Authentication(format!("missing {} header", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_event_into_alert() {
        let envelope: EventEnvelope = serde_json::from_str(
            r#"{
                "type": "event_callback",
                "event_id": "Ev1",
                "event": {
                    "type": "message",
                    "subtype": "bot_message",
                    "text": "Triggered: Disk>",
                    "channel": "C1",
                    "ts": "1.1",
                    "attachments": [{"title": "Triggered: Disk full>"}]
                }
            }"#,
        )
        .unwrap();

        let EventEnvelope::EventCallback { event_id, event } = envelope else {
            panic!("expected event callback");
        };
        let alert = event.into_alert(event_id).unwrap();
        assert_eq!(alert.channel, "C1");
        assert_eq!(alert.event_id.as_deref(), Some("Ev1"));
        assert_eq!(alert.attachment_title(), Some("Triggered: Disk full>"));
    }

    #[test]
    fn test_edits_are_ignored() {
        let event: MessageEvent = serde_json::from_str(
            r#"{"type": "message", "subtype": "message_changed", "channel": "C1", "ts": "1.1"}"#,
        )
        .unwrap();
        assert!(event.into_alert(None).is_none());
    }

    #[test]
    fn test_bot_reply_keeps_author() {
        let event: MessageEvent = serde_json::from_str(
            r#"{
                "type": "message",
                "subtype": "bot_message",
                "text": "Matching issue: #41",
                "channel": "C5",
                "ts": "2.2",
                "thread_ts": "1.1",
                "user": "UBOT",
                "bot_id": "BBOT"
            }"#,
        )
        .unwrap();

        let alert = event.into_alert(None).unwrap();
        assert_eq!(alert.user.as_deref(), Some("UBOT"));
        assert_eq!(alert.bot_id.as_deref(), Some("BBOT"));
    }

    #[test]
    fn test_unknown_envelope_type() {
        let envelope: EventEnvelope =
            serde_json::from_str(r#"{"type": "app_rate_limited"}"#).unwrap();
        assert!(matches!(envelope, EventEnvelope::Other));
    }

    #[test]
    fn test_action_payload_targets_clicked_message() {
        let payload: ActionPayload = serde_json::from_str(
            r#"{
                "type": "block_actions",
                "actions": [{"action_id": "button_click"}],
                "channel": {"id": "C9"},
                "message": {"ts": "2.2"}
            }"#,
        )
        .unwrap();

        assert_eq!(
            payload.acknowledged_message("button_click"),
            Some(MessageRef::new("C9", "2.2"))
        );
        assert_eq!(payload.acknowledged_message("other"), None);
    }
}
