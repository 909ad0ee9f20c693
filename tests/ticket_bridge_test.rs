/// Integration tests for the ticket bridge: filter selection, ticket lookup,
/// note/creation paths and threaded replies.
mod common;

use alert_relay::integrations::TicketBridge;
use alert_relay::metrics::FORWARD_FAILURES_TOTAL;
use alert_relay::models::{InboundAlert, TicketOutcome};
use alert_relay::processing::TicketWorker;
use common::{issue, FakeTracker, RecordingChat};
use std::sync::Arc;

const SUMMARY: &str = "Disk usage above 90% on db01";

fn tracker() -> FakeTracker {
    FakeTracker::default()
        .with_filter(3, "web", vec![issue(11, "web down", Some("alice"))])
        .with_filter(
            7,
            "db01",
            vec![
                issue(40, "Disk usage above 80% on db01", Some("bob")),
                issue(41, SUMMARY, Some("jdoe")),
            ],
        )
}

#[tokio::test]
async fn test_matching_ticket_gets_note_and_reply() {
    let tracker = Arc::new(tracker());
    let chat = Arc::new(RecordingChat::new());
    let bridge = TicketBridge::new(tracker.clone(), ["C5"]).with_thread_replies(chat.clone());

    let outcome = bridge
        .handle(&InboundAlert::new(SUMMARY, "C5", "1700.01"))
        .await
        .unwrap();

    assert!(matches!(outcome, TicketOutcome::NoteAppended(ref t) if t.id == 41));
    assert_eq!(
        tracker.notes.lock().as_slice(),
        &[(41, format!("{} @jdoe @CSM", SUMMARY))]
    );

    let posts = chat.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].channel, "C5");
    assert_eq!(posts[0].thread_ts.as_deref(), Some("1700.01"));
    assert_eq!(posts[0].text, "Matching issue: #41");
}

#[tokio::test]
async fn test_unmatched_summary_creates_ticket() {
    let tracker = Arc::new(tracker());
    let chat = Arc::new(RecordingChat::new());
    let bridge = TicketBridge::new(tracker.clone(), ["C5"]).with_thread_replies(chat.clone());
    let text = "Disk usage above 95% on db01";

    let outcome = bridge.handle(&InboundAlert::new(text, "C5", "1.1")).await.unwrap();

    assert_eq!(outcome, TicketOutcome::Created);
    assert_eq!(tracker.created.lock().as_slice(), &[text.to_string()]);
    assert!(tracker.notes.lock().is_empty());
    assert_eq!(
        chat.posts()[0].text,
        format!("No issues found for {}; created a new ticket", text)
    );
}

#[tokio::test]
async fn test_first_matching_filter_wins() {
    let tracker = Arc::new(tracker());
    let bridge = TicketBridge::new(tracker.clone(), ["C5"]);

    let filter = bridge
        .find_filter("web frontend on db01 unreachable")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(filter.id, 3);
}

#[tokio::test]
async fn test_no_filter_means_no_action_and_no_reply() {
    let tracker = Arc::new(tracker());
    let chat = Arc::new(RecordingChat::new());
    let bridge = TicketBridge::new(tracker.clone(), ["C5"]).with_thread_replies(chat.clone());

    let outcome = bridge
        .handle(&InboundAlert::new("queue backlog growing", "C5", "1.1"))
        .await
        .unwrap();

    assert_eq!(outcome, TicketOutcome::NoFilter);
    assert!(tracker.created.lock().is_empty());
    assert_eq!(chat.post_count(), 0);
}

#[tokio::test]
async fn test_tracker_failure_is_reported() {
    let tracker = Arc::new(FakeTracker {
        unavailable: true,
        ..FakeTracker::default()
    });
    let bridge = TicketBridge::new(tracker, ["C5"]);

    let result = bridge.handle(&InboundAlert::new(SUMMARY, "C5", "1.1")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_worker_keeps_running_after_failures() {
    let tracker = Arc::new(tracker());
    let bridge = Arc::new(TicketBridge::new(tracker.clone(), ["C5"]));
    let (queue, handle) = TicketWorker::new(bridge).spawn(8);

    queue.submit(InboundAlert::new("nothing relevant", "C5", "1.1")).unwrap();
    queue.submit(InboundAlert::new(SUMMARY, "C5", "1.2")).unwrap();
    drop(queue);

    handle.await.unwrap();
    assert_eq!(tracker.notes.lock().len(), 1);
}

#[tokio::test]
async fn test_failed_reply_is_counted_and_ticket_kept() {
    let tracker = Arc::new(tracker());
    let bridge = TicketBridge::new(tracker.clone(), ["C5"]).with_thread_replies(Arc::new(RecordingChat::failing()));
    let failures = FORWARD_FAILURES_TOTAL.with_label_values(&["ticket_reply"]);
    let before = failures.get();

    let outcome = bridge
        .handle(&InboundAlert::new(SUMMARY, "C5", "1.1"))
        .await
        .unwrap();

    assert!(matches!(outcome, TicketOutcome::NoteAppended(ref t) if t.id == 41));
    assert_eq!(tracker.notes.lock().len(), 1);
    assert!(failures.get() >= before + 1.0);
}
