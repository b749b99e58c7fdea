// src/progress/poller.rs - Streams a session's progress changes to one consumer
use log::debug;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::models::progress::{ProgressRecord, SessionId};
use crate::progress::tracker::ProgressTracker;

/// One message on a progress stream.
///
/// Serializes as `{"type":"connected","sessionId":...}` or as the bare
/// progress record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProgressEvent {
    Connected(ConnectedEvent),
    Progress(ProgressRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedEvent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub session_id: SessionId,
}

impl ProgressEvent {
    pub fn connected(session_id: SessionId) -> Self {
        ProgressEvent::Connected(ConnectedEvent {
            kind: "connected",
            session_id,
        })
    }
}

#[derive(Clone)]
pub struct ProgressPoller {
    tracker: ProgressTracker,
    interval: Duration,
}

impl ProgressPoller {
    pub fn new(tracker: ProgressTracker, interval: Duration) -> Self {
        Self { tracker, interval }
    }

    /// Starts polling `session_id` every `interval`.
    ///
    /// The receiver gets a connected event, then one event per changed
    /// record, and closes after a terminal record. Dropping the receiver
    /// stops the polling task; the job itself keeps running.
    pub fn subscribe(&self, session_id: SessionId) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel(16);
        let tracker = self.tracker.clone();
        let interval = self.interval;

        tokio::spawn(async move {
            if tx.send(ProgressEvent::connected(session_id.clone())).await.is_err() {
                return;
            }

            let mut ticker = tokio::time::interval(interval);
            let mut last_sent: Option<ProgressRecord> = None;
            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    debug!("Progress consumer for {} went away", session_id);
                    return;
                }

                let Some(record) = tracker.poll(&session_id).await else {
                    continue;
                };
                let terminal = record.is_terminal();
                if last_sent.as_ref() != Some(&record) {
                    if tx.send(ProgressEvent::Progress(record.clone())).await.is_err() {
                        return;
                    }
                    last_sent = Some(record);
                }
                if terminal {
                    debug!("Progress stream for {} closed", session_id);
                    return;
                }
            }
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::progress::{PipelineStage, ProgressStatus};
    use serde_json::json;

    #[tokio::test]
    async fn test_stream_connects_then_closes_on_terminal() {
        let tracker = ProgressTracker::new();
        let sid = SessionId::from("session_9_xyz");
        let poller = ProgressPoller::new(tracker.clone(), Duration::from_millis(5));
        let mut rx = poller.subscribe(sid.clone());

        let first = rx.recv().await.unwrap();
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            json!({ "type": "connected", "sessionId": "session_9_xyz" })
        );

        tracker
            .update(&sid, PipelineStage::Parsing, 10.0, "Analisando arquivo...", json!({}))
            .await;
        let ProgressEvent::Progress(record) = rx.recv().await.unwrap() else {
            panic!("expected progress event");
        };
        assert_eq!(record.percentage, 10);

        tracker
            .update(&sid, PipelineStage::Completed, 100.0, "Processamento concluído com sucesso!", json!({}))
            .await;
        let mut last = None;
        while let Some(event) = rx.recv().await {
            last = Some(event);
        }
        let Some(ProgressEvent::Progress(record)) = last else {
            panic!("expected terminal progress event");
        };
        assert_eq!(record.status, ProgressStatus::Completed);
        assert!(tracker.peek(&sid).await.is_none());
    }

    #[tokio::test]
    async fn test_unchanged_record_sent_once() {
        let tracker = ProgressTracker::new();
        let sid = SessionId::from("s");
        tracker
            .update(&sid, PipelineStage::Normalizing, 20.0, "Normalizando dados...", json!({}))
            .await;
        let poller = ProgressPoller::new(tracker.clone(), Duration::from_millis(2));
        let mut rx = poller.subscribe(sid.clone());

        assert!(matches!(rx.recv().await, Some(ProgressEvent::Connected(_))));
        assert!(matches!(rx.recv().await, Some(ProgressEvent::Progress(_))));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dropped_consumer_leaves_job_state_alone() {
        let tracker = ProgressTracker::new();
        let sid = SessionId::from("s");
        let poller = ProgressPoller::new(tracker.clone(), Duration::from_millis(2));
        drop(poller.subscribe(sid.clone()));

        tracker
            .update(&sid, PipelineStage::Completed, 100.0, "done", json!({}))
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(tracker.peek(&sid).await.is_some());
    }
}
