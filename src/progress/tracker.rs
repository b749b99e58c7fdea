// src/progress/tracker.rs - Per-session progress store shared by the pipeline and its readers
use log::debug;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::progress::{PipelineStage, ProgressRecord, SessionId};

/// One live [`ProgressRecord`] per session.
///
/// An entry appears on the first write and is removed by the first
/// [`poll`](ProgressTracker::poll) that sees a terminal status.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    store: Arc<Mutex<HashMap<SessionId, ProgressRecord>>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the session's record. A percentage of 100 marks it completed.
    pub async fn update(
        &self,
        session_id: &SessionId,
        step: PipelineStage,
        percentage: f64,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> ProgressRecord {
        let record = ProgressRecord::new(session_id.clone(), step, percentage, message, details);
        debug!(
            "Progress [{}]: {}% - {}",
            session_id, record.percentage, record.message
        );
        self.store
            .lock()
            .await
            .insert(session_id.clone(), record.clone());
        record
    }

    /// Writes the terminal error record: step `error`, 0%, `Erro: <message>`.
    pub async fn fail(&self, session_id: &SessionId, message: &str) -> ProgressRecord {
        self.update(
            session_id,
            PipelineStage::Error,
            0.0,
            format!("Erro: {}", message),
            json!({ "error": message }),
        )
        .await
    }

    /// Reads the session's record, removing it if it is terminal.
    ///
    /// Read and removal happen under one lock, so only one caller ever
    /// observes a given terminal record.
    pub async fn poll(&self, session_id: &SessionId) -> Option<ProgressRecord> {
        let mut store = self.store.lock().await;
        let record = store.get(session_id)?.clone();
        if record.is_terminal() {
            store.remove(session_id);
        }
        Some(record)
    }

    /// Reads without consuming a terminal record.
    pub async fn peek(&self, session_id: &SessionId) -> Option<ProgressRecord> {
        self.store.lock().await.get(session_id).cloned()
    }

    pub async fn active_sessions(&self) -> usize {
        self.store.lock().await.len()
    }
}
