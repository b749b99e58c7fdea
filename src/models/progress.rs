// src/models/progress.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque token joining one pipeline run to its progress readers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// `session_<unix millis>_<9 hex chars>`
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "session_{}_{}",
            Utc::now().timestamp_millis(),
            &suffix[..9]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Named stages of a reconciliation job, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Parsing,
    Normalizing,
    Similarities,
    #[serde(rename = "gemini")]
    Refining,
    Generating,
    Completed,
    Error,
}

impl PipelineStage {
    /// Fixed percentage written when the stage starts.
    pub fn milestone(&self) -> f64 {
        match self {
            PipelineStage::Parsing => 10.0,
            PipelineStage::Normalizing => 20.0,
            PipelineStage::Similarities => 40.0,
            PipelineStage::Refining => REFINING_START,
            PipelineStage::Generating => REFINING_END,
            PipelineStage::Completed => 100.0,
            PipelineStage::Error => 0.0,
        }
    }

    /// Maps the refiner's own 0..=100 progress onto the 50..=90 band.
    pub fn refining_percentage(refiner_percent: f64) -> f64 {
        let clamped = refiner_percent.clamp(0.0, 100.0);
        REFINING_START + clamped * (REFINING_END - REFINING_START) / 100.0
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Parsing => "parsing",
            PipelineStage::Normalizing => "normalizing",
            PipelineStage::Similarities => "similarities",
            PipelineStage::Refining => "gemini",
            PipelineStage::Generating => "generating",
            PipelineStage::Completed => "completed",
            PipelineStage::Error => "error",
        }
    }
}

const REFINING_START: f64 = 50.0;
const REFINING_END: f64 = 90.0;

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Processing,
    Completed,
    Error,
}

impl ProgressStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressStatus::Completed | ProgressStatus::Error)
    }
}

/// The single live progress entry of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub session_id: SessionId,
    pub step: PipelineStage,
    pub percentage: u8,
    pub message: String,
    pub details: serde_json::Value,
    pub status: ProgressStatus,
    pub timestamp: DateTime<Utc>,
}

impl ProgressRecord {
    /// Builds a record, deriving status from stage and percentage.
    ///
    /// The error stage is always `error`. Only a raw percentage of at least
    /// 100 is `completed`; anything below stays `processing` and reports at
    /// most 99.
    pub fn new(
        session_id: SessionId,
        step: PipelineStage,
        percentage: f64,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        let (status, percentage) = if step == PipelineStage::Error {
            (ProgressStatus::Error, round_percentage(percentage))
        } else if percentage >= 100.0 {
            (ProgressStatus::Completed, 100)
        } else {
            (ProgressStatus::Processing, round_percentage(percentage).min(99))
        };
        Self {
            session_id,
            step,
            percentage,
            message: message.into(),
            details,
            status,
            timestamp: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

fn round_percentage(percentage: f64) -> u8 {
    if percentage.is_nan() {
        return 0;
    }
    percentage.clamp(0.0, 100.0).round() as u8
}
