// src/models/records.rs
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One URL row from either sheet, after normalization.
///
/// DE rows and RASTREIO rows share this shape. Field names match the
/// spreadsheet column headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub url: String,
    pub slug: String,
    pub meta_title: String,
    pub meta_description: String,
    pub h1: String,
}

/// Per-field similarity components kept on a candidate for explainability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldScores {
    pub slug_score: f64,
    pub title_score: f64,
    pub desc_score: f64,
    pub h1_score: f64,
}

/// A RASTREIO record scored against one DE record.
///
/// Created by the match engine with `score` and `details`. The refiner may
/// add `gemini_score`, `reason` and `final_score`; nothing is ever removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(flatten)]
    pub record: Record,
    pub score: f64,
    pub details: FieldScores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f64>,
}

impl Candidate {
    pub fn new(record: Record, score: f64, details: FieldScores) -> Self {
        Self {
            record,
            score,
            details,
            gemini_score: None,
            reason: None,
            final_score: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.record.url
    }

    /// `final_score` once refined, raw `score` otherwise.
    pub fn effective_score(&self) -> f64 {
        self.final_score.unwrap_or(self.score)
    }

    /// Attaches an AI score and recomputes the merged final score.
    pub fn apply_ai_score(&mut self, ai_score: f64, reason: impl Into<String>) {
        self.gemini_score = Some(ai_score);
        self.reason = Some(reason.into());
        self.final_score = Some((self.score + ai_score) / 2.0);
    }
}

/// All candidates for one DE record, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub de: Record,
    pub candidates: Vec<Candidate>,
}

impl MatchResult {
    pub fn new(de: Record, mut candidates: Vec<Candidate>) -> Self {
        sort_by_effective_score(&mut candidates);
        Self { de, candidates }
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn is_refined(&self) -> bool {
        self.candidates.iter().any(|c| c.final_score.is_some())
    }
}

/// Stable descending sort on effective score; ties keep input order.
pub fn sort_by_effective_score(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| descending(a.effective_score(), b.effective_score()));
}

/// Stable descending sort on the raw similarity score.
pub fn sort_by_score(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| descending(a.score, b.score));
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}
