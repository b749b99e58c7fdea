// src/matching/stats.rs
use serde::{Deserialize, Serialize};

use crate::models::records::MatchResult;

/// Aggregate view over every DE x RASTREIO score of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityStats {
    pub total_comparisons: usize,
    pub average_score: f64,
    pub max_score: f64,
    pub min_score: f64,
    pub scores_above_80: usize,
    pub scores_above_90: usize,
}

impl SimilarityStats {
    pub fn from_results(results: &[MatchResult]) -> Self {
        let scores: Vec<f64> = results
            .iter()
            .flat_map(|r| r.candidates.iter().map(|c| c.score))
            .collect();
        if scores.is_empty() {
            return Self::default();
        }

        let total = scores.len();
        Self {
            total_comparisons: total,
            average_score: scores.iter().sum::<f64>() / total as f64,
            max_score: scores.iter().copied().fold(f64::MIN, f64::max),
            min_score: scores.iter().copied().fold(f64::MAX, f64::min),
            scores_above_80: scores.iter().filter(|s| **s >= 0.8).count(),
            scores_above_90: scores.iter().filter(|s| **s >= 0.9).count(),
        }
    }
}
