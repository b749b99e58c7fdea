// src/report.rs - Result artifact: one row per DE record with its best match
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::matching::stats::SimilarityStats;
use crate::models::records::MatchResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub de_url: String,
    pub de_slug: String,
    pub match_url: Option<String>,
    pub match_slug: Option<String>,
    pub score: Option<f64>,
    pub gemini_score: Option<f64>,
    pub final_score: Option<f64>,
    pub effective_score: Option<f64>,
    pub reason: Option<String>,
    /// Best candidate's effective score is at least `min_score`.
    pub meets_threshold: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    pub min_score: f64,
    pub stats: SimilarityStats,
    pub rows: Vec<ReportRow>,
}

impl MatchReport {
    pub fn build(results: &[MatchResult], min_score: f64, stats: SimilarityStats) -> Self {
        let rows = results
            .iter()
            .map(|result| {
                let best = result.best();
                let effective = best.map(|c| c.effective_score());
                ReportRow {
                    de_url: result.de.url.clone(),
                    de_slug: result.de.slug.clone(),
                    match_url: best.map(|c| c.record.url.clone()),
                    match_slug: best.map(|c| c.record.slug.clone()),
                    score: best.map(|c| c.score),
                    gemini_score: best.and_then(|c| c.gemini_score),
                    final_score: best.and_then(|c| c.final_score),
                    effective_score: effective,
                    reason: best.and_then(|c| c.reason.clone()),
                    meets_threshold: effective.is_some_and(|s| s >= min_score),
                }
            })
            .collect();

        Self {
            min_score,
            stats,
            rows,
        }
    }

    pub fn matched_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.meets_threshold).count()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))
    }
}
