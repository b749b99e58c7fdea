// src/refine/refiner.rs - AI re-ranking of the best candidates per DE record
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::models::records::{sort_by_score, Candidate, MatchResult, Record};
use crate::refine::ranker::RankingCapability;
use crate::refine::response::{fallback_scores, parse_ranking_response, AiScore, RankingOutcome};
use crate::utils::config::RefinerConfig;

/// Emitted after every DE record, whatever happened to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefineProgress {
    pub processed: usize,
    pub total: usize,
}

impl RefineProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.processed as f64 / self.total as f64 * 100.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineSummary {
    pub successful: usize,
    pub errors: usize,
    /// Records passed through without a ranker call.
    pub skipped: usize,
    pub breaker_tripped: bool,
}

pub struct Refiner {
    ranker: Arc<dyn RankingCapability>,
    config: RefinerConfig,
}

impl Refiner {
    pub fn new(ranker: Arc<dyn RankingCapability>, config: RefinerConfig) -> Self {
        Self { ranker, config }
    }

    pub fn ranker_name(&self) -> &str {
        self.ranker.name()
    }

    /// Re-ranks each result's top candidates with the ranking capability.
    ///
    /// Calls run one at a time, with `min_call_delay` between a successful
    /// call and the next one. Once more than `max_errors` calls have failed
    /// the remaining records pass through untouched. Output order follows
    /// `results`.
    pub async fn refine(
        &self,
        results: Vec<MatchResult>,
        min_score: f64,
        progress: Option<UnboundedSender<RefineProgress>>,
    ) -> (Vec<MatchResult>, RefineSummary) {
        let total = results.len();
        let mut summary = RefineSummary::default();
        let report = |processed: usize| {
            if let Some(tx) = &progress {
                // A dropped receiver only means nobody is watching.
                let _ = tx.send(RefineProgress { processed, total });
            }
        };

        if !self.ranker.is_available() {
            info!("Ranker '{}' not available, keeping similarity scores", self.ranker.name());
            summary.skipped = total;
            report(total);
            return (results, summary);
        }

        info!("🤖 Refining {} results with ranker '{}'...", total, self.ranker.name());
        let mut refined = Vec::with_capacity(total);
        let mut previous_call_succeeded = false;

        for (i, result) in results.into_iter().enumerate() {
            let top = select_top_candidates(&result, min_score, self.config.top_n);
            if summary.breaker_tripped || top.is_empty() {
                summary.skipped += 1;
                refined.push(result);
                report(i + 1);
                continue;
            }

            if previous_call_succeeded && !self.config.min_call_delay.is_zero() {
                tokio::time::sleep(self.config.min_call_delay).await;
            }
            previous_call_succeeded = false;

            let outcome = match self.ranker.rank(&result.de, &top).await {
                Ok(text) => match parse_ranking_response(&text, &top) {
                    RankingOutcome::Ranked(scores) => {
                        summary.successful += 1;
                        previous_call_succeeded = true;
                        merge_ai_scores(result, &scores)
                    }
                    RankingOutcome::Failed { reason } => {
                        warn!("Unusable ranker response for {}: {}", result.de.url, reason);
                        summary.errors += 1;
                        merge_ai_scores(result, &fallback_scores(&top, &reason))
                    }
                },
                Err(e) => {
                    warn!("Ranker call failed for {}: {:#}", result.de.url, e);
                    summary.errors += 1;
                    result
                }
            };
            refined.push(outcome);

            if summary.errors > self.config.max_errors && !summary.breaker_tripped {
                summary.breaker_tripped = true;
                warn!(
                    "⚠️ Too many ranker errors ({}), continuing without AI refinement",
                    summary.errors
                );
            }
            report(i + 1);
        }

        info!(
            "✅ AI refinement complete: {} successful, {} errors",
            summary.successful, summary.errors
        );
        (refined, summary)
    }

    /// Scores a caller-chosen candidate list for one DE record.
    ///
    /// Never fails: on any ranker problem each candidate gets its own score
    /// and a reason describing what went wrong. Input order is kept.
    pub async fn refine_one(&self, de: &Record, candidates: &[Candidate]) -> Vec<Candidate> {
        let scores = if !self.ranker.is_available() {
            fallback_scores(candidates, "Ranker not available")
        } else {
            match self.ranker.rank(de, candidates).await {
                Ok(text) => match parse_ranking_response(&text, candidates) {
                    RankingOutcome::Ranked(scores) => scores,
                    RankingOutcome::Failed { reason } => fallback_scores(candidates, &reason),
                },
                Err(e) => {
                    warn!("Ranker call failed for {}: {:#}", de.url, e);
                    fallback_scores(candidates, "Ranker error")
                }
            }
        };

        candidates
            .iter()
            .cloned()
            .map(|mut candidate| {
                if let Some(score) = scores.iter().find(|s| s.url == candidate.url()) {
                    candidate.apply_ai_score(score.gemini_score, score.reason.clone());
                }
                candidate
            })
            .collect()
    }
}

/// Candidates with `score >= min_score`, best first, at most `top_n`.
pub fn select_top_candidates(result: &MatchResult, min_score: f64, top_n: usize) -> Vec<Candidate> {
    let mut top: Vec<Candidate> = result
        .candidates
        .iter()
        .filter(|c| c.score >= min_score)
        .cloned()
        .collect();
    sort_by_score(&mut top);
    top.truncate(top_n);
    top
}

/// Applies AI scores by URL and re-sorts on effective score.
pub fn merge_ai_scores(result: MatchResult, scores: &[AiScore]) -> MatchResult {
    let MatchResult { de, candidates } = result;
    let candidates = candidates
        .into_iter()
        .map(|mut candidate| {
            if let Some(score) = scores.iter().find(|s| s.url == candidate.url()) {
                candidate.apply_ai_score(score.gemini_score, score.reason.clone());
            }
            candidate
        })
        .collect();
    MatchResult::new(de, candidates)
}
