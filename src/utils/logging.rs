// src/utils/logging.rs - Stage-scoped logging helpers for the reconciliation pipeline
use log::{debug, error, info, warn};
use std::time::Instant;
use tokio::task::JoinHandle;

use crate::matching::stats::SimilarityStats;
use crate::models::progress::{PipelineStage, SessionId};
use crate::refine::refiner::RefineSummary;
use crate::utils::get_memory_usage;

#[derive(Clone)]
pub struct PipelineLogger {
    session_id: SessionId,
    start_time: Instant,
}

fn stage_tag(stage: PipelineStage) -> (&'static str, &'static str) {
    match stage {
        PipelineStage::Parsing => ("PARSING", "📄"),
        PipelineStage::Normalizing => ("NORMALIZING", "🧹"),
        PipelineStage::Similarities => ("SIMILARITIES", "🧮"),
        PipelineStage::Refining => ("AI", "🤖"),
        PipelineStage::Generating => ("GENERATING", "📝"),
        PipelineStage::Completed => ("COMPLETED", "✅"),
        PipelineStage::Error => ("ERROR", "❌"),
    }
}

impl PipelineLogger {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, de_rows: usize, rast_rows: usize, min_score: f64) {
        info!(
            "🚀 Starting reconciliation {} ({} DE rows vs {} RASTREIO rows, minScore {:.2})",
            self.session_id, de_rows, rast_rows, min_score
        );
    }

    pub fn log_phase(&self, stage: PipelineStage, details: Option<&str>) {
        let (name, emoji) = stage_tag(stage);
        let elapsed = self.start_time.elapsed().as_secs_f32();
        match details {
            Some(details) => info!("[{}] {} 🔄 {} [+{:.1}s]", name, emoji, details, elapsed),
            None => info!("[{}] {} 🔄 Stage started [+{:.1}s]", name, emoji, elapsed),
        }
    }

    pub fn log_stats(&self, stats: &SimilarityStats) {
        let (name, emoji) = stage_tag(PipelineStage::Similarities);
        info!(
            "[{}] {} 📈 {} comparisons: avg {:.3}, max {:.3}, min {:.3}, {} >= 0.8, {} >= 0.9",
            name,
            emoji,
            stats.total_comparisons,
            stats.average_score,
            stats.max_score,
            stats.min_score,
            stats.scores_above_80,
            stats.scores_above_90
        );
    }

    pub fn log_refine_summary(&self, summary: &RefineSummary) {
        let (name, emoji) = stage_tag(PipelineStage::Refining);
        info!(
            "[{}] {} ✅ Refinement complete: {} successful, {} errors, {} skipped",
            name, emoji, summary.successful, summary.errors, summary.skipped
        );
        if summary.breaker_tripped {
            warn!(
                "[{}] {} ⚠️ Circuit breaker tripped; later records kept their similarity scores",
                name, emoji
            );
        }
    }

    pub async fn log_memory(&self, stage: PipelineStage) {
        let (name, emoji) = stage_tag(stage);
        let memory_mb = get_memory_usage().await;
        debug!("[{}] {} 💾 Memory usage: {} MB", name, emoji, memory_mb);
    }

    pub fn log_complete(&self, results: usize, matched: usize) {
        info!(
            "✅ Reconciliation {} finished in {:.2}s: {} DE rows, {} above threshold",
            self.session_id,
            self.start_time.elapsed().as_secs_f64(),
            results,
            matched
        );
    }

    pub fn log_error(&self, stage: PipelineStage, message: &str) {
        let (name, emoji) = stage_tag(stage);
        error!(
            "[{}] {} Reconciliation {} failed after {:.2}s: {}",
            name,
            emoji,
            self.session_id,
            self.start_time.elapsed().as_secs_f64(),
            message
        );
    }
}

/// Awaits a background task; a panic or cancellation is logged, not propagated.
pub async fn join_logged<T>(task: JoinHandle<T>, name: &str) -> Option<T> {
    match task.await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{} task failed: {}", name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_logged_returns_value() {
        let task = tokio::spawn(async { 42 });
        assert_eq!(join_logged(task, "answer").await, Some(42));
    }

    #[tokio::test]
    async fn test_join_logged_swallows_panic() {
        let task: JoinHandle<()> = tokio::spawn(async { panic!("progress bar exploded") });
        assert_eq!(join_logged(task, "Progress display").await, None);
    }

    #[tokio::test]
    async fn test_join_logged_swallows_cancellation() {
        let task = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        });
        task.abort();
        assert_eq!(join_logged(task, "Progress display").await, None);
    }
}
