// src/pipeline.rs - Orchestrates one reconciliation job through its stages
use anyhow::{bail, Result};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::matching::engine::match_records_parallel;
use crate::matching::normalize::{normalize_rows, RawRecord};
use crate::matching::stats::SimilarityStats;
use crate::matching::weights::WeightVector;
use crate::models::progress::{PipelineStage, SessionId};
use crate::models::records::{MatchResult, Record};
use crate::progress::tracker::ProgressTracker;
use crate::refine::refiner::{RefineSummary, Refiner};
use crate::report::MatchReport;
use crate::utils::logging::PipelineLogger;

pub const DEFAULT_MIN_SCORE: f64 = 0.8;

pub struct PipelineInput {
    pub de_rows: Vec<RawRecord>,
    pub rast_rows: Vec<RawRecord>,
    pub weights: WeightVector,
    pub min_score: f64,
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub session_id: SessionId,
    pub results: Vec<MatchResult>,
    pub stats: SimilarityStats,
    /// `None` when no refiner was configured.
    pub refine_summary: Option<RefineSummary>,
    pub report: MatchReport,
}

#[derive(Debug)]
pub enum PipelineOutcome {
    Completed(PipelineOutput),
    Failed {
        session_id: SessionId,
        stage: PipelineStage,
        message: String,
    },
}

pub struct PipelineRunner {
    tracker: ProgressTracker,
    refiner: Option<Refiner>,
    match_workers: usize,
}

impl PipelineRunner {
    pub fn new(tracker: ProgressTracker, refiner: Option<Refiner>, match_workers: usize) -> Self {
        Self {
            tracker,
            refiner,
            match_workers: match_workers.max(1),
        }
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Runs the job to completion. Every failure is written to the tracker
    /// as a terminal error before it is returned.
    pub async fn run(&self, session_id: &SessionId, input: PipelineInput) -> PipelineOutcome {
        let logger = PipelineLogger::new(session_id.clone());
        let mut stage = PipelineStage::Parsing;

        match self.execute(session_id, input, &logger, &mut stage).await {
            Ok(output) => PipelineOutcome::Completed(output),
            Err(e) => {
                let message = e.to_string();
                logger.log_error(stage, &format!("{:#}", e));
                self.tracker.fail(session_id, &message).await;
                PipelineOutcome::Failed {
                    session_id: session_id.clone(),
                    stage,
                    message,
                }
            }
        }
    }

    async fn advance(
        &self,
        session_id: &SessionId,
        current: &mut PipelineStage,
        stage: PipelineStage,
        message: String,
        details: serde_json::Value,
    ) {
        *current = stage;
        self.tracker
            .update(session_id, stage, stage.milestone(), message, details)
            .await;
    }

    async fn execute(
        &self,
        session_id: &SessionId,
        input: PipelineInput,
        logger: &PipelineLogger,
        stage: &mut PipelineStage,
    ) -> Result<PipelineOutput> {
        let PipelineInput {
            de_rows,
            rast_rows,
            weights,
            min_score,
        } = input;
        logger.log_start(de_rows.len(), rast_rows.len(), min_score);

        // Parsing
        self.advance(
            session_id,
            stage,
            PipelineStage::Parsing,
            "Analisando arquivo...".to_string(),
            json!({ "deRows": de_rows.len(), "rastRows": rast_rows.len() }),
        )
        .await;
        logger.log_phase(PipelineStage::Parsing, None);
        if de_rows.is_empty() || rast_rows.is_empty() {
            bail!("Planilhas DE ou RASTREIO estão vazias");
        }
        if !min_score.is_finite() {
            bail!("minScore inválido: {}", min_score);
        }
        weights.normalized()?;

        // Normalizing
        self.advance(
            session_id,
            stage,
            PipelineStage::Normalizing,
            "Normalizando dados...".to_string(),
            json!({}),
        )
        .await;
        logger.log_phase(PipelineStage::Normalizing, None);
        let de_records = normalize_rows(&de_rows);
        let rast_records = normalize_rows(&rast_rows);
        if !has_urls(&de_records) || !has_urls(&rast_records) {
            bail!("Nenhuma URL encontrada nas planilhas DE ou RASTREIO");
        }

        // Similarities
        let message = format!(
            "Calculando similaridades: {} URLs DE vs {} URLs RASTREIO...",
            de_records.len(),
            rast_records.len()
        );
        self.advance(
            session_id,
            stage,
            PipelineStage::Similarities,
            message.clone(),
            json!({ "deCount": de_records.len(), "rastCount": rast_records.len() }),
        )
        .await;
        logger.log_phase(PipelineStage::Similarities, Some(&message));
        let results = match_records_parallel(
            Arc::new(de_records),
            Arc::new(rast_records),
            &weights,
            self.match_workers,
        )
        .await?;
        let stats = SimilarityStats::from_results(&results);
        logger.log_stats(&stats);
        self.tracker
            .update(
                session_id,
                PipelineStage::Similarities,
                PipelineStage::Similarities.milestone(),
                message,
                json!({ "stats": stats }),
            )
            .await;
        logger.log_memory(PipelineStage::Similarities).await;

        // Refining
        let (results, refine_summary) = match &self.refiner {
            Some(refiner) => {
                let (results, summary) = self
                    .refine_stage(session_id, stage, refiner, results, min_score, logger)
                    .await;
                (results, Some(summary))
            }
            None => (results, None),
        };

        // Generating
        self.advance(
            session_id,
            stage,
            PipelineStage::Generating,
            "Gerando planilha de resultado...".to_string(),
            json!({}),
        )
        .await;
        logger.log_phase(PipelineStage::Generating, None);
        let report = MatchReport::build(&results, min_score, stats.clone());

        // Completed
        self.advance(
            session_id,
            stage,
            PipelineStage::Completed,
            "Processamento concluído com sucesso!".to_string(),
            json!({ "totalResults": results.len(), "matched": report.matched_rows() }),
        )
        .await;
        logger.log_complete(results.len(), report.matched_rows());

        Ok(PipelineOutput {
            session_id: session_id.clone(),
            results,
            stats,
            refine_summary,
            report,
        })
    }

    async fn refine_stage(
        &self,
        session_id: &SessionId,
        stage: &mut PipelineStage,
        refiner: &Refiner,
        results: Vec<MatchResult>,
        min_score: f64,
        logger: &PipelineLogger,
    ) -> (Vec<MatchResult>, RefineSummary) {
        self.advance(
            session_id,
            stage,
            PipelineStage::Refining,
            "Aplicando inteligência artificial...".to_string(),
            json!({ "ranker": refiner.ranker_name() }),
        )
        .await;
        logger.log_phase(PipelineStage::Refining, Some(refiner.ranker_name()));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let refine = refiner.refine(results, min_score, Some(tx));
        let forward = async {
            while let Some(progress) = rx.recv().await {
                let percent = progress.percent();
                self.tracker
                    .update(
                        session_id,
                        PipelineStage::Refining,
                        PipelineStage::refining_percentage(percent),
                        format!("IA: {:.0}% concluído", percent),
                        json!({ "processed": progress.processed, "total": progress.total }),
                    )
                    .await;
            }
        };
        let ((results, summary), ()) = tokio::join!(refine, forward);

        logger.log_refine_summary(&summary);
        logger.log_memory(PipelineStage::Refining).await;
        (results, summary)
    }
}

fn has_urls(records: &[Record]) -> bool {
    records.iter().any(|r| !r.url.is_empty())
}
