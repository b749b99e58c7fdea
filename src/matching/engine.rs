// src/matching/engine.rs - DE x RASTREIO cross-product scoring
use anyhow::{Context, Result};
use futures::future::join_all;
use log::debug;
use std::sync::Arc;
use std::time::Instant;

use crate::matching::similarity::weighted_score;
use crate::matching::weights::{NormalizedWeights, WeightVector};
use crate::models::records::{sort_by_score, MatchResult, Record};

/// Scores one DE record against every RASTREIO record, best first.
pub fn score_de_record(de: &Record, rast_records: &[Record], weights: &NormalizedWeights) -> MatchResult {
    let mut candidates: Vec<_> = rast_records
        .iter()
        .map(|rast| weighted_score(de, rast, weights))
        .collect();
    sort_by_score(&mut candidates);
    MatchResult {
        de: de.clone(),
        candidates,
    }
}

/// Sequential cross-product match. Output order follows `de_records`.
pub fn match_records(
    de_records: &[Record],
    rast_records: &[Record],
    weights: &WeightVector,
) -> Result<Vec<MatchResult>> {
    let normalized = weights.normalized()?;
    Ok(de_records
        .iter()
        .map(|de| score_de_record(de, rast_records, &normalized))
        .collect())
}

/// Same result as [`match_records`], with DE records split across up to
/// `workers` blocking tasks.
pub async fn match_records_parallel(
    de_records: Arc<Vec<Record>>,
    rast_records: Arc<Vec<Record>>,
    weights: &WeightVector,
    workers: usize,
) -> Result<Vec<MatchResult>> {
    let normalized = weights.normalized()?;
    if de_records.is_empty() {
        return Ok(Vec::new());
    }

    let workers = workers.clamp(1, de_records.len());
    let chunk_size = de_records.len().div_ceil(workers);
    let start = Instant::now();

    let tasks = (0..de_records.len())
        .step_by(chunk_size)
        .map(|chunk_start| {
            let de_records = Arc::clone(&de_records);
            let rast_records = Arc::clone(&rast_records);
            tokio::task::spawn_blocking(move || {
                let chunk_end = (chunk_start + chunk_size).min(de_records.len());
                de_records[chunk_start..chunk_end]
                    .iter()
                    .map(|de| score_de_record(de, &rast_records, &normalized))
                    .collect::<Vec<_>>()
            })
        });

    let mut results = Vec::with_capacity(de_records.len());
    for chunk in join_all(tasks).await {
        results.extend(chunk.context("Scoring worker panicked")?);
    }

    debug!(
        "Scored {} x {} pairs on {} workers in {:.2?}",
        de_records.len(),
        rast_records.len(),
        workers,
        start.elapsed()
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, slug: &str, title: &str, h1: &str) -> Record {
        Record {
            url: url.to_string(),
            slug: slug.to_string(),
            meta_title: title.to_string(),
            meta_description: String::new(),
            h1: h1.to_string(),
        }
    }

    fn fixture() -> (Vec<Record>, Vec<Record>) {
        let de = vec![
            record("/a", "blusa-azul", "Blusa Azul", "Blusa"),
            record("/d", "tenis-corrida", "Tênis de Corrida", "Tênis"),
            record("/e", "mochila-couro", "Mochila de Couro", "Mochila"),
        ];
        let rast = vec![
            record("/b", "camiseta-azul", "Camiseta Azul", "Camiseta"),
            record("/c", "bermuda-jeans", "Bermuda", "Bermuda"),
            record("/f", "tenis-corrida-pro", "Tênis Corrida Pro", "Tênis"),
            record("/g", "bolsa-couro", "Bolsa de Couro", "Bolsa"),
        ];
        (de, rast)
    }

    #[test]
    fn test_every_de_gets_every_candidate_sorted() {
        let (de, rast) = fixture();
        let results = match_records(&de, &rast, &WeightVector::default()).unwrap();
        assert_eq!(results.len(), de.len());
        for (result, de_record) in results.iter().zip(&de) {
            assert_eq!(&result.de, de_record);
            assert_eq!(result.candidates.len(), rast.len());
            assert!(result
                .candidates
                .windows(2)
                .all(|w| w[0].score >= w[1].score));
        }
    }

    #[test]
    fn test_category_match_outranks_incompatible() {
        let (de, rast) = fixture();
        let results = match_records(&de[..1], &rast[..2], &WeightVector::new(0.4, 0.25, 0.2, 0.15)).unwrap();
        let candidates = &results[0].candidates;
        assert_eq!(candidates[0].url(), "/b");
        assert_eq!(candidates[1].url(), "/c");
        assert!(candidates[1].details.slug_score <= 0.1);
        assert_eq!(candidates[0].details.slug_score, 0.9);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let de = vec![record("/x", "", "", "")];
        let rast = vec![
            record("/1", "a", "", ""),
            record("/2", "b", "", ""),
            record("/3", "c", "", ""),
        ];
        let results = match_records(&de, &rast, &WeightVector::default()).unwrap();
        let urls: Vec<&str> = results[0].candidates.iter().map(|c| c.url()).collect();
        assert_eq!(urls, vec!["/1", "/2", "/3"]);
    }

    #[test]
    fn test_rejects_zero_weights() {
        let (de, rast) = fixture();
        assert!(match_records(&de, &rast, &WeightVector::new(0.0, 0.0, 0.0, 0.0)).is_err());
    }

    #[tokio::test]
    async fn test_parallel_matches_sequential() {
        let (de, rast) = fixture();
        let weights = WeightVector::default();
        let sequential = match_records(&de, &rast, &weights).unwrap();
        for workers in [1, 2, 3, 8] {
            let parallel = match_records_parallel(
                Arc::new(de.clone()),
                Arc::new(rast.clone()),
                &weights,
                workers,
            )
            .await
            .unwrap();
            assert_eq!(parallel, sequential, "workers = {}", workers);
        }
    }

    #[tokio::test]
    async fn test_parallel_empty_de() {
        let (_, rast) = fixture();
        let results = match_records_parallel(Arc::new(Vec::new()), Arc::new(rast), &WeightVector::default(), 4)
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
