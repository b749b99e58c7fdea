// src/refine/ranker.rs - The external AI ranking capability
use anyhow::Result;
use async_trait::async_trait;

use crate::models::records::{Candidate, Record};

/// Something that can judge how well a short list of candidates matches a
/// DE record. Implementations return the raw model text; decoding happens
/// in [`crate::refine::response`].
#[async_trait]
pub trait RankingCapability: Send + Sync {
    fn name(&self) -> &str;

    /// `false` when the backend is disabled or unconfigured. The refiner
    /// then skips AI refinement without counting errors.
    fn is_available(&self) -> bool {
        true
    }

    async fn rank(&self, de: &Record, candidates: &[Candidate]) -> Result<String>;
}
