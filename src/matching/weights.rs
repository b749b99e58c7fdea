// src/matching/weights.rs
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Default field weights: slug, title, description, h1.
pub const DEFAULT_WEIGHTS: WeightVector = WeightVector {
    slug: 0.4,
    title: 0.25,
    description: 0.2,
    h1: 0.15,
};

/// Raw, caller-supplied field weights. Need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    pub slug: f64,
    pub title: f64,
    pub description: f64,
    pub h1: f64,
}

impl Default for WeightVector {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

/// Weights scaled to sum to 1. Only obtainable through [`WeightVector::normalized`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedWeights {
    pub slug: f64,
    pub title: f64,
    pub description: f64,
    pub h1: f64,
}

impl NormalizedWeights {
    pub fn sum(&self) -> f64 {
        self.slug + self.title + self.description + self.h1
    }
}

impl WeightVector {
    pub fn new(slug: f64, title: f64, description: f64, h1: f64) -> Self {
        Self {
            slug,
            title,
            description,
            h1,
        }
    }

    /// Accepts exactly four values in slug, title, description, h1 order.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        match values {
            [slug, title, description, h1] => Ok(Self::new(*slug, *title, *description, *h1)),
            _ => bail!(
                "Expected 4 weights (slug, title, description, h1), got {}",
                values.len()
            ),
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.slug, self.title, self.description, self.h1]
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Divides each weight by the total.
    ///
    /// Rejects negative or non-finite entries and a non-positive total.
    pub fn normalized(&self) -> Result<NormalizedWeights> {
        if let Some(bad) = self.as_array().iter().find(|w| !w.is_finite() || **w < 0.0) {
            bail!("Weights must be finite and non-negative, got {}", bad);
        }
        let sum = self.sum();
        if sum <= 0.0 {
            bail!("At least one weight must be positive");
        }
        Ok(NormalizedWeights {
            slug: self.slug / sum,
            title: self.title / sum,
            description: self.description / sum,
            h1: self.h1 / sum,
        })
    }
}
