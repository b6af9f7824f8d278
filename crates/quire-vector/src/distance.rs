//! Distance metrics for vector similarity.
//!
//! Every metric is exposed as a similarity score where higher means closer,
//! so search results can always be ordered best-first by descending score.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance metric used to compare vectors.
///
/// The metric is fixed when an index is built and recorded in the snapshot
/// manifest, so query vectors are always compared the same way the stored
/// vectors were.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine similarity. Range `[-1, 1]`, where 1 means identical direction.
    ///
    /// Best for: text embeddings.
    #[default]
    Cosine,

    /// Euclidean (L2) distance, reported as `1 / (1 + distance)`.
    ///
    /// Range `(0, 1]`, where 1 means identical vectors.
    Euclidean,

    /// Dot product (inner product). Higher is more similar.
    ///
    /// Best for: pre-normalized vectors.
    DotProduct,
}

impl DistanceMetric {
    /// Compute the similarity score between two vectors.
    ///
    /// Returns a score where **higher is more similar** for all metrics.
    /// Callers guarantee equal lengths.
    #[inline]
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

        match self {
            DistanceMetric::Cosine => cosine_similarity(a, b),
            DistanceMetric::Euclidean => 1.0 / (1.0 + euclidean_distance(a, b)),
            DistanceMetric::DotProduct => dot_product(a, b),
        }
    }

    /// Compute the raw distance between two vectors, lower meaning closer.
    #[inline]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

        match self {
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
            DistanceMetric::Euclidean => euclidean_distance(a, b),
            DistanceMetric::DotProduct => -dot_product(a, b),
        }
    }

    /// Get the name of this distance metric.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::DotProduct => "dot_product",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" | "cos" => Ok(DistanceMetric::Cosine),
            "euclidean" | "l2" | "euclid" => Ok(DistanceMetric::Euclidean),
            "dot" | "dot_product" | "dotproduct" | "inner" => Ok(DistanceMetric::DotProduct),
            _ => Err(format!("Unknown distance metric: {}", s)),
        }
    }
}

// ============================================================================
// Distance Functions
// ============================================================================

#[inline]
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = (norm_a * norm_b).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[inline]
fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

#[inline]
fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

// ============================================================================
// Tests
// ============================================================================
