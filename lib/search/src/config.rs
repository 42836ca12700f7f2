use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `(max_radius, min_score)`: the first tier whose radius bound is not
/// exceeded sets the vector-search threshold.
pub type ScoreTier = (u32, f32);

/// Tuning for [`SearchOrchestrator`](crate::SearchOrchestrator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub embed_timeout_ms: u64,
    pub vector_timeout_ms: u64,
    pub storage_timeout_ms: u64,
    /// Candidates fetched per requested result.
    pub top_k_multiplier: u32,
    pub max_top_k: u32,
    /// Must be ordered by radius ascending.
    pub min_score_tiers: Vec<ScoreTier>,
    pub min_score_floor: f32,
    pub similar_results_cap: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            embed_timeout_ms: 10_000,
            vector_timeout_ms: 10_000,
            storage_timeout_ms: 5_000,
            top_k_multiplier: 3,
            max_top_k: 100,
            min_score_tiers: vec![(5, 0.8), (10, 0.7), (20, 0.6)],
            min_score_floor: 0.5,
            similar_results_cap: 100,
        }
    }
}

impl SearchConfig {
    #[inline]
    pub fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.embed_timeout_ms)
    }

    #[inline]
    pub fn vector_timeout(&self) -> Duration {
        Duration::from_millis(self.vector_timeout_ms)
    }

    #[inline]
    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }

    /// `min(limit * multiplier, max_top_k)`.
    pub fn top_k(&self, limit: u32) -> usize {
        limit.saturating_mul(self.top_k_multiplier).min(self.max_top_k) as usize
    }

    /// Tighter radius, stricter score.
    pub fn min_score(&self, radius: u32) -> f32 {
        self.min_score_tiers
            .iter()
            .find(|(max_radius, _)| radius <= *max_radius)
            .map(|(_, score)| *score)
            .unwrap_or(self.min_score_floor)
    }
}
