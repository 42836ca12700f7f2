//! Turns candidate rows into ordered [`MatchResult`]s.

use crate::scorer::SimilarityScorer;
use std::cmp::Ordering;
use std::sync::Arc;
use viaprox_core::{AddressRecord, Gazetteer, MatchResult, NormalizedAddress};

/// Scores stored rows against a parsed query with the weighted rubric.
#[derive(Debug, Clone)]
pub struct Ranker {
    scorer: SimilarityScorer,
    gazetteer: Arc<Gazetteer>,
}

impl Ranker {
    pub fn new(scorer: SimilarityScorer, gazetteer: Arc<Gazetteer>) -> Self {
        Self { scorer, gazetteer }
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    /// Score one row. Stored via aliases are canonicalised before comparison.
    pub fn score(&self, query: &NormalizedAddress, record: &AddressRecord) -> MatchResult {
        let candidate = record.normalized(&self.gazetteer);
        MatchResult {
            address: record.summary(),
            similarity: self.scorer.similarity(query, &candidate),
            distance: self.scorer.distance(query, &candidate),
        }
    }

    /// Score every row and sort by similarity descending.
    pub fn rank(&self, query: &NormalizedAddress, records: &[AddressRecord]) -> Vec<MatchResult> {
        let mut results: Vec<MatchResult> = records.iter().map(|r| self.score(query, r)).collect();
        sort_matches(&mut results);
        results
    }
}

/// Similarity descending, then distance ascending. The sort is stable, so
/// fully tied entries keep their input order.
pub fn sort_matches(results: &mut [MatchResult]) {
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal))
    });
}
