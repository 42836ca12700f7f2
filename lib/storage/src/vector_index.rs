use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;
use viaprox_core::{Error, RegionFilter, Result, VectorEntry, VectorHit, VectorIndex};
use viaprox_similarity::cosine_score;

/// Brute-force cosine index held in memory.
///
/// Scores are cosine similarity mapped into [0, 1]. Every vector must share
/// the dimension of the first one inserted.
#[derive(Clone, Default)]
pub struct MemoryVectorIndex {
    entries: Arc<RwLock<AHashMap<String, VectorEntry>>>,
    dimension: Arc<RwLock<Option<usize>>>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        *self.dimension.read()
    }

    /// Every entry, ordered by id.
    pub fn entries(&self) -> Vec<VectorEntry> {
        let mut all: Vec<VectorEntry> = self.entries.read().values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Validates the whole batch before the first batch fixes the dimension.
    fn check_dimension(&self, entries: &[VectorEntry]) -> Result<()> {
        let Some(first) = entries.first() else {
            return Ok(());
        };
        let mut dim = self.dimension.write();
        let expected = dim.unwrap_or(first.vector.len());
        if let Some(entry) = entries.iter().find(|e| e.vector.len() != expected) {
            return Err(Error::Storage(format!(
                "vector {} has dimension {}, index expects {}",
                entry.id,
                entry.vector.len(),
                expected
            )));
        }
        *dim = Some(expected);
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    fn name(&self) -> &str {
        "memory-vector-index"
    }

    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<()> {
        self.check_dimension(&entries)?;
        let mut map = self.entries.write();
        for entry in entries {
            map.insert(entry.id.clone(), entry);
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        min_score: f32,
        region: Option<&RegionFilter>,
    ) -> Result<Vec<VectorHit>> {
        if let Some(d) = self.dimension() {
            if d != vector.len() {
                return Err(Error::Storage(format!(
                    "query vector has dimension {}, index expects {}",
                    vector.len(),
                    d
                )));
            }
        }

        let map = self.entries.read();
        let mut hits: Vec<VectorHit> = map
            .values()
            .filter(|e| region.map_or(true, |r| e.metadata.matches_region(r)))
            .map(|e| VectorHit {
                id: e.id.clone(),
                score: cosine_score(vector, &e.vector),
                metadata: e.metadata.clone(),
            })
            .filter(|h| h.score >= min_score)
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);

        debug!(
            candidates = map.len(),
            returned = hits.len(),
            top_k,
            min_score,
            "vector query"
        );
        Ok(hits)
    }
}
