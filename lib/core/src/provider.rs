//! Seams to the external collaborators of a search: the relational row
//! store, the embedding model and the vector index.
//!
//! All three are async and object-safe so the orchestrator can hold them as
//! `Arc<dyn ...>` and swap in test doubles.

use crate::error::Result;
use crate::filter::FilterExpr;
use crate::options::RegionFilter;
use crate::record::{AddressRecord, AddressSummary, Projection};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Read-only access to persisted address rows.
#[async_trait]
pub trait StorageReader: Send + Sync {
    fn name(&self) -> &str {
        "storage"
    }

    /// Number of rows matching `filter`.
    async fn count(&self, filter: &FilterExpr) -> Result<u64>;

    /// Rows matching `filter`, ordered by id, windowed by `offset`/`limit`.
    async fn select(
        &self,
        projection: Projection,
        filter: &FilterExpr,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<AddressRecord>>;

    /// Rows whose id is in `ids`. Missing ids are skipped, order is unspecified.
    async fn select_by_ids(&self, ids: &[String], projection: Projection) -> Result<Vec<AddressRecord>>;
}

/// Text -> fixed-dimension vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Descriptive fields stored next to each vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VectorMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_norm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_canonical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_code: Option<String>,
    /// Kept as text; index backends commonly store metadata as strings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_value: Option<String>,
}

impl VectorMetadata {
    pub fn from_record(record: &AddressRecord, canonical_via: Option<&str>) -> Self {
        Self {
            address_raw: Some(record.address_raw.clone()),
            address_norm: record.address_norm.clone(),
            address_canonical: record.address_canonical.clone(),
            municipality: record.municipality.clone(),
            neighborhood: record.neighborhood.clone(),
            via_code: canonical_via.map(str::to_string),
            transaction_value: record.transaction_value.map(|v| v.to_string()),
        }
    }

    /// Summary assembled from metadata alone, used when the row store cannot
    /// supply the record.
    pub fn to_summary(&self, id: &str) -> AddressSummary {
        AddressSummary {
            id: id.to_string(),
            address_raw: self
                .address_raw
                .clone()
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| "address unavailable".to_string()),
            address_norm: self.address_norm.clone(),
            address_canonical: self.address_canonical.clone(),
            municipality: self.municipality.clone(),
            neighborhood: self.neighborhood.clone(),
            transaction_value: self
                .transaction_value
                .as_deref()
                .and_then(|v| v.trim().parse::<f64>().ok()),
            private_area_m2: None,
            built_area_m2: None,
        }
    }

    pub fn matches_region(&self, region: &RegionFilter) -> bool {
        let eq = |want: &Option<String>, have: &Option<String>| match want {
            Some(w) => have.as_deref() == Some(w.as_str()),
            None => true,
        };
        eq(&region.municipality, &self.municipality) && eq(&region.neighborhood, &self.neighborhood)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: VectorMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: String,
    /// In [0, 1], higher is closer.
    pub score: f32,
    pub metadata: VectorMetadata,
}

/// Nearest-neighbour index over address embeddings.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn name(&self) -> &str;

    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<()>;

    /// Up to `top_k` hits with `score >= min_score`, best first.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        min_score: f32,
        region: Option<&RegionFilter>,
    ) -> Result<Vec<VectorHit>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_from_metadata() {
        let meta = VectorMetadata {
            municipality: Some("cali".to_string()),
            transaction_value: Some("350000000".to_string()),
            ..Default::default()
        };
        let summary = meta.to_summary("v9");
        assert_eq!(summary.id, "v9");
        assert_eq!(summary.address_raw, "address unavailable");
        assert_eq!(summary.transaction_value, Some(350_000_000.0));
        assert_eq!(summary.municipality.as_deref(), Some("cali"));
    }

    #[test]
    fn test_region_match() {
        let meta = VectorMetadata {
            municipality: Some("bogotá".to_string()),
            neighborhood: Some("chapinero".to_string()),
            ..Default::default()
        };
        let mut region = RegionFilter {
            municipality: Some("bogotá".to_string()),
            neighborhood: None,
        };
        assert!(meta.matches_region(&region));
        region.neighborhood = Some("usaquén".to_string());
        assert!(!meta.matches_region(&region));
    }

    #[test]
    fn test_metadata_from_record_carries_canonical_code() {
        let mut record = AddressRecord::new("a", "CARRERA 7 # 72-10");
        record.via_code = Some("carrera".to_string());
        record.transaction_value = Some(1.5e8);
        let meta = VectorMetadata::from_record(&record, Some("kr"));
        assert_eq!(meta.via_code.as_deref(), Some("kr"));
        assert_eq!(meta.address_raw.as_deref(), Some("CARRERA 7 # 72-10"));
        assert_eq!(meta.transaction_value.as_deref(), Some("150000000"));
    }
}
