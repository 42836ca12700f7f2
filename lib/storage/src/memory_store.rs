use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use viaprox_core::{AddressRecord, Error, Filter, FilterExpr, Projection, Result, StorageReader};

use crate::snapshot::{read_dataset, write_dataset, SnapshotDescription};

/// In-memory row store that evaluates [`FilterExpr`] trees directly.
///
/// Rows are keyed by id in a `BTreeMap`, so `select` pages deterministically.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<RwLock<BTreeMap<String, AddressRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I: IntoIterator<Item = AddressRecord>>(records: I) -> Self {
        let store = Self::new();
        store.extend(records);
        store
    }

    /// Load rows from a `.json`, `.jsonl` or gzipped dataset file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let records: Vec<AddressRecord> =
            read_dataset(path).map_err(|e| Error::Storage(e.to_string()))?;
        info!(path = %path.display(), rows = records.len(), "loaded address dataset");
        Ok(Self::from_records(records))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<SnapshotDescription> {
        let rows = self.records();
        write_dataset(path.as_ref(), &rows).map_err(|e| Error::Storage(e.to_string()))
    }

    /// Insert or replace by id.
    pub fn insert(&self, record: AddressRecord) {
        self.rows.write().insert(record.id.clone(), record);
    }

    pub fn extend<I: IntoIterator<Item = AddressRecord>>(&self, records: I) {
        let mut rows = self.rows.write();
        for record in records {
            rows.insert(record.id.clone(), record);
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<AddressRecord> {
        self.rows.read().get(id).cloned()
    }

    /// Every row, ordered by id.
    pub fn records(&self) -> Vec<AddressRecord> {
        self.rows.read().values().cloned().collect()
    }
}

#[async_trait]
impl StorageReader for MemoryStore {
    fn name(&self) -> &str {
        "memory-store"
    }

    async fn count(&self, filter: &FilterExpr) -> Result<u64> {
        let rows = self.rows.read();
        let n = rows.values().filter(|r| filter.matches(r)).count() as u64;
        debug!(filter = %filter, count = n, "count");
        Ok(n)
    }

    async fn select(
        &self,
        projection: Projection,
        filter: &FilterExpr,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<AddressRecord>> {
        let rows = self.rows.read();
        let page: Vec<AddressRecord> = rows
            .values()
            .filter(|r| filter.matches(r))
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|r| r.clone().project(projection))
            .collect();
        debug!(filter = %filter, offset, returned = page.len(), "select");
        Ok(page)
    }

    async fn select_by_ids(&self, ids: &[String], projection: Projection) -> Result<Vec<AddressRecord>> {
        let rows = self.rows.read();
        Ok(ids
            .iter()
            .filter_map(|id| rows.get(id))
            .map(|r| r.clone().project(projection))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viaprox_core::Field;

    fn seed() -> MemoryStore {
        MemoryStore::from_records((1..=25).map(|i| {
            let mut r = AddressRecord::new(format!("{:03}", i), format!("kr 81 {} 30", 40 + i));
            r.via_code = Some(if i % 2 == 0 { "kr" } else { "carrera" }.to_string());
            r.primary_number = Some((40 + i) as f64);
            r.department = Some("cundinamarca".to_string());
            r
        }))
    }

    #[tokio::test]
    async fn test_count_and_page() {
        let store = seed();
        let filter = FilterExpr::range(Field::PrimaryNumber, 50.0, 60.0);
        assert_eq!(store.count(&filter).await.unwrap(), 11);

        let page = store.select(Projection::Full, &filter, Some(5), 10).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "020");
    }

    #[tokio::test]
    async fn test_summary_projection_drops_structure() {
        let store = seed();
        let page = store
            .select(Projection::Summary, &FilterExpr::match_all(), Some(1), 0)
            .await
            .unwrap();
        assert_eq!(page[0].id, "001");
        assert!(page[0].via_code.is_none());
        assert!(page[0].department.is_none());
    }

    #[tokio::test]
    async fn test_select_by_ids_skips_missing() {
        let store = seed();
        let ids = vec!["003".to_string(), "nope".to_string(), "001".to_string()];
        let rows = store.select_by_ids(&ids, Projection::Full).await.unwrap();
        let got: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(got, vec!["003", "001"]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        seed().save(&path).unwrap();
        let loaded = MemoryStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 25);
        assert_eq!(loaded.get("007").and_then(|r| r.primary_number), Some(47.0));
    }
}
