//! Bulk ingestion of stored rows into the vector index.
//!
//! Rows are paged out of the store in batches. Each batch is embedded and
//! upserted as one unit, retried with exponential backoff, and counted as
//! failed (not aborted) once retries run out. Store, embedder and index
//! calls each carry their own timeout; an elapsed call is retried like any
//! other provider failure.

use crate::orchestrator::bounded;
use crate::text::{address_embedding_text, clean_for_embedding, EmbeddingFields};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use viaprox_core::{
    AddressRecord, EmbeddingProvider, FilterExpr, Gazetteer, Projection, Result, StorageReader, VectorEntry,
    VectorIndex, VectorMetadata,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationOptions {
    pub batch_size: usize,
    /// Attempts per batch, including the first.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Pause between batches.
    pub batch_pause_ms: u64,
    /// Only migrate the first `test_mode_limit` rows.
    pub test_mode: bool,
    pub test_mode_limit: u64,
    pub embed_timeout_ms: u64,
    pub upsert_timeout_ms: u64,
    pub storage_timeout_ms: u64,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_retries: 3,
            base_delay_ms: 1_000,
            batch_pause_ms: 2_000,
            test_mode: false,
            test_mode_limit: 100,
            embed_timeout_ms: 10_000,
            upsert_timeout_ms: 10_000,
            storage_timeout_ms: 5_000,
        }
    }
}

impl MigrationOptions {
    /// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.embed_timeout_ms)
    }

    pub fn upsert_timeout(&self) -> Duration {
        Duration::from_millis(self.upsert_timeout_ms)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationProgress {
    pub total: u64,
    pub processed: u64,
    pub failed: u64,
    pub percentage: f64,
    pub current_batch: u64,
    pub total_batches: u64,
}

impl MigrationProgress {
    fn update_percentage(&mut self) {
        self.percentage = if self.total == 0 {
            100.0
        } else {
            ((self.processed + self.failed) as f64 / self.total as f64 * 100.0).min(100.0)
        };
    }
}

pub struct VectorMigration {
    storage: Arc<dyn StorageReader>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    gazetteer: Arc<Gazetteer>,
}

impl VectorMigration {
    pub fn new(
        storage: Arc<dyn StorageReader>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        gazetteer: Arc<Gazetteer>,
    ) -> Self {
        Self {
            storage,
            embedder,
            index,
            gazetteer,
        }
    }

    pub async fn run(&self, options: &MigrationOptions) -> Result<MigrationProgress> {
        self.run_with_progress(options, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_batch` after every batch.
    ///
    /// Only the initial row count can fail the whole run; batch failures are
    /// reported through [`MigrationProgress::failed`].
    pub async fn run_with_progress<F>(&self, options: &MigrationOptions, mut on_batch: F) -> Result<MigrationProgress>
    where
        F: FnMut(&MigrationProgress),
    {
        let started = Instant::now();
        let batch_size = options.batch_size.max(1);
        let all = FilterExpr::match_all();

        let mut total = bounded(self.storage.name(), options.storage_timeout(), self.storage.count(&all)).await?;
        if options.test_mode {
            total = total.min(options.test_mode_limit);
        }
        let mut progress = MigrationProgress {
            total,
            total_batches: total.div_ceil(batch_size as u64),
            ..Default::default()
        };
        info!(
            total,
            batches = progress.total_batches,
            batch_size,
            test_mode = options.test_mode,
            embedder = self.embedder.name(),
            index = self.index.name(),
            "starting vector migration"
        );

        let mut offset = 0u64;
        while offset < total {
            let take = (total - offset).min(batch_size as u64) as usize;
            progress.current_batch += 1;

            let select = self.storage.select(Projection::Full, &all, Some(take), offset as usize);
            let rows = match bounded(self.storage.name(), options.storage_timeout(), select).await {
                Ok(rows) => rows,
                Err(e) => {
                    error!(batch = progress.current_batch, error = %e, "failed to read batch");
                    progress.failed += take as u64;
                    offset += take as u64;
                    progress.update_percentage();
                    on_batch(&progress);
                    continue;
                }
            };
            if rows.is_empty() {
                warn!(offset, "store returned fewer rows than counted, stopping");
                break;
            }

            let n = rows.len() as u64;
            match self.migrate_batch(&rows, options).await {
                Ok(()) => progress.processed += n,
                Err(e) => {
                    error!(batch = progress.current_batch, rows = n, error = %e, "batch failed after retries");
                    progress.failed += n;
                }
            }
            offset += n;
            progress.update_percentage();
            info!(
                batch = progress.current_batch,
                of = progress.total_batches,
                processed = progress.processed,
                failed = progress.failed,
                percentage = %format!("{:.1}", progress.percentage),
                "batch done"
            );
            on_batch(&progress);

            if offset < total && options.batch_pause_ms > 0 {
                tokio::time::sleep(Duration::from_millis(options.batch_pause_ms)).await;
            }
        }

        progress.update_percentage();
        info!(
            processed = progress.processed,
            failed = progress.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "vector migration finished"
        );
        Ok(progress)
    }

    fn entries_for(&self, rows: &[AddressRecord]) -> (Vec<String>, Vec<VectorMetadata>) {
        rows.iter()
            .map(|record| {
                let canonical = record
                    .via_code
                    .as_deref()
                    .and_then(|c| self.gazetteer.canonical_via(c))
                    .map(|c| c.as_str());
                let text = address_embedding_text(&EmbeddingFields::from_record(record, canonical));
                (clean_for_embedding(&text), VectorMetadata::from_record(record, canonical))
            })
            .unzip()
    }

    async fn migrate_batch(&self, rows: &[AddressRecord], options: &MigrationOptions) -> Result<()> {
        let (texts, metadata) = self.entries_for(rows);
        let attempts = options.max_retries.max(1);
        let mut attempt = 1;
        loop {
            match self.embed_and_upsert(rows, &texts, &metadata, options).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    let delay = options.backoff(attempt);
                    warn!(attempt, of = attempts, delay_ms = delay.as_millis() as u64, error = %e, "batch upsert failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn embed_and_upsert(
        &self,
        rows: &[AddressRecord],
        texts: &[String],
        metadata: &[VectorMetadata],
        options: &MigrationOptions,
    ) -> Result<()> {
        let vectors = bounded(self.embedder.name(), options.embed_timeout(), self.embedder.embed_batch(texts)).await?;
        let entries = rows
            .iter()
            .zip(vectors)
            .zip(metadata)
            .map(|((record, vector), meta)| VectorEntry {
                id: record.id.clone(),
                vector,
                metadata: meta.clone(),
            })
            .collect();
        bounded(self.index.name(), options.upsert_timeout(), self.index.upsert(entries)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use viaprox_core::{AddressParser, Error, RegionFilter, VectorHit};
    use viaprox_storage::{HashEmbedder, MemoryStore, MemoryVectorIndex};

    /// Fails the first `fail_first` upserts, then delegates.
    struct FlakyIndex {
        inner: MemoryVectorIndex,
        calls: AtomicUsize,
        fail_first: usize,
    }

    impl FlakyIndex {
        fn new(fail_first: usize) -> Self {
            Self {
                inner: MemoryVectorIndex::new(),
                calls: AtomicUsize::new(0),
                fail_first,
            }
        }
    }

    #[async_trait]
    impl VectorIndex for FlakyIndex {
        fn name(&self) -> &str {
            "flaky-index"
        }
        async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.fail_first {
                return Err(Error::unavailable("flaky-index", "503"));
            }
            self.inner.upsert(entries).await
        }
        async fn query(
            &self,
            vector: &[f32],
            top_k: usize,
            min_score: f32,
            region: Option<&RegionFilter>,
        ) -> Result<Vec<VectorHit>> {
            self.inner.query(vector, top_k, min_score, region).await
        }
    }

    /// Never completes an upsert.
    struct HangingIndex {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VectorIndex for HangingIndex {
        fn name(&self) -> &str {
            "hanging-index"
        }
        async fn upsert(&self, _entries: Vec<VectorEntry>) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
        async fn query(
            &self,
            _vector: &[f32],
            _top_k: usize,
            _min_score: f32,
            _region: Option<&RegionFilter>,
        ) -> Result<Vec<VectorHit>> {
            Ok(Vec::new())
        }
    }

    fn store(n: usize) -> Arc<MemoryStore> {
        let parser = AddressParser::default();
        Arc::new(MemoryStore::from_records((0..n).map(|i| {
            let raw = format!("carrera {} # {}-10 medellín", 10 + i, 20 + i);
            let mut record = AddressRecord::new(format!("r{:03}", i), raw.clone()).with_structure(&parser.parse(&raw));
            record.via_code = Some("carrera".to_string());
            record
        })))
    }

    fn fast(batch_size: usize) -> MigrationOptions {
        MigrationOptions {
            batch_size,
            base_delay_ms: 1,
            batch_pause_ms: 0,
            ..Default::default()
        }
    }

    fn migration(store: Arc<MemoryStore>, index: Arc<dyn VectorIndex>) -> VectorMigration {
        VectorMigration::new(store, Arc::new(HashEmbedder::new(32)), index, Arc::new(Gazetteer::default()))
    }

    #[test]
    fn test_backoff_doubles() {
        let options = MigrationOptions::default();
        assert_eq!(options.backoff(1), Duration::from_millis(1_000));
        assert_eq!(options.backoff(2), Duration::from_millis(2_000));
        assert_eq!(options.backoff(3), Duration::from_millis(4_000));
    }

    #[tokio::test]
    async fn test_migrates_every_row_with_canonical_metadata() {
        let index = Arc::new(MemoryVectorIndex::new());
        let mut seen = Vec::new();
        let progress = migration(store(7), index.clone())
            .run_with_progress(&fast(3), |p| seen.push(p.current_batch))
            .await
            .unwrap();

        assert_eq!(progress.total, 7);
        assert_eq!(progress.processed, 7);
        assert_eq!(progress.failed, 0);
        assert_eq!(progress.total_batches, 3);
        assert_eq!(progress.percentage, 100.0);
        assert_eq!(seen, vec![1, 2, 3]);

        let entries = index.entries();
        assert_eq!(entries.len(), 7);
        assert_eq!(entries[0].id, "r000");
        assert_eq!(entries[0].metadata.via_code.as_deref(), Some("kr"));
        assert_eq!(entries[0].vector.len(), 32);
    }

    #[tokio::test]
    async fn test_retry_recovers_transient_failure() {
        let index = Arc::new(FlakyIndex::new(2));
        let progress = migration(store(4), index.clone()).run(&fast(10)).await.unwrap();
        assert_eq!(progress.processed, 4);
        assert_eq!(progress.failed, 0);
        assert_eq!(index.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_batch_is_reported_and_run_continues() {
        // Batch 1 uses all three attempts; batch 2 succeeds first time.
        let index = Arc::new(FlakyIndex::new(3));
        let progress = migration(store(5), index.clone()).run(&fast(3)).await.unwrap();
        assert_eq!(progress.failed, 3);
        assert_eq!(progress.processed, 2);
        assert_eq!(progress.percentage, 100.0);
        assert_eq!(index.inner.len(), 2);
    }

    #[tokio::test]
    async fn test_hung_upsert_times_out_and_batch_fails() {
        let index = Arc::new(HangingIndex {
            calls: AtomicUsize::new(0),
        });
        let options = MigrationOptions {
            max_retries: 2,
            upsert_timeout_ms: 20,
            ..fast(10)
        };
        let progress = tokio::time::timeout(Duration::from_secs(5), migration(store(4), index.clone()).run(&options))
            .await
            .expect("migration blocked on a hung upsert")
            .unwrap();

        assert_eq!(progress.processed, 0);
        assert_eq!(progress.failed, 4);
        assert_eq!(progress.percentage, 100.0);
        // Each timeout is retried like any other provider failure.
        assert_eq!(index.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_timeout_defaults_match_search_config() {
        let options = MigrationOptions::default();
        assert_eq!(options.embed_timeout(), Duration::from_secs(10));
        assert_eq!(options.upsert_timeout(), Duration::from_secs(10));
        assert_eq!(options.storage_timeout(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_test_mode_caps_rows() {
        let options = MigrationOptions {
            test_mode: true,
            test_mode_limit: 4,
            ..fast(3)
        };
        let index = Arc::new(MemoryVectorIndex::new());
        let progress = migration(store(9), index.clone()).run(&options).await.unwrap();
        assert_eq!(progress.total, 4);
        assert_eq!(progress.processed, 4);
        assert_eq!(progress.total_batches, 2);
        assert_eq!(index.len(), 4);
    }

    #[tokio::test]
    async fn test_empty_store() {
        let progress = migration(store(0), Arc::new(MemoryVectorIndex::new()))
            .run(&fast(3))
            .await
            .unwrap();
        assert_eq!(progress.total, 0);
        assert_eq!(progress.total_batches, 0);
        assert_eq!(progress.percentage, 100.0);
    }
}
