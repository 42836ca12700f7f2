//! End-to-end proximity search.
//!
//! ```text
//! parse ──> vector (raw text) ──hits──> enrich + rank ──> paginate
//!               │ empty / error
//!               v
//!           vector (normalised text) ──hits──> enrich + rank ──> paginate
//!               │ empty            │ error
//!               v                  v
//!           empty result       structured (planner + storage)
//!                                  │ error
//!                                  v
//!                           CombinedSearchFailure
//! ```
//!
//! Every provider call is bounded by a timeout; a timeout counts as a
//! failure of that stage.

use crate::config::SearchConfig;
use crate::text::{address_embedding_text, clean_for_embedding, EmbeddingFields};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use viaprox_core::options::validate_paging;
use viaprox_core::{
    AddressPage, AddressParser, AddressRecord, AddressSummary, EmbeddingProvider, Error, FilterExpr,
    Gazetteer, MatchCriteria, MatchResult, NormalizedAddress, Pagination, PlannerConfig, Projection,
    ProximityQueryPlanner, Result, SearchMetadata, SearchOptions, SearchResult, SearchSource,
    StorageReader, VectorHit, VectorIndex,
};
use viaprox_similarity::{sort_matches, Ranker, SimilarityScorer};

/// Run `fut`, mapping an elapsed deadline to [`Error::ProviderTimeout`].
pub(crate) async fn bounded<T, F>(provider: &str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout(provider, limit)),
    }
}

pub struct SearchOrchestrator {
    parser: AddressParser,
    planner: ProximityQueryPlanner,
    ranker: Ranker,
    storage: Arc<dyn StorageReader>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    vectors: Option<Arc<dyn VectorIndex>>,
    config: SearchConfig,
}

impl SearchOrchestrator {
    /// Structured-only orchestrator; call [`with_semantic`](Self::with_semantic)
    /// to enable the vector branch.
    pub fn new(gazetteer: Arc<Gazetteer>, storage: Arc<dyn StorageReader>) -> Self {
        Self {
            parser: AddressParser::new(gazetteer.clone()),
            planner: ProximityQueryPlanner::new(gazetteer.clone(), PlannerConfig::default()),
            ranker: Ranker::new(SimilarityScorer::default(), gazetteer),
            storage,
            embedder: None,
            vectors: None,
            config: SearchConfig::default(),
        }
    }

    #[must_use]
    pub fn with_semantic(mut self, embedder: Arc<dyn EmbeddingProvider>, vectors: Arc<dyn VectorIndex>) -> Self {
        self.embedder = Some(embedder);
        self.vectors = Some(vectors);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_planner_config(mut self, config: PlannerConfig) -> Self {
        self.planner = ProximityQueryPlanner::new(self.parser.gazetteer().clone(), config);
        self
    }

    #[must_use]
    pub fn with_scorer(mut self, scorer: SimilarityScorer) -> Self {
        self.ranker = Ranker::new(scorer, self.parser.gazetteer().clone());
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn semantic_configured(&self) -> bool {
        self.embedder.is_some() && self.vectors.is_some()
    }

    pub fn parse(&self, raw: &str) -> NormalizedAddress {
        self.parser.parse(raw)
    }

    pub async fn search_nearby_addresses(&self, raw: &str, options: &SearchOptions) -> Result<SearchResult> {
        let started = Instant::now();
        if raw.trim().is_empty() {
            return Err(Error::QueryInvalid("address must not be empty".to_string()));
        }
        options.validate()?;

        let parsed = self.parser.parse(raw);
        info!(
            address = raw,
            canonical = parsed.address_struct(),
            radius = options.search_radius,
            page = options.page,
            limit = options.limit,
            "proximity search"
        );

        let semantic_error = match self.semantic_branch(raw, &parsed, options).await {
            Ok(Some(hits)) => return Ok(self.enrich_and_rank(parsed, hits, options, started).await),
            Ok(None) => {
                info!("semantic search found nothing after normalised retry");
                return Ok(self.empty_result(parsed, options, started));
            }
            Err(e) => e,
        };

        if semantic_error.is_recoverable() {
            warn!(error = %semantic_error, "semantic search failed, using structured fallback");
        } else {
            warn!(error = %semantic_error, "semantic search failed unexpectedly, using structured fallback");
        }

        match self.structured_search(parsed, options, started).await {
            Ok(result) => Ok(result),
            Err(structured) => Err(Error::CombinedSearchFailure {
                semantic: Box::new(semantic_error),
                structured: Box::new(structured),
            }),
        }
    }

    /// `Ok(None)` when both vector attempts returned nothing.
    async fn semantic_branch(
        &self,
        raw: &str,
        parsed: &NormalizedAddress,
        options: &SearchOptions,
    ) -> Result<Option<Vec<VectorHit>>> {
        let (embedder, vectors) = match (&self.embedder, &self.vectors) {
            (Some(e), Some(v)) => (e.as_ref(), v.as_ref()),
            _ => return Err(Error::unavailable("semantic", "embedding provider or vector index not configured")),
        };

        match self.vector_search(embedder, vectors, raw, options).await {
            Ok(hits) if !hits.is_empty() => return Ok(Some(hits)),
            Ok(_) => info!("direct vector search empty, retrying with normalised text"),
            Err(e) => warn!(error = %e, "direct vector search failed, retrying with normalised text"),
        }

        let text = address_embedding_text(&EmbeddingFields::from_query(raw, parsed));
        debug!(text = %text, "normalised embedding text");
        let hits = self.vector_search(embedder, vectors, &text, options).await?;
        Ok(if hits.is_empty() { None } else { Some(hits) })
    }

    async fn vector_search(
        &self,
        embedder: &dyn EmbeddingProvider,
        vectors: &dyn VectorIndex,
        text: &str,
        options: &SearchOptions,
    ) -> Result<Vec<VectorHit>> {
        let started = Instant::now();
        let cleaned = clean_for_embedding(text);
        let vector = bounded(embedder.name(), self.config.embed_timeout(), embedder.embed(&cleaned)).await?;

        let top_k = self.config.top_k(options.limit);
        let min_score = self.config.min_score(options.search_radius);
        let region = options.region();
        let hits = bounded(
            vectors.name(),
            self.config.vector_timeout(),
            vectors.query(&vector, top_k, min_score, region.as_ref()),
        )
        .await?;

        let (low, high) = hits
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), h| (lo.min(h.score), hi.max(h.score)));
        info!(
            hits = hits.len(),
            top_k,
            min_score,
            regional = region.is_some(),
            score_min = if hits.is_empty() { 0.0 } else { low },
            score_max = if hits.is_empty() { 0.0 } else { high },
            elapsed_ms = started.elapsed().as_millis() as u64,
            "vector search"
        );
        Ok(hits)
    }

    /// Resolve hits against the store, synthesising summaries from vector
    /// metadata for ids the store does not have or when the store fails.
    async fn enrich_and_rank(
        &self,
        parsed: NormalizedAddress,
        hits: Vec<VectorHit>,
        options: &SearchOptions,
        started: Instant,
    ) -> SearchResult {
        let ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
        let rows = match bounded(
            self.storage.name(),
            self.config.storage_timeout(),
            self.storage.select_by_ids(&ids, Projection::Full),
        )
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "enrichment lookup failed, using vector metadata only");
                Vec::new()
            }
        };
        debug!(requested = ids.len(), found = rows.len(), "enrichment lookup");

        let by_id: HashMap<&str, &AddressRecord> = rows.iter().map(|r| (r.id.as_str(), r)).collect();
        let scorer = self.ranker.scorer();

        let mut matches: Vec<MatchResult> = hits
            .iter()
            .map(|hit| {
                let (address, candidate) = match by_id.get(hit.id.as_str()) {
                    Some(record) => (record.summary(), self.parser.parse(&record.address_raw)),
                    None => {
                        debug!(id = %hit.id, "id missing from store, using vector metadata");
                        let raw = hit.metadata.address_raw.as_deref().unwrap_or_default();
                        (hit.metadata.to_summary(&hit.id), self.parser.parse(raw))
                    }
                };
                MatchResult {
                    address,
                    similarity: f64::from(hit.score).clamp(0.0, 1.0),
                    distance: scorer.distance(&parsed, &candidate),
                }
            })
            .collect();
        sort_matches(&mut matches);

        let total = matches.len() as u64;
        let pagination = Pagination::new(options.page, options.limit);
        let page = pagination.slice(&matches);
        let result = SearchResult {
            normalized_address: parsed,
            matches: page,
            metadata: self.metadata(total, options, &pagination, started, SearchSource::Semantic),
        };
        info!(
            total_found = total,
            returned = result.matches.len(),
            elapsed_ms = result.metadata.processing_time_ms,
            "semantic search complete"
        );
        result
    }

    async fn structured_search(
        &self,
        parsed: NormalizedAddress,
        options: &SearchOptions,
        started: Instant,
    ) -> Result<SearchResult> {
        let filter = self.planner.build_predicate(&parsed, options);
        let pagination = Pagination::new(options.page, options.limit);
        debug!(filter = %filter, "structured predicate");

        let name = self.storage.name();
        let timeout = self.config.storage_timeout();
        let (total, rows) = tokio::try_join!(
            bounded(name, timeout, self.storage.count(&filter)),
            bounded(
                name,
                timeout,
                self.storage.select(
                    Projection::Full,
                    &filter,
                    Some(options.limit as usize),
                    pagination.offset() as usize,
                ),
            ),
        )?;

        let matches = self.ranker.rank(&parsed, &rows);
        let metadata = self.metadata(total, options, &pagination, started, SearchSource::Structured);
        info!(
            total_found = total,
            returned = matches.len(),
            elapsed_ms = metadata.processing_time_ms,
            "structured search complete"
        );
        Ok(SearchResult {
            normalized_address: parsed,
            matches,
            metadata,
        })
    }

    fn empty_result(&self, parsed: NormalizedAddress, options: &SearchOptions, started: Instant) -> SearchResult {
        SearchResult {
            normalized_address: parsed,
            matches: Vec::new(),
            metadata: SearchMetadata {
                total_found: 0,
                search_radius: options.search_radius,
                processing_time_ms: started.elapsed().as_millis() as u64,
                page: options.page,
                limit: options.limit,
                has_next_page: false,
                has_prev_page: false,
                source: SearchSource::Semantic,
            },
        }
    }

    fn metadata(
        &self,
        total: u64,
        options: &SearchOptions,
        pagination: &Pagination,
        started: Instant,
        source: SearchSource,
    ) -> SearchMetadata {
        SearchMetadata {
            total_found: total,
            search_radius: options.search_radius,
            processing_time_ms: started.elapsed().as_millis() as u64,
            page: options.page,
            limit: options.limit,
            has_next_page: pagination.has_next(total),
            has_prev_page: pagination.has_prev(),
            source,
        }
    }

    /// Rows agreeing with `target` on every selected criterion, capped at
    /// `similar_results_cap`. Empty when no criterion applies.
    pub async fn find_similar_addresses(
        &self,
        target: &NormalizedAddress,
        criteria: &MatchCriteria,
    ) -> Result<Vec<AddressSummary>> {
        let Some(filter) = self.planner.similar_predicate(target, criteria) else {
            debug!("no applicable similarity criteria");
            return Ok(Vec::new());
        };

        let rows = bounded(
            self.storage.name(),
            self.config.storage_timeout(),
            self.storage
                .select(Projection::Summary, &filter, Some(self.config.similar_results_cap), 0),
        )
        .await?;
        info!(filter = %filter, found = rows.len(), "similar addresses");
        Ok(rows.iter().map(AddressRecord::summary).collect())
    }

    /// Unfiltered page of stored rows.
    pub async fn list_addresses(&self, page: u32, limit: u32) -> Result<AddressPage> {
        validate_paging(page, limit)?;
        let pagination = Pagination::new(page, limit);
        let all = FilterExpr::match_all();
        let name = self.storage.name();
        let timeout = self.config.storage_timeout();

        let (total, rows) = tokio::try_join!(
            bounded(name, timeout, self.storage.count(&all)),
            bounded(
                name,
                timeout,
                self.storage
                    .select(Projection::Summary, &all, Some(limit as usize), pagination.offset() as usize),
            ),
        )?;

        Ok(AddressPage {
            data: rows.iter().map(AddressRecord::summary).collect(),
            total,
            page,
            limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use viaprox_core::{RegionFilter, VectorEntry, VectorMetadata};
    use viaprox_storage::{HashEmbedder, MemoryStore, MemoryVectorIndex};

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn name(&self) -> &str {
            "failing-embedder"
        }
        fn dimension(&self) -> usize {
            4
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(Error::unavailable("failing-embedder", "connection refused"))
        }
    }

    struct SlowEmbedder;

    #[async_trait]
    impl EmbeddingProvider for SlowEmbedder {
        fn name(&self) -> &str {
            "slow-embedder"
        }
        fn dimension(&self) -> usize {
            4
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(vec![1.0; 4])
        }
    }

    /// Counts calls; fails every one.
    #[derive(Default)]
    struct FailingStorage {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StorageReader for FailingStorage {
        async fn count(&self, _filter: &FilterExpr) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Storage("database down".to_string()))
        }
        async fn select(
            &self,
            _projection: Projection,
            _filter: &FilterExpr,
            _limit: Option<usize>,
            _offset: usize,
        ) -> Result<Vec<AddressRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Storage("database down".to_string()))
        }
        async fn select_by_ids(&self, _ids: &[String], _projection: Projection) -> Result<Vec<AddressRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Storage("database down".to_string()))
        }
    }

    /// Returns nothing on the first query and `hits` afterwards.
    struct ScriptedIndex {
        queries: AtomicUsize,
        hits: Vec<VectorHit>,
    }

    #[async_trait]
    impl VectorIndex for ScriptedIndex {
        fn name(&self) -> &str {
            "scripted-index"
        }
        async fn upsert(&self, _entries: Vec<VectorEntry>) -> Result<()> {
            Ok(())
        }
        async fn query(
            &self,
            _vector: &[f32],
            _top_k: usize,
            _min_score: f32,
            _region: Option<&RegionFilter>,
        ) -> Result<Vec<VectorHit>> {
            let n = self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(if n == 0 { Vec::new() } else { self.hits.clone() })
        }
    }

    fn gazetteer() -> Arc<Gazetteer> {
        Arc::new(Gazetteer::default())
    }

    /// 25 carreras around kr 81 # 41..65, alternating stored aliases.
    fn corpus() -> MemoryStore {
        let parser = AddressParser::default();
        MemoryStore::from_records((1..=25).map(|i| {
            let via = if i % 2 == 0 { "kr" } else { "carrera" };
            let raw = format!("{} 81 # {}-30 bogotá", via, 40 + i);
            let mut record = AddressRecord::new(format!("{:03}", i), raw.clone()).with_structure(&parser.parse(&raw));
            record.via_code = Some(via.to_string());
            record
        }))
    }

    fn hit(id: &str, score: f32, raw: Option<&str>) -> VectorHit {
        VectorHit {
            id: id.to_string(),
            score,
            metadata: VectorMetadata {
                address_raw: raw.map(str::to_string),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_structured_fallback_when_providers_fail() {
        let store = Arc::new(corpus());
        let orchestrator = SearchOrchestrator::new(gazetteer(), store.clone())
            .with_semantic(Arc::new(FailingEmbedder), Arc::new(MemoryVectorIndex::new()));

        let options = SearchOptions::with_radius(5);
        let result = orchestrator
            .search_nearby_addresses("KR 81 # 55-30 Bogotá", &options)
            .await
            .unwrap();

        assert_eq!(result.metadata.source, SearchSource::Structured);
        // primary 50..=60 on any carrera alias, or label 81 +- 2
        let predicate = ProximityQueryPlanner::new(gazetteer(), PlannerConfig::default())
            .build_predicate(&result.normalized_address, &options);
        let exact = store.count(&predicate).await.unwrap();
        assert_eq!(result.metadata.total_found, exact);
        assert_eq!(exact, 25);
        assert_eq!(result.matches.len(), 10);
        assert!(result.metadata.has_next_page);
        assert!(!result.metadata.has_prev_page);
        assert!(result
            .matches
            .windows(2)
            .all(|w| w[0].similarity >= w[1].similarity));
    }

    #[tokio::test]
    async fn test_structured_pagination_boundaries() {
        let orchestrator = SearchOrchestrator::new(gazetteer(), Arc::new(corpus()));
        let options = SearchOptions::with_radius(5).page(3, 10);
        let result = orchestrator
            .search_nearby_addresses("kr 81 # 55-30 bogotá", &options)
            .await
            .unwrap();
        assert_eq!(result.metadata.total_found, 25);
        assert_eq!(result.matches.len(), 5);
        assert!(!result.metadata.has_next_page);
        assert!(result.metadata.has_prev_page);
    }

    #[tokio::test]
    async fn test_combined_failure_names_both_paths() {
        let orchestrator = SearchOrchestrator::new(gazetteer(), Arc::new(FailingStorage::default()))
            .with_semantic(Arc::new(FailingEmbedder), Arc::new(MemoryVectorIndex::new()));

        let err = orchestrator
            .search_nearby_addresses("cl 152b 73 36", &SearchOptions::default())
            .await
            .unwrap_err();
        match &err {
            Error::CombinedSearchFailure { semantic, structured } => {
                assert!(matches!(**semantic, Error::ProviderUnavailable { .. }));
                assert!(matches!(**structured, Error::Storage(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        let msg = err.to_string();
        assert!(msg.contains("connection refused"));
        assert!(msg.contains("database down"));
    }

    #[tokio::test]
    async fn test_invalid_query_rejected_before_io() {
        let storage = Arc::new(FailingStorage::default());
        let orchestrator = SearchOrchestrator::new(gazetteer(), storage.clone());

        let too_big = SearchOptions::default().page(1, 101);
        let err = orchestrator.search_nearby_addresses("kr 1 2 3", &too_big).await.unwrap_err();
        assert!(matches!(err, Error::QueryInvalid(_)));

        let page_zero = SearchOptions::default().page(0, 10);
        assert!(matches!(
            orchestrator.search_nearby_addresses("kr 1 2 3", &page_zero).await,
            Err(Error::QueryInvalid(_))
        ));
        assert!(matches!(
            orchestrator.search_nearby_addresses("   ", &SearchOptions::default()).await,
            Err(Error::QueryInvalid(_))
        ));
        assert!(matches!(orchestrator.list_addresses(1, 0).await, Err(Error::QueryInvalid(_))));
        assert_eq!(storage.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embed_timeout_falls_back() {
        let config = SearchConfig {
            embed_timeout_ms: 20,
            ..Default::default()
        };
        let orchestrator = SearchOrchestrator::new(gazetteer(), Arc::new(corpus()))
            .with_semantic(Arc::new(SlowEmbedder), Arc::new(MemoryVectorIndex::new()))
            .with_config(config);

        let result = orchestrator
            .search_nearby_addresses("kr 81 # 55-30", &SearchOptions::with_radius(1))
            .await
            .unwrap();
        assert_eq!(result.metadata.source, SearchSource::Structured);
        assert!(result.metadata.total_found > 0);
    }

    #[tokio::test]
    async fn test_semantic_direct_hit() {
        let store = Arc::new(corpus());
        let embedder = Arc::new(HashEmbedder::new(64));
        let index = Arc::new(MemoryVectorIndex::new());
        for record in store.records() {
            let vector = embedder.embed(&clean_for_embedding(&record.address_raw)).await.unwrap();
            index
                .upsert(vec![VectorEntry {
                    id: record.id.clone(),
                    vector,
                    metadata: VectorMetadata::from_record(&record, Some("kr")),
                }])
                .await
                .unwrap();
        }

        let orchestrator = SearchOrchestrator::new(gazetteer(), store).with_semantic(embedder, index);
        let result = orchestrator
            .search_nearby_addresses("kr 81 # 54-30 bogotá", &SearchOptions::with_radius(5))
            .await
            .unwrap();

        assert_eq!(result.metadata.source, SearchSource::Semantic);
        let best = &result.matches[0];
        assert_eq!(best.address.id, "014");
        assert!((best.similarity - 1.0).abs() < 1e-5);
        assert_eq!(best.distance, 0.0);
        assert!(result.metadata.total_found <= 30);
        assert!(result.matches.len() <= 10);
    }

    #[tokio::test]
    async fn test_normalised_retry_and_metadata_synthesis() {
        let index = Arc::new(ScriptedIndex {
            queries: AtomicUsize::new(0),
            hits: vec![
                hit("001", 0.81, None),
                hit("ghost", 0.93, Some("KR 81 # 60-30")),
                hit("ghost-2", 0.85, None),
            ],
        });
        let orchestrator = SearchOrchestrator::new(gazetteer(), Arc::new(corpus()))
            .with_semantic(Arc::new(HashEmbedder::new(16)), index.clone());

        let result = orchestrator
            .search_nearby_addresses("kr 81 # 55-30", &SearchOptions::with_radius(5).page(1, 2))
            .await
            .unwrap();

        assert_eq!(index.queries.load(Ordering::SeqCst), 2);
        assert_eq!(result.metadata.source, SearchSource::Semantic);
        assert_eq!(result.metadata.total_found, 3);
        assert!(result.metadata.has_next_page);

        let ids: Vec<&str> = result.matches.iter().map(|m| m.address.id.as_str()).collect();
        assert_eq!(ids, vec!["ghost", "ghost-2"]);
        assert_eq!(result.matches[0].address.address_raw, "KR 81 # 60-30");
        assert_eq!(result.matches[0].distance, 5.0);
        assert_eq!(result.matches[1].address.address_raw, "address unavailable");
    }

    #[tokio::test]
    async fn test_enrichment_store_failure_uses_metadata() {
        let index = Arc::new(ScriptedIndex {
            queries: AtomicUsize::new(1),
            hits: vec![hit("001", 0.9, Some("carrera 81 # 41-30 bogotá"))],
        });
        let orchestrator = SearchOrchestrator::new(gazetteer(), Arc::new(FailingStorage::default()))
            .with_semantic(Arc::new(HashEmbedder::new(16)), index);

        let result = orchestrator
            .search_nearby_addresses("kr 81 # 41-30", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].address.address_raw, "carrera 81 # 41-30 bogotá");
    }

    #[tokio::test]
    async fn test_semantic_empty_after_retry_is_empty_result() {
        let storage = Arc::new(FailingStorage::default());
        let orchestrator = SearchOrchestrator::new(gazetteer(), storage.clone())
            .with_semantic(Arc::new(HashEmbedder::new(16)), Arc::new(MemoryVectorIndex::new()));

        let result = orchestrator
            .search_nearby_addresses("kr 81 # 55-30", &SearchOptions::default())
            .await
            .unwrap();
        assert!(result.matches.is_empty());
        assert_eq!(result.metadata.total_found, 0);
        assert!(!result.metadata.has_next_page);
        assert_eq!(storage.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_find_similar_addresses() {
        let orchestrator = SearchOrchestrator::new(gazetteer(), Arc::new(corpus()));
        let target = orchestrator.parse("kr 81 # 50-30 bogotá");

        let none = orchestrator
            .find_similar_addresses(&target, &MatchCriteria::default())
            .await
            .unwrap();
        assert!(none.is_empty());

        let criteria = MatchCriteria {
            via_code_match: true,
            number_range_match: true,
            municipality_match: true,
            ..Default::default()
        };
        let similar = orchestrator.find_similar_addresses(&target, &criteria).await.unwrap();
        // primary 45..=55 -> ids 005..=015
        assert_eq!(similar.len(), 11);
        assert_eq!(similar[0].id, "005");
    }

    #[tokio::test]
    async fn test_list_addresses() {
        let orchestrator = SearchOrchestrator::new(gazetteer(), Arc::new(corpus()));
        let page = orchestrator.list_addresses(3, 10).await.unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.data.len(), 5);
        assert_eq!(page.data[0].id, "021");
    }
}
