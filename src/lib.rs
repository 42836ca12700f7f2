//! # viaprox
//!
//! Proximity search over Colombian street addresses ("vías").
//!
//! A raw address such as `KR 81 # 55-30 Bogotá` is parsed into structured
//! fields, then matched against a stored corpus: first through a vector
//! index over address embeddings, and, when that path is unavailable, through
//! a structured range/alias predicate evaluated by the row store.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! viaprox --config viaprox.json migrate
//! viaprox --config viaprox.json serve --http-port 8080
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use viaprox::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> viaprox::Result<()> {
//! let gazetteer = Arc::new(Gazetteer::default());
//! let store = Arc::new(MemoryStore::load("data/addresses.jsonl")?);
//! let orchestrator = SearchOrchestrator::new(gazetteer, store);
//!
//! let result = orchestrator
//!     .search_nearby_addresses("CL 152B 73 36", &SearchOptions::with_radius(5))
//!     .await?;
//! for m in &result.matches {
//!     println!("{} {:.2}", m.address.address_raw, m.similarity);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! - `viaprox-core` - data model, parser, query planner, provider traits
//! - `viaprox-similarity` - weighted similarity rubric and ranking
//! - `viaprox-storage` - in-memory row store and vector index, embedders, snapshots
//! - `viaprox-search` - search orchestration and vector migration
//! - `viaprox-api` - REST API

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub use viaprox_core::{
    AddressParser, AddressRecord, AddressSummary, EmbeddingProvider, Error, FilterExpr, Gazetteer,
    GazetteerConfig, MatchCriteria, MatchResult, NormalizedAddress, PlannerConfig, ProximityQueryPlanner,
    Result, SearchOptions, SearchResult, StorageReader, VectorIndex,
};
pub use viaprox_similarity::{Ranker, SimilarityScorer};
pub use viaprox_storage::{HashEmbedder, HttpEmbeddingConfig, HttpEmbeddingProvider, MemoryStore, MemoryVectorIndex, SnapshotManager};
pub use viaprox_search::{MigrationOptions, MigrationProgress, SearchConfig, SearchOrchestrator, VectorMigration};
pub use viaprox_api::RestApi;

/// Snapshot name under which migrated vectors are stored.
pub const VECTOR_SNAPSHOT: &str = "address-vectors";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AddressParser, AddressRecord, Error, Gazetteer, MatchCriteria, MemoryStore, MemoryVectorIndex,
        NormalizedAddress, Result, SearchOptions, SearchOrchestrator, SearchResult, SimilarityScorer,
    };
}

/// Application configuration, read from a JSON file. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gazetteer: GazetteerConfig,
    pub planner: PlannerConfig,
    pub search: SearchConfig,
    pub migration: MigrationOptions,
    /// `.json`, `.jsonl` or `.jsonl.gz` file of address rows.
    pub dataset: PathBuf,
    pub snapshot_dir: PathBuf,
    /// Enable the vector search branch.
    pub semantic: bool,
    /// Remote embedding model; the local hashing embedder is used when absent.
    pub embedding: Option<HttpEmbeddingConfig>,
    pub hash_dimension: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gazetteer: GazetteerConfig::default(),
            planner: PlannerConfig::default(),
            search: SearchConfig::default(),
            migration: MigrationOptions::default(),
            dataset: PathBuf::from("./data/addresses.jsonl"),
            snapshot_dir: PathBuf::from("./data/snapshots"),
            semantic: true,
            embedding: None,
            hash_dimension: viaprox_similarity::DEFAULT_HASH_DIM,
        }
    }
}

impl AppConfig {
    /// Read `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {}", path.display(), e))?;
        let config = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        Ok(match &self.embedding {
            Some(http) => Arc::new(HttpEmbeddingProvider::new(http.clone())?),
            None => Arc::new(HashEmbedder::new(self.hash_dimension)),
        })
    }
}

/// Shared providers built from an [`AppConfig`].
pub struct Services {
    pub gazetteer: Arc<Gazetteer>,
    pub store: Arc<MemoryStore>,
    pub index: Arc<MemoryVectorIndex>,
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
    pub snapshots: SnapshotManager,
}

impl Services {
    /// Load the dataset and the newest vector snapshot, if present.
    pub async fn open(config: &AppConfig) -> anyhow::Result<Self> {
        let gazetteer = Arc::new(Gazetteer::new(config.gazetteer.clone()));

        let store = if config.dataset.exists() {
            MemoryStore::load(&config.dataset)?
        } else {
            warn!(path = %config.dataset.display(), "dataset not found, starting with an empty store");
            MemoryStore::new()
        };

        let snapshots = SnapshotManager::new(&config.snapshot_dir)?;
        let index = MemoryVectorIndex::new();
        if let Some(entries) = snapshots.load_latest(VECTOR_SNAPSHOT)? {
            info!(vectors = entries.len(), "restored vector snapshot");
            index.upsert(entries).await?;
        }

        let embedder = if config.semantic { Some(config.embedder()?) } else { None };

        Ok(Self {
            gazetteer,
            store: Arc::new(store),
            index: Arc::new(index),
            embedder,
            snapshots,
        })
    }

    pub fn orchestrator(&self, config: &AppConfig) -> SearchOrchestrator {
        let orchestrator = SearchOrchestrator::new(self.gazetteer.clone(), self.store.clone())
            .with_config(config.search.clone())
            .with_planner_config(config.planner.clone());
        match &self.embedder {
            // An empty index would only add a round trip before the fallback.
            Some(embedder) if !self.index.is_empty() => orchestrator.with_semantic(embedder.clone(), self.index.clone()),
            _ => orchestrator,
        }
    }

    /// Embed every stored row into the index and snapshot the result.
    pub async fn migrate(&self, options: &MigrationOptions) -> anyhow::Result<MigrationProgress> {
        let embedder = self
            .embedder
            .clone()
            .ok_or_else(|| anyhow::anyhow!("semantic search is disabled in the configuration"))?;
        let migration = VectorMigration::new(self.store.clone(), embedder, self.index.clone(), self.gazetteer.clone());
        let progress = migration.run(options).await?;

        let snapshot = self.snapshots.create_snapshot(VECTOR_SNAPSHOT, &self.index.entries())?;
        info!(path = %snapshot.path.display(), vectors = snapshot.records, "wrote vector snapshot");
        Ok(progress)
    }
}
