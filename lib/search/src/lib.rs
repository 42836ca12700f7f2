//! # viaprox Search
//!
//! End-to-end address proximity search over pluggable providers.
//!
//! - [`SearchOrchestrator`] - parse, semantic search with a normalised-text
//!   retry, structured fallback, enrichment, ranking and pagination; also
//!   similar-address lookup and paginated listing
//! - [`VectorMigration`] - batch ingestion of stored rows into a vector
//!   index with bounded retry
//! - [`text`] - embedding text preparation shared by queries and ingestion
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use viaprox_core::{Gazetteer, SearchOptions};
//! use viaprox_search::SearchOrchestrator;
//! # async fn run(store: Arc<dyn viaprox_core::StorageReader>) -> viaprox_core::Result<()> {
//! let orchestrator = SearchOrchestrator::new(Arc::new(Gazetteer::default()), store);
//! let result = orchestrator
//!     .search_nearby_addresses("KR 81 # 55-30", &SearchOptions::with_radius(5))
//!     .await?;
//! println!("{} matches", result.metadata.total_found);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod migration;
pub mod orchestrator;
pub mod text;

pub use config::{ScoreTier, SearchConfig};
pub use migration::{MigrationOptions, MigrationProgress, VectorMigration};
pub use orchestrator::SearchOrchestrator;
pub use text::{address_embedding_text, clean_for_embedding, normalize_for_embedding, EmbeddingFields};
