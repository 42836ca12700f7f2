//! # viaprox Storage
//!
//! Provider implementations backing the search core:
//!
//! - [`MemoryStore`] - [`StorageReader`](viaprox_core::StorageReader) over an
//!   in-memory row set that evaluates filter trees
//! - [`MemoryVectorIndex`] - brute-force cosine [`VectorIndex`](viaprox_core::VectorIndex)
//! - [`HashEmbedder`], [`HttpEmbeddingProvider`] - embedding providers
//! - [`snapshot`] - JSON / JSON Lines / gzip dataset files and timestamped snapshots

pub mod embedding;
pub mod memory_store;
pub mod snapshot;
pub mod vector_index;

pub use embedding::{HashEmbedder, HttpEmbeddingConfig, HttpEmbeddingProvider};
pub use memory_store::MemoryStore;
pub use snapshot::{read_dataset, write_dataset, SnapshotDescription, SnapshotManager};
pub use vector_index::MemoryVectorIndex;
