//! # viaprox Similarity
//!
//! Scoring for structured addresses.
//!
//! - [`SimilarityScorer`] - weighted agreement rubric (total weight 10) and
//!   the additive distance heuristic used for tie-breaking
//! - [`Ranker`] - scores stored rows against a parsed query and sorts them
//! - [`hash_text_to_vector`] - offline trigram embedding used by the local
//!   embedding provider
//!
//! ## Example
//!
//! ```rust
//! use viaprox_core::{AddressParser, Gazetteer};
//! use viaprox_similarity::SimilarityScorer;
//! use std::sync::Arc;
//!
//! let parser = AddressParser::new(Arc::new(Gazetteer::default()));
//! let a = parser.parse("kr 81 55 30");
//! let b = parser.parse("carrera 81 56 30");
//!
//! let scorer = SimilarityScorer::default();
//! assert!((scorer.similarity(&a, &b) - 0.6).abs() < 1e-9);
//! assert_eq!(scorer.distance(&a, &b), 1.0);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Query     │────>│   Scorer    │────>│   Ranker    │
//! │ (parsed)    │     │ (rubric)    │     │ (sorted)    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            ^
//!                            │
//!                     ┌─────────────┐
//!                     │ Stored row  │
//!                     │(canonical.) │
//!                     └─────────────┘
//! ```

pub mod hashing;
pub mod rank;
pub mod scorer;

pub use hashing::{cosine_score, hash_text_to_vector, DEFAULT_HASH_DIM};
pub use rank::{sort_matches, Ranker};
pub use scorer::{ScoreBreakdown, SimilarityScorer, Weights};
