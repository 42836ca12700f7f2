//! # viaprox Core
//!
//! Core library for proximity search over Colombian street addresses.
//!
//! This crate provides the data model and the pure, I/O-free stages:
//!
//! - [`AddressParser`] - raw text to [`NormalizedAddress`]
//! - [`ProximityQueryPlanner`] - query to storage-agnostic [`FilterExpr`]
//! - [`Gazetteer`] - municipality/department lists and the via alias table
//! - [`StorageReader`], [`EmbeddingProvider`], [`VectorIndex`] - provider seams
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use viaprox_core::{AddressParser, Gazetteer, PlannerConfig, ProximityQueryPlanner, SearchOptions};
//!
//! let gazetteer = Arc::new(Gazetteer::default());
//! let parser = AddressParser::new(gazetteer.clone());
//! let query = parser.parse("KR 81 #55-30 Bogotá");
//! assert_eq!(query.address_struct(), "kr 81 #55 -30 bogotá");
//!
//! let planner = ProximityQueryPlanner::new(gazetteer, PlannerConfig::default());
//! let predicate = planner.build_predicate(&query, &SearchOptions::with_radius(5));
//! println!("{}", predicate);
//! ```

pub mod address;
pub mod error;
pub mod filter;
pub mod gazetteer;
pub mod options;
pub mod parser;
pub mod planner;
pub mod provider;
pub mod record;
pub mod result;

pub use address::{AddressParts, NormalizedAddress, Quadrant, ViaCode};
pub use error::{Error, Result};
pub use filter::{Field, Filter, FilterExpr, FilterValue};
pub use gazetteer::{Gazetteer, GazetteerConfig};
pub use options::{MatchCriteria, RegionFilter, SearchOptions, MAX_LIMIT};
pub use parser::AddressParser;
pub use planner::{EmptyQueryPolicy, PlannerConfig, ProximityQueryPlanner};
pub use provider::{EmbeddingProvider, StorageReader, VectorEntry, VectorHit, VectorIndex, VectorMetadata};
pub use record::{AddressRecord, AddressSummary, Projection};
pub use result::{AddressPage, MatchResult, Pagination, SearchMetadata, SearchResult, SearchSource};
