use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Caller-supplied search tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    /// Tolerance in address-number units.
    #[serde(default)]
    pub search_radius: u32,
    #[serde(default)]
    pub include_neighborhoods: bool,
    #[serde(default)]
    pub include_quadrants: bool,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Restrict vector search to a municipality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
    /// Restrict vector search to a neighborhood.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
}

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            search_radius: 0,
            include_neighborhoods: false,
            include_quadrants: false,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            municipality: None,
            neighborhood: None,
        }
    }
}

impl SearchOptions {
    pub fn with_radius(radius: u32) -> Self {
        Self {
            search_radius: radius,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn page(mut self, page: u32, limit: u32) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    /// Reject out-of-range paging before any I/O happens.
    pub fn validate(&self) -> Result<()> {
        validate_paging(self.page, self.limit)
    }

    pub fn region(&self) -> Option<RegionFilter> {
        if self.municipality.is_none() && self.neighborhood.is_none() {
            return None;
        }
        Some(RegionFilter {
            municipality: self.municipality.clone(),
            neighborhood: self.neighborhood.clone(),
        })
    }
}

pub fn validate_paging(page: u32, limit: u32) -> Result<()> {
    if page < 1 {
        return Err(Error::QueryInvalid(format!("page must be >= 1, got {}", page)));
    }
    if limit < 1 || limit > MAX_LIMIT {
        return Err(Error::QueryInvalid(format!(
            "limit must be between 1 and {}, got {}",
            MAX_LIMIT, limit
        )));
    }
    Ok(())
}

/// Metadata restriction passed to the vector index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionFilter {
    pub municipality: Option<String>,
    pub neighborhood: Option<String>,
}

/// Which fields `find_similar_addresses` must agree on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchCriteria {
    pub via_code_match: bool,
    pub neighborhood_match: bool,
    pub quadrant_match: bool,
    pub number_range_match: bool,
    pub municipality_match: bool,
}

impl MatchCriteria {
    pub fn is_empty(&self) -> bool {
        !(self.via_code_match
            || self.neighborhood_match
            || self.quadrant_match
            || self.number_range_match
            || self.municipality_match)
    }
}
