use crate::address::NormalizedAddress;
use crate::record::AddressSummary;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub address: AddressSummary,
    /// In [0, 1].
    pub similarity: f64,
    /// Ranking heuristic, >= 0.
    pub distance: f64,
}

/// Which branch of the search served the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    /// Vector search; `total_found` counts retrieved candidates only.
    Semantic,
    /// Range search; `total_found` is the exact matching-row count.
    Structured,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetadata {
    pub total_found: u64,
    pub search_radius: u32,
    pub processing_time_ms: u64,
    pub page: u32,
    pub limit: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub source: SearchSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub normalized_address: NormalizedAddress,
    pub matches: Vec<MatchResult>,
    pub metadata: SearchMetadata,
}

/// Page/limit arithmetic shared by both search paths and listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.limit as u64
    }

    pub fn has_next(&self, total: u64) -> bool {
        (self.page as u64) * (self.limit as u64) < total
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Slice an already-fetched list.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = (self.offset() as usize).min(items.len());
        let end = start.saturating_add(self.limit as usize).min(items.len());
        items[start..end].to_vec()
    }
}

/// One page of raw listing results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressPage {
    pub data: Vec<AddressSummary>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}
