//! Proximity predicate construction.
//!
//! The planner only builds [`FilterExpr`] trees; executing them is the
//! storage reader's job.

use crate::address::NormalizedAddress;
use crate::filter::{Field, FilterExpr};
use crate::gazetteer::Gazetteer;
use crate::options::{MatchCriteria, SearchOptions};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What the proximity group degrades to when the query yields no clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyQueryPolicy {
    /// Every row in the pre-filtered region qualifies.
    #[default]
    MatchAll,
    MatchNone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub empty_query_policy: EmptyQueryPolicy,
    /// Tolerance on `primary_number` used by similar-address lookups.
    pub number_range_radius: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            empty_query_policy: EmptyQueryPolicy::MatchAll,
            number_range_radius: 5.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProximityQueryPlanner {
    gazetteer: Arc<Gazetteer>,
    config: PlannerConfig,
}

impl ProximityQueryPlanner {
    pub fn new(gazetteer: Arc<Gazetteer>, config: PlannerConfig) -> Self {
        Self { gazetteer, config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Region pre-filter AND the OR-group of proximity clauses.
    pub fn build_predicate(&self, query: &NormalizedAddress, options: &SearchOptions) -> FilterExpr {
        self.region_prefilter(query).and(self.proximity_group(query, options))
    }

    /// OR of every proximity clause the query supports.
    pub fn proximity_group(&self, query: &NormalizedAddress, options: &SearchOptions) -> FilterExpr {
        let radius = options.search_radius as f64;
        let mut clauses = Vec::new();

        if let (Some(code), Some(primary)) = (query.via_code(), query.primary_number()) {
            clauses.push(FilterExpr::And(vec![
                FilterExpr::any_of(Field::ViaCode, self.gazetteer.via_equivalents(code)),
                FilterExpr::range(Field::PrimaryNumber, primary - radius, primary + radius),
            ]));
        }

        if options.include_neighborhoods {
            if let Some(neighborhood) = query.neighborhood() {
                clauses.push(FilterExpr::like(Field::Neighborhood, neighborhood));
            }
        }

        if options.include_quadrants {
            if let Some(quadrant) = query.quadrant() {
                clauses.push(FilterExpr::eq(Field::Quadrant, quadrant.as_str()));
            }
        }

        if let Some(label) = query.via_label_number().filter(|n| *n > 0.0) {
            let half = (options.search_radius / 2) as f64;
            clauses.push(FilterExpr::range(Field::ViaLabelDigits, label - half, label + half));
        }

        if clauses.is_empty() {
            return match self.config.empty_query_policy {
                EmptyQueryPolicy::MatchAll => FilterExpr::match_all(),
                EmptyQueryPolicy::MatchNone => FilterExpr::match_none(),
            };
        }
        FilterExpr::Or(clauses)
    }

    /// Exact municipality/department restriction, match-all when neither is known.
    pub fn region_prefilter(&self, query: &NormalizedAddress) -> FilterExpr {
        let mut clauses = Vec::new();
        if let Some(municipality) = query.municipality() {
            clauses.push(FilterExpr::eq(Field::Municipality, municipality));
        }
        if let Some(department) = query.department() {
            clauses.push(FilterExpr::eq(Field::Department, department));
        }
        FilterExpr::And(clauses)
    }

    /// AND of the selected agreement criteria against `target`.
    ///
    /// Returns `None` when no criterion applies, in which case callers
    /// return an empty result instead of scanning the whole store.
    pub fn similar_predicate(
        &self,
        target: &NormalizedAddress,
        criteria: &MatchCriteria,
    ) -> Option<FilterExpr> {
        let mut clauses = Vec::new();

        if criteria.via_code_match {
            if let Some(code) = target.via_code() {
                clauses.push(FilterExpr::any_of(Field::ViaCode, self.gazetteer.via_equivalents(code)));
            }
        }
        if criteria.neighborhood_match {
            if let Some(neighborhood) = target.neighborhood() {
                clauses.push(FilterExpr::eq(Field::Neighborhood, neighborhood));
            }
        }
        if criteria.quadrant_match {
            if let Some(quadrant) = target.quadrant() {
                clauses.push(FilterExpr::eq(Field::Quadrant, quadrant.as_str()));
            }
        }
        if criteria.number_range_match {
            if let Some(primary) = target.primary_number() {
                let r = self.config.number_range_radius;
                clauses.push(FilterExpr::range(Field::PrimaryNumber, primary - r, primary + r));
            }
        }
        if criteria.municipality_match {
            if let Some(municipality) = target.municipality() {
                clauses.push(FilterExpr::eq(Field::Municipality, municipality));
            }
        }

        if clauses.is_empty() {
            None
        } else {
            Some(FilterExpr::And(clauses))
        }
    }
}
