//! Weighted agreement rubric and the ranking distance between two
//! structured addresses.

use serde::{Deserialize, Serialize};
use viaprox_core::NormalizedAddress;

/// Per-factor weights. The denominator is always [`Weights::total`], so a
/// field absent on either side costs its full weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub via_code: f64,
    pub via_label: f64,
    pub primary_number: f64,
    pub neighborhood: f64,
    pub municipality: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            via_code: 3.0,
            via_label: 2.0,
            primary_number: 2.0,
            neighborhood: 2.0,
            municipality: 1.0,
        }
    }
}

impl Weights {
    pub fn total(&self) -> f64 {
        self.via_code + self.via_label + self.primary_number + self.neighborhood + self.municipality
    }
}

/// Achieved weight per factor, before normalisation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub via_code: f64,
    pub via_label: f64,
    pub primary_number: f64,
    pub neighborhood: f64,
    pub municipality: f64,
}

impl ScoreBreakdown {
    pub fn achieved(&self) -> f64 {
        self.via_code + self.via_label + self.primary_number + self.neighborhood + self.municipality
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimilarityScorer {
    weights: Weights,
}

fn both_equal<T: PartialEq>(a: Option<T>, b: Option<T>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

/// Digits of a via label read as one number, `None` when it has none.
fn label_numeric(label: Option<&str>) -> Option<f64> {
    let digits: String = label?.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

impl SimilarityScorer {
    pub fn new(weights: Weights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn breakdown(&self, a: &NormalizedAddress, b: &NormalizedAddress) -> ScoreBreakdown {
        let w = &self.weights;
        let hit = |matched: bool, weight: f64| if matched { weight } else { 0.0 };

        let primary_number = match (a.primary_number(), b.primary_number()) {
            (Some(x), Some(y)) => {
                let diff = (x - y).abs();
                if diff == 0.0 {
                    w.primary_number
                } else if diff <= 2.0 {
                    w.primary_number / 2.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };

        ScoreBreakdown {
            via_code: hit(both_equal(a.via_code(), b.via_code()), w.via_code),
            via_label: hit(both_equal(a.via_label(), b.via_label()), w.via_label),
            primary_number,
            neighborhood: hit(both_equal(a.neighborhood(), b.neighborhood()), w.neighborhood),
            municipality: hit(both_equal(a.municipality(), b.municipality()), w.municipality),
        }
    }

    /// Weighted agreement in [0, 1].
    pub fn similarity(&self, a: &NormalizedAddress, b: &NormalizedAddress) -> f64 {
        let total = self.weights.total();
        if total <= 0.0 {
            return 0.0;
        }
        (self.breakdown(a, b).achieved() / total).clamp(0.0, 1.0)
    }

    /// Ranking heuristic; not a metric. Missing terms contribute 0.
    pub fn distance(&self, a: &NormalizedAddress, b: &NormalizedAddress) -> f64 {
        let mut d = 0.0;
        if let (Some(x), Some(y)) = (a.primary_number(), b.primary_number()) {
            d += (x - y).abs();
        }
        if let (Some(x), Some(y)) = (a.secondary_number(), b.secondary_number()) {
            d += 0.1 * (x - y).abs();
        }
        if let (Some(x), Some(y)) = (label_numeric(a.via_label()), label_numeric(b.via_label())) {
            d += 0.5 * (x - y).abs();
        }
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viaprox_core::{AddressParts, ViaCode};

    fn full() -> NormalizedAddress {
        AddressParts::new()
            .with_via(ViaCode::Kr, "81")
            .with_numbers(55.0, Some(30.0))
            .with_neighborhood("chapinero")
            .with_municipality("bogotá")
            .build()
    }

    #[test]
    fn test_identity() {
        let scorer = SimilarityScorer::default();
        let a = full();
        assert_eq!(scorer.similarity(&a, &a), 1.0);
        assert_eq!(scorer.distance(&a, &a), 0.0);
    }

    #[test]
    fn test_absent_fields_never_match() {
        let scorer = SimilarityScorer::default();
        let empty = NormalizedAddress::default();
        assert_eq!(scorer.similarity(&empty, &empty), 0.0);

        let partial = AddressParts::new().with_via_code(ViaCode::Kr).build();
        assert!((scorer.similarity(&partial, &partial) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_primary_number_closeness() {
        let scorer = SimilarityScorer::default();
        let a = AddressParts::new().with_numbers(55.0, None).build();
        let near = AddressParts::new().with_numbers(57.0, None).build();
        let far = AddressParts::new().with_numbers(58.0, None).build();
        assert!((scorer.similarity(&a, &near) - 0.1).abs() < 1e-9);
        assert_eq!(scorer.similarity(&a, &far), 0.0);
    }

    #[test]
    fn test_symmetry_and_bounds() {
        let scorer = SimilarityScorer::default();
        let samples = vec![
            full(),
            NormalizedAddress::default(),
            AddressParts::new().with_via(ViaCode::Cl, "152b").with_numbers(73.0, Some(36.0)).build(),
            AddressParts::new().with_via(ViaCode::Kr, "80").with_numbers(53.0, None).with_municipality("bogotá").build(),
        ];
        for a in &samples {
            for b in &samples {
                let ab = scorer.similarity(a, b);
                assert_eq!(ab, scorer.similarity(b, a));
                assert!((0.0..=1.0).contains(&ab));
                assert_eq!(scorer.distance(a, b), scorer.distance(b, a));
                assert!(scorer.distance(a, b) >= 0.0);
            }
        }
    }

    #[test]
    fn test_distance_terms() {
        let scorer = SimilarityScorer::default();
        let a = AddressParts::new().with_via(ViaCode::Kr, "80").with_numbers(50.0, Some(10.0)).build();
        let b = AddressParts::new().with_via(ViaCode::Kr, "84a").with_numbers(53.0, Some(30.0)).build();
        // 3 + 0.1 * 20 + 0.5 * 4
        assert!((scorer.distance(&a, &b) - 7.0).abs() < 1e-9);

        let no_digits = AddressParts::new().with_via(ViaCode::Kr, "bis").build();
        assert_eq!(scorer.distance(&a, &no_digits), 0.0);
    }
}
