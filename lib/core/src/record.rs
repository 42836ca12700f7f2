//! Persisted address rows and their public projection.

use crate::address::{AddressParts, NormalizedAddress};
use crate::gazetteer::Gazetteer;
use serde::{Deserialize, Serialize};

/// Public projection of a persisted address row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSummary {
    pub id: String,
    pub address_raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_norm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_canonical: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_area_m2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built_area_m2: Option<f64>,
}

/// Which columns a storage read should populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    /// Summary columns only; structured columns are left empty.
    Summary,
    /// Summary plus every structured address column.
    #[default]
    Full,
}

/// A stored address row.
///
/// Structured columns hold whatever the ingestion wrote, so `via_code` may be
/// any alias ("carrera", "cr") rather than a canonical code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRecord {
    pub id: String,
    #[serde(default)]
    pub address_raw: String,
    #[serde(default)]
    pub address_norm: Option<String>,
    #[serde(default)]
    pub address_canonical: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub transaction_value: Option<f64>,
    #[serde(default)]
    pub private_area_m2: Option<f64>,
    #[serde(default)]
    pub built_area_m2: Option<f64>,
    #[serde(default)]
    pub via_code: Option<String>,
    #[serde(default)]
    pub via_label: Option<String>,
    #[serde(default)]
    pub primary_number: Option<f64>,
    #[serde(default)]
    pub secondary_number: Option<f64>,
    #[serde(default)]
    pub tertiary_number: Option<f64>,
    #[serde(default)]
    pub quadrant: Option<String>,
}

impl AddressRecord {
    pub fn new(id: impl Into<String>, address_raw: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address_raw: address_raw.into(),
            address_norm: None,
            address_canonical: None,
            municipality: None,
            department: None,
            neighborhood: None,
            transaction_value: None,
            private_area_m2: None,
            built_area_m2: None,
            via_code: None,
            via_label: None,
            primary_number: None,
            secondary_number: None,
            tertiary_number: None,
            quadrant: None,
        }
    }

    /// Fill the structured columns from a parsed address.
    #[must_use]
    pub fn with_structure(mut self, addr: &NormalizedAddress) -> Self {
        self.via_code = addr.via_code().map(|c| c.as_str().to_string());
        self.via_label = addr.via_label().map(str::to_string);
        self.primary_number = addr.primary_number();
        self.secondary_number = addr.secondary_number();
        self.tertiary_number = addr.tertiary_number();
        self.quadrant = addr.quadrant().map(|q| q.as_str().to_string());
        self.neighborhood = addr.neighborhood().map(str::to_string);
        self.municipality = addr.municipality().map(str::to_string);
        self.department = addr.department().map(str::to_string);
        if !addr.address_struct().is_empty() {
            self.address_canonical = Some(addr.address_struct().to_string());
        }
        self
    }

    pub fn summary(&self) -> AddressSummary {
        AddressSummary {
            id: self.id.clone(),
            address_raw: self.address_raw.clone(),
            address_norm: self.address_norm.clone(),
            address_canonical: self.address_canonical.clone(),
            municipality: self.municipality.clone(),
            neighborhood: self.neighborhood.clone(),
            transaction_value: self.transaction_value,
            private_area_m2: self.private_area_m2,
            built_area_m2: self.built_area_m2,
        }
    }

    /// Drop the structured columns, keeping what [`Projection::Summary`] exposes.
    pub fn project(mut self, projection: Projection) -> Self {
        if projection == Projection::Summary {
            self.department = None;
            self.via_code = None;
            self.via_label = None;
            self.primary_number = None;
            self.secondary_number = None;
            self.tertiary_number = None;
            self.quadrant = None;
        }
        self
    }

    /// Structured view of the stored columns. Via aliases are canonicalised
    /// through the gazetteer; unknown codes and quadrants are treated as absent.
    pub fn normalized(&self, gazetteer: &Gazetteer) -> NormalizedAddress {
        AddressParts {
            via_code: self.via_code.as_deref().and_then(|c| gazetteer.canonical_via(c)),
            via_label: self.via_label.clone(),
            primary_number: self.primary_number,
            secondary_number: self.secondary_number,
            tertiary_number: self.tertiary_number,
            quadrant: self.quadrant.as_deref().and_then(|q| q.parse().ok()),
            neighborhood: self.neighborhood.clone(),
            municipality: self.municipality.clone(),
            department: self.department.clone(),
        }
        .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::ViaCode;

    #[test]
    fn test_normalized_canonicalises_alias() {
        let mut record = AddressRecord::new("a1", "CARRERA 81 # 55-30");
        record.via_code = Some("carrera".to_string());
        record.via_label = Some("81".to_string());
        record.primary_number = Some(55.0);
        record.quadrant = Some("Sur".to_string());

        let addr = record.normalized(&Gazetteer::default());
        assert_eq!(addr.via_code(), Some(ViaCode::Kr));
        assert_eq!(addr.primary_number(), Some(55.0));
        assert_eq!(addr.quadrant(), Some(crate::address::Quadrant::Sur));
    }

    #[test]
    fn test_summary_projection_drops_structure() {
        let mut record = AddressRecord::new("a1", "CL 10 5 20");
        record.via_code = Some("cl".to_string());
        record.municipality = Some("cali".to_string());

        let projected = record.project(Projection::Summary);
        assert!(projected.via_code.is_none());
        assert_eq!(projected.municipality.as_deref(), Some("cali"));
    }

    #[test]
    fn test_record_deserializes_with_missing_columns() {
        let record: AddressRecord =
            serde_json::from_str(r#"{"id": "x", "addressRaw": "KR 7 72 10"}"#).unwrap();
        assert_eq!(record.id, "x");
        assert!(record.primary_number.is_none());
    }
}
