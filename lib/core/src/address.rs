//! Structured address value types.
//!
//! A [`NormalizedAddress`] is built once from [`AddressParts`] and never
//! mutated afterwards, so its canonical `address_struct` string always
//! agrees with the fields it was derived from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical category of a via (street axis).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViaCode {
    /// Calle
    Cl,
    /// Carrera
    Kr,
    /// Avenida (including avenida calle / avenida carrera)
    Av,
    /// Transversal
    Tv,
    /// Diagonal
    Dg,
    /// Autopista
    Ap,
}

impl ViaCode {
    pub const ALL: [ViaCode; 6] = [
        ViaCode::Cl,
        ViaCode::Kr,
        ViaCode::Av,
        ViaCode::Tv,
        ViaCode::Dg,
        ViaCode::Ap,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViaCode::Cl => "cl",
            ViaCode::Kr => "kr",
            ViaCode::Av => "av",
            ViaCode::Tv => "tv",
            ViaCode::Dg => "dg",
            ViaCode::Ap => "ap",
        }
    }
}

impl fmt::Display for ViaCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViaCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViaCode::ALL
            .into_iter()
            .find(|code| code.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown via code: {}", s))
    }
}

/// Cardinal or intercardinal qualifier appended to an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quadrant {
    Norte,
    Sur,
    Este,
    Oeste,
    Noreste,
    Noroeste,
    Sureste,
    Suroeste,
}

impl Quadrant {
    pub const ALL: [Quadrant; 8] = [
        Quadrant::Norte,
        Quadrant::Sur,
        Quadrant::Este,
        Quadrant::Oeste,
        Quadrant::Noreste,
        Quadrant::Noroeste,
        Quadrant::Sureste,
        Quadrant::Suroeste,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Quadrant::Norte => "norte",
            Quadrant::Sur => "sur",
            Quadrant::Este => "este",
            Quadrant::Oeste => "oeste",
            Quadrant::Noreste => "noreste",
            Quadrant::Noroeste => "noroeste",
            Quadrant::Sureste => "sureste",
            Quadrant::Suroeste => "suroeste",
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quadrant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quadrant::ALL
            .into_iter()
            .find(|q| q.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown quadrant: {}", s))
    }
}

/// Mutable field bag used to assemble a [`NormalizedAddress`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressParts {
    pub via_code: Option<ViaCode>,
    pub via_label: Option<String>,
    pub primary_number: Option<f64>,
    pub secondary_number: Option<f64>,
    pub tertiary_number: Option<f64>,
    pub quadrant: Option<Quadrant>,
    pub neighborhood: Option<String>,
    pub municipality: Option<String>,
    pub department: Option<String>,
}

impl AddressParts {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_via(mut self, code: ViaCode, label: impl Into<String>) -> Self {
        self.via_code = Some(code);
        self.via_label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_via_code(mut self, code: ViaCode) -> Self {
        self.via_code = Some(code);
        self
    }

    #[must_use]
    pub fn with_numbers(mut self, primary: f64, secondary: Option<f64>) -> Self {
        self.primary_number = Some(primary);
        self.secondary_number = secondary;
        self
    }

    #[must_use]
    pub fn with_quadrant(mut self, quadrant: Quadrant) -> Self {
        self.quadrant = Some(quadrant);
        self
    }

    #[must_use]
    pub fn with_neighborhood(mut self, neighborhood: impl Into<String>) -> Self {
        self.neighborhood = Some(neighborhood.into());
        self
    }

    #[must_use]
    pub fn with_municipality(mut self, municipality: impl Into<String>) -> Self {
        self.municipality = Some(municipality.into());
        self
    }

    #[must_use]
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn build(self) -> NormalizedAddress {
        NormalizedAddress::from_parts(self)
    }
}

/// A parsed, structured address. Every field is independently optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "AddressParts")]
pub struct NormalizedAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    via_code: Option<ViaCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    via_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    primary_number: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secondary_number: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tertiary_number: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quadrant: Option<Quadrant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    neighborhood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    municipality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    department: Option<String>,
    address_struct: String,
}

impl From<AddressParts> for NormalizedAddress {
    fn from(parts: AddressParts) -> Self {
        NormalizedAddress::from_parts(parts)
    }
}

impl Default for NormalizedAddress {
    fn default() -> Self {
        NormalizedAddress::from_parts(AddressParts::default())
    }
}

impl NormalizedAddress {
    pub fn from_parts(parts: AddressParts) -> Self {
        let address_struct = canonical_string(&parts);
        Self {
            via_code: parts.via_code,
            via_label: parts.via_label,
            primary_number: parts.primary_number,
            secondary_number: parts.secondary_number,
            tertiary_number: parts.tertiary_number,
            quadrant: parts.quadrant,
            neighborhood: parts.neighborhood,
            municipality: parts.municipality,
            department: parts.department,
            address_struct,
        }
    }

    /// Copy the fields back out, e.g. to derive a modified address.
    pub fn to_parts(&self) -> AddressParts {
        AddressParts {
            via_code: self.via_code,
            via_label: self.via_label.clone(),
            primary_number: self.primary_number,
            secondary_number: self.secondary_number,
            tertiary_number: self.tertiary_number,
            quadrant: self.quadrant,
            neighborhood: self.neighborhood.clone(),
            municipality: self.municipality.clone(),
            department: self.department.clone(),
        }
    }

    #[inline]
    pub fn via_code(&self) -> Option<ViaCode> {
        self.via_code
    }

    #[inline]
    pub fn via_label(&self) -> Option<&str> {
        self.via_label.as_deref()
    }

    #[inline]
    pub fn primary_number(&self) -> Option<f64> {
        self.primary_number
    }

    #[inline]
    pub fn secondary_number(&self) -> Option<f64> {
        self.secondary_number
    }

    #[inline]
    pub fn tertiary_number(&self) -> Option<f64> {
        self.tertiary_number
    }

    #[inline]
    pub fn quadrant(&self) -> Option<Quadrant> {
        self.quadrant
    }

    #[inline]
    pub fn neighborhood(&self) -> Option<&str> {
        self.neighborhood.as_deref()
    }

    #[inline]
    pub fn municipality(&self) -> Option<&str> {
        self.municipality.as_deref()
    }

    #[inline]
    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    /// Canonical string derived from the other fields.
    #[inline]
    pub fn address_struct(&self) -> &str {
        &self.address_struct
    }

    /// Numeric portion of the via label ("152b" -> 152).
    pub fn via_label_number(&self) -> Option<f64> {
        self.via_label.as_deref().and_then(leading_digits)
    }

    pub fn is_empty(&self) -> bool {
        self.to_parts() == AddressParts::default()
    }
}

/// First run of ASCII digits in `s`, parsed as a number.
pub fn leading_digits(s: &str) -> Option<f64> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let run: String = s[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
    run.parse::<u64>().ok().map(|n| n as f64)
}

/// Render an address number without a trailing ".0" for whole values.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn canonical_string(parts: &AddressParts) -> String {
    let mut out: Vec<String> = Vec::new();

    if let (Some(code), Some(label)) = (parts.via_code, parts.via_label.as_deref()) {
        out.push(format!("{} {}", code, label));
    }

    if let Some(primary) = parts.primary_number {
        out.push(format!("#{}", format_number(primary)));
        if let Some(secondary) = parts.secondary_number {
            out.push(format!("-{}", format_number(secondary)));
            if let Some(tertiary) = parts.tertiary_number {
                out.push(format!("-{}", format_number(tertiary)));
            }
        }
    }

    if let Some(neighborhood) = parts.neighborhood.as_deref() {
        out.push(format!("Barrio {}", neighborhood));
    }

    if let Some(municipality) = parts.municipality.as_deref() {
        out.push(municipality.to_string());
    }

    out.join(" ")
}
