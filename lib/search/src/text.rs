//! Text preparation for embeddings.

use once_cell::sync::Lazy;
use regex::Regex;
use viaprox_core::{address::format_number, AddressRecord, NormalizedAddress};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s#\-áéíóúñüÁÉÍÓÚÑÜ]").expect("disallowed chars regex"));

/// `(pattern, replacement)` applied in order by [`normalize_for_embedding`].
static ABBREVIATIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\bcalle\b", "cl"),
        (r"\bcarrera\b", "kr"),
        (r"\bavenida\b", "av"),
        (r"\btransversal\b", "tv"),
        (r"\bdiagonal\b", "dg"),
        (r"\s+no\s+", " # "),
        (r"\s+num\s+", " # "),
        (r"\s+numero\s+", " # "),
    ]
    .into_iter()
    .map(|(p, r)| (Regex::new(p).expect("abbreviation regex"), r))
    .collect()
});

fn collapse(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").trim().to_string()
}

/// Collapse whitespace and drop punctuation other than `#` and `-`, keeping
/// case and accents.
pub fn clean_for_embedding(raw: &str) -> String {
    let collapsed = collapse(raw);
    collapse(&DISALLOWED.replace_all(&collapsed, " "))
}

/// Lower-case and fold common via words and number connectors.
pub fn normalize_for_embedding(raw: &str) -> String {
    let mut text = raw.trim().to_lowercase();
    for (re, replacement) in ABBREVIATIONS.iter() {
        text = re.replace_all(&text, *replacement).into_owned();
    }
    collapse(&text)
}

/// Field-level view used to build an embedding text.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingFields<'a> {
    pub address_raw: Option<&'a str>,
    pub address_norm: Option<&'a str>,
    pub address_canonical: Option<&'a str>,
    pub via_code: Option<&'a str>,
    pub via_label: Option<&'a str>,
    pub primary_number: Option<f64>,
    pub secondary_number: Option<f64>,
    pub neighborhood: Option<&'a str>,
    pub municipality: Option<&'a str>,
}

impl<'a> EmbeddingFields<'a> {
    /// Raw query text plus its parsed structure.
    pub fn from_query(raw: &'a str, parsed: &'a NormalizedAddress) -> Self {
        Self {
            address_raw: Some(raw),
            address_norm: None,
            address_canonical: Some(parsed.address_struct()).filter(|s| !s.is_empty()),
            via_code: parsed.via_code().map(|c| c.as_str()),
            via_label: parsed.via_label(),
            primary_number: parsed.primary_number(),
            secondary_number: parsed.secondary_number(),
            neighborhood: parsed.neighborhood(),
            municipality: parsed.municipality(),
        }
    }

    /// A stored row; `canonical_via` replaces whatever alias the row carries.
    pub fn from_record(record: &'a AddressRecord, canonical_via: Option<&'a str>) -> Self {
        Self {
            address_raw: Some(record.address_raw.as_str()).filter(|s| !s.is_empty()),
            address_norm: record.address_norm.as_deref(),
            address_canonical: record.address_canonical.as_deref(),
            via_code: canonical_via.or(record.via_code.as_deref()),
            via_label: record.via_label.as_deref(),
            primary_number: record.primary_number,
            secondary_number: record.secondary_number,
            neighborhood: record.neighborhood.as_deref(),
            municipality: record.municipality.as_deref(),
        }
    }
}

/// Every available variant of the address joined with `" | "`: normalised
/// raw/norm/canonical text (duplicates skipped), the structured
/// `"<via> <label> <primary> [<secondary>]"` form, neighborhood, municipality.
pub fn address_embedding_text(fields: &EmbeddingFields<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(raw) = fields.address_raw {
        parts.push(normalize_for_embedding(raw));
    }
    if let Some(norm) = fields.address_norm.filter(|n| Some(*n) != fields.address_raw) {
        parts.push(normalize_for_embedding(norm));
    }
    if let Some(canonical) = fields
        .address_canonical
        .filter(|c| Some(*c) != fields.address_norm && Some(*c) != fields.address_raw)
    {
        parts.push(normalize_for_embedding(canonical));
    }

    if let (Some(code), Some(label), Some(primary)) =
        (fields.via_code, fields.via_label, fields.primary_number)
    {
        let mut structured = format!("{} {} {}", code, label, format_number(primary));
        if let Some(secondary) = fields.secondary_number {
            structured.push(' ');
            structured.push_str(&format_number(secondary));
        }
        parts.push(structured);
    }

    if let Some(neighborhood) = fields.neighborhood {
        parts.push(neighborhood.to_lowercase());
    }
    if let Some(municipality) = fields.municipality {
        parts.push(municipality.to_lowercase());
    }

    parts.retain(|p| !p.is_empty());
    parts.join(" | ")
}
