//! Raw address text -> [`NormalizedAddress`].
//!
//! Every stage is an ordered list of `(pattern, extractor)` rules evaluated
//! first-match-wins. Patterns overlap heavily (`c` is a prefix of `cl`, `kr`
//! rules also match inside generic rules), so rule order is part of the
//! contract and is covered rule-by-rule in the tests below.
//!
//! Parsing never fails: fields that cannot be recovered are left absent.

use crate::address::{leading_digits, AddressParts, NormalizedAddress, Quadrant, ViaCode};
use crate::gazetteer::Gazetteer;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

struct ViaRule {
    name: &'static str,
    regex: Regex,
}

/// Composite number pattern. Capture groups hold the via number, the
/// primary number and the optional secondary number.
struct NumberRule {
    name: &'static str,
    regex: Regex,
    via: usize,
    primary: usize,
    secondary: usize,
}

fn via_rule(name: &'static str, pattern: &str) -> ViaRule {
    ViaRule {
        name,
        regex: Regex::new(pattern).expect("via rule regex"),
    }
}

fn number_rule(name: &'static str, pattern: &str) -> NumberRule {
    NumberRule {
        name,
        regex: Regex::new(pattern).expect("number rule regex"),
        via: 1,
        primary: 2,
        secondary: 3,
    }
}

/// Via type detection. The bare `c` form is tried last.
static VIA_CODE_RULES: Lazy<Vec<ViaRule>> = Lazy::new(|| {
    vec![
        via_rule("calle", r"\b(calle|cl|cll)\s+(\d+[a-z]*)"),
        via_rule("carrera", r"\b(carrera|cr|krr|carr|kr|k)\s+(\d+[a-z]*)"),
        via_rule("avenida", r"\b(avenida|av|avd|ac|ak)\s+(\d+[a-z]*)"),
        via_rule("transversal", r"\b(transversal|tv|trans)\s+(\d+[a-z]*)"),
        via_rule("diagonal", r"\b(diagonal|dg|diag)\s+(\d+[a-z]*)"),
        via_rule("autopista", r"\b(autopista|ap)\s+(\d+[a-z]*)"),
        via_rule("calle_bare", r"\b(c)\s+(\d+[a-z\s]*)"),
    ]
});

/// Via label capture; `c` folds into the calle rule here.
static VIA_LABEL_RULES: Lazy<Vec<ViaRule>> = Lazy::new(|| {
    vec![
        via_rule("calle", r"\b(calle|cl|cll|c)\s+(\d+[a-z]*)"),
        via_rule("carrera", r"\b(carrera|cr|krr|carr|kr|k)\s+(\d+[a-z]*)"),
        via_rule("avenida", r"\b(avenida|av|avd|ac|ak)\s+(\d+[a-z]*)"),
        via_rule("transversal", r"\b(transversal|tv|trans)\s+(\d+[a-z]*)"),
        via_rule("diagonal", r"\b(diagonal|dg|diag)\s+(\d+[a-z]*)"),
        via_rule("autopista", r"\b(autopista|ap)\s+(\d+[a-z]*)"),
    ]
});

/// Unit qualifiers whose numbers must never be read as address numbers.
static QUALIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:apartment|ap|interior|in|tower|to|garage|gj|block|bl|bq|edificio|ed|casa|ca|local|lc|piso|ps|oficina|of)\s+\d+",
    )
    .expect("qualifier regex")
});

static INTERIOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"int\.\s*\d+").expect("interior regex"));

const GENERIC_VIA: &str = "(?:kr|cl|av|tv|dg|ac|ak|carrera|calle|avenida|transversal|diagonal|c|k)";

static NUMBER_RULES: Lazy<Vec<NumberRule>> = Lazy::new(|| {
    vec![
        // ac 68 sur 70 70
        number_rule(
            "avenida_quadrant",
            r"(?:ac|ak|av)\s+(\d+[a-z]*)\s+(?:sur|norte|este|oeste)?\s*(\d+)\s+(\d+)",
        ),
        // diagonal 80 # 7 - 100
        number_rule(
            "diagonal_hash",
            r"(?:diagonal|dg|diag)\s+(\d+[a-z]*)\s*#\s*(\d+)(?:\s*[-]\s*(\d+))?",
        ),
        // kr 19a 159 84
        number_rule(
            "carrera_spaced",
            r"(?:kr|carrera|cr|carr|k)\s+(\d+[a-z]*)\s+(\d+[a-z]*)\s+(\d+)",
        ),
        // tv 65 59 21 sur
        number_rule(
            "transversal_spaced",
            r"(?:tv|transversal|trans)\s+(\d+[a-z]*)\s+(\d+[a-z]*)\s+(\d+)",
        ),
        // cl 152b 73 36
        number_rule(
            "calle_spaced",
            r"(?:cl|calle|cll|c)\s+(\d+[a-z]*)\s+(\d+[a-z]*)\s+(\d+)",
        ),
        // kr 81 #55-30
        number_rule(
            "generic_hash",
            &format!(r"{}\s+(\d+[a-z]*)\s*#\s*(\d+)(?:[-\s]+(\d+))?", GENERIC_VIA),
        ),
        // kr 81 55 30
        number_rule(
            "generic_spaced",
            &format!(r"{}\s+(\d+[a-z]*)\s+(\d+[a-z]*)(?:\s+(\d+))?", GENERIC_VIA),
        ),
    ]
});

static FALLBACK_NUMBERS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d+)(?:[-\s]+(\d+))?(?:[-\s]+(\d+))?\b").expect("fallback numbers regex")
});

static QUADRANT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(norte|sur|este|oeste|noreste|noroeste|sureste|suroeste)\b")
        .expect("quadrant regex")
});

static NEIGHBORHOOD_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bbarrio\s+([a-záéíóúñü\s]+)",
        r"\bb\.\s+([a-záéíóúñü\s]+)",
        r"\bbrr\.\s+([a-záéíóúñü\s]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("neighborhood regex"))
    .collect()
});

/// Address numbers recovered from free text.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AddressNumbers {
    pub primary: Option<f64>,
    pub secondary: Option<f64>,
    pub tertiary: Option<f64>,
    /// Name of the composite rule that matched, `None` for the generic fallback.
    pub rule: Option<&'static str>,
}

/// Turns raw address text into a [`NormalizedAddress`].
#[derive(Debug, Clone)]
pub struct AddressParser {
    gazetteer: Arc<Gazetteer>,
}

impl Default for AddressParser {
    fn default() -> Self {
        Self::new(Arc::new(Gazetteer::default()))
    }
}

impl AddressParser {
    pub fn new(gazetteer: Arc<Gazetteer>) -> Self {
        Self { gazetteer }
    }

    pub fn gazetteer(&self) -> &Arc<Gazetteer> {
        &self.gazetteer
    }

    pub fn parse(&self, raw: &str) -> NormalizedAddress {
        let text = raw.trim().to_lowercase();
        let numbers = extract_numbers(&text);

        AddressParts {
            via_code: self.extract_via_code(&text),
            via_label: extract_via_label(&text),
            primary_number: numbers.primary,
            secondary_number: numbers.secondary,
            tertiary_number: numbers.tertiary,
            quadrant: extract_quadrant(&text),
            neighborhood: extract_neighborhood(&text),
            municipality: self.gazetteer.find_municipality(&text).map(str::to_string),
            department: self.gazetteer.find_department(&text).map(str::to_string),
        }
        .build()
    }

    /// First via rule that matches and whose type token the gazetteer knows.
    pub fn extract_via_code(&self, text: &str) -> Option<ViaCode> {
        VIA_CODE_RULES.iter().find_map(|rule| {
            let caps = rule.regex.captures(text)?;
            self.gazetteer.canonical_via(caps.get(1)?.as_str())
        })
    }
}

/// Token following the via type word, independent of via code detection.
pub fn extract_via_label(text: &str) -> Option<String> {
    VIA_LABEL_RULES
        .iter()
        .find_map(|rule| rule.regex.captures(text))
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Remove unit qualifiers ("ap 301", "int. 9906") and their numbers.
pub fn strip_qualifiers(text: &str) -> String {
    let without_units = QUALIFIER_RE.replace_all(text, "");
    INTERIOR_RE.replace_all(&without_units, "").into_owned()
}

pub fn extract_numbers(text: &str) -> AddressNumbers {
    let clean = strip_qualifiers(text);

    for rule in NUMBER_RULES.iter() {
        let Some(caps) = rule.regex.captures(&clean) else {
            continue;
        };
        let group = |i: usize| caps.get(i).and_then(|m| leading_digits(m.as_str()));
        let via_number = group(rule.via);
        return AddressNumbers {
            primary: group(rule.primary).or(via_number),
            secondary: group(rule.secondary),
            tertiary: None,
            rule: Some(rule.name),
        };
    }

    match FALLBACK_NUMBERS_RE.captures(&clean) {
        Some(caps) => {
            let group = |i: usize| caps.get(i).and_then(|m| leading_digits(m.as_str()));
            AddressNumbers {
                primary: group(1),
                secondary: group(2),
                tertiary: group(3),
                rule: None,
            }
        }
        None => AddressNumbers::default(),
    }
}

pub fn extract_quadrant(text: &str) -> Option<Quadrant> {
    QUADRANT_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn extract_neighborhood(text: &str) -> Option<String> {
    NEIGHBORHOOD_RULES
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|n| !n.is_empty())
}

#[doc(hidden)]
pub fn number_rule_names() -> Vec<&'static str> {
    NUMBER_RULES.iter().map(|r| r.name).collect()
}

#[doc(hidden)]
pub fn via_rule_names() -> Vec<&'static str> {
    VIA_CODE_RULES.iter().map(|r| r.name).collect()
}
