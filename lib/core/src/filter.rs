// Storage-agnostic filter expressions over address rows
use crate::record::AddressRecord;
use std::fmt;

pub trait Filter {
    fn matches(&self, record: &AddressRecord) -> bool;
}

/// Column a filter clause reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    ViaCode,
    ViaLabel,
    /// Digits of the stored via label, read as one number (0 when there are none).
    ViaLabelDigits,
    PrimaryNumber,
    SecondaryNumber,
    TertiaryNumber,
    Quadrant,
    Neighborhood,
    Municipality,
    Department,
}

impl Field {
    pub fn column(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::ViaCode => "via_code",
            Field::ViaLabel => "via_label",
            Field::ViaLabelDigits => "digits(via_label)",
            Field::PrimaryNumber => "primary_number",
            Field::SecondaryNumber => "secondary_number",
            Field::TertiaryNumber => "tertiary_number",
            Field::Quadrant => "quadrant",
            Field::Neighborhood => "neighborhood",
            Field::Municipality => "municipality",
            Field::Department => "department",
        }
    }

    fn text<'a>(self, record: &'a AddressRecord) -> Option<&'a str> {
        match self {
            Field::Id => Some(record.id.as_str()),
            Field::ViaCode => record.via_code.as_deref(),
            Field::ViaLabel => record.via_label.as_deref(),
            Field::Quadrant => record.quadrant.as_deref(),
            Field::Neighborhood => record.neighborhood.as_deref(),
            Field::Municipality => record.municipality.as_deref(),
            Field::Department => record.department.as_deref(),
            _ => None,
        }
    }

    fn number(self, record: &AddressRecord) -> Option<f64> {
        match self {
            Field::PrimaryNumber => record.primary_number,
            Field::SecondaryNumber => record.secondary_number,
            Field::TertiaryNumber => record.tertiary_number,
            Field::ViaLabelDigits => Some(label_digits(record.via_label.as_deref())),
            _ => None,
        }
    }
}

/// All digits of a label concatenated and read as a number; 0 when absent.
pub fn label_digits(label: Option<&str>) -> f64 {
    let digits: String = label
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<f64>().unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        FilterValue::Number(n)
    }
}

/// Boolean expression tree. An empty `And` matches every row, an empty `Or`
/// matches none.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Eq { field: Field, value: FilterValue },
    /// Inclusive on both ends.
    Range { field: Field, min: f64, max: f64 },
    /// Substring containment on a text column.
    Like { field: Field, pattern: String },
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
}

impl FilterExpr {
    pub fn eq(field: Field, value: impl Into<FilterValue>) -> Self {
        FilterExpr::Eq { field, value: value.into() }
    }

    pub fn range(field: Field, min: f64, max: f64) -> Self {
        FilterExpr::Range { field, min, max }
    }

    pub fn like(field: Field, pattern: impl Into<String>) -> Self {
        FilterExpr::Like { field, pattern: pattern.into() }
    }

    /// `field` equal to any of `values`.
    pub fn any_of<I, S>(field: Field, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FilterValue>,
    {
        FilterExpr::Or(values.into_iter().map(|v| FilterExpr::eq(field, v)).collect())
    }

    pub fn match_all() -> Self {
        FilterExpr::And(Vec::new())
    }

    pub fn match_none() -> Self {
        FilterExpr::Or(Vec::new())
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, FilterExpr::And(c) if c.is_empty())
    }

    /// AND two expressions, skipping trivially-true operands.
    #[must_use]
    pub fn and(self, other: FilterExpr) -> FilterExpr {
        match (self, other) {
            (a, b) if b.is_match_all() => a,
            (a, b) if a.is_match_all() => b,
            (FilterExpr::And(mut left), FilterExpr::And(right)) => {
                left.extend(right);
                FilterExpr::And(left)
            }
            (FilterExpr::And(mut left), b) => {
                left.push(b);
                FilterExpr::And(left)
            }
            (a, b) => FilterExpr::And(vec![a, b]),
        }
    }

    fn matches_condition(condition: &FilterExpr, record: &AddressRecord) -> bool {
        match condition {
            FilterExpr::Eq { field, value } => match value {
                FilterValue::Text(expected) => field
                    .text(record)
                    .map(|v| v == expected)
                    .unwrap_or(false),
                FilterValue::Number(expected) => field
                    .number(record)
                    .map(|v| (v - expected).abs() < f64::EPSILON)
                    .unwrap_or(false),
            },
            FilterExpr::Range { field, min, max } => field
                .number(record)
                .map(|v| v >= *min && v <= *max)
                .unwrap_or(false),
            FilterExpr::Like { field, pattern } => field
                .text(record)
                .map(|v| v.contains(pattern.as_str()))
                .unwrap_or(false),
            FilterExpr::And(conditions) => {
                conditions.iter().all(|c| Self::matches_condition(c, record))
            }
            FilterExpr::Or(conditions) => {
                conditions.iter().any(|c| Self::matches_condition(c, record))
            }
        }
    }
}

impl Filter for FilterExpr {
    fn matches(&self, record: &AddressRecord) -> bool {
        Self::matches_condition(self, record)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            FilterValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Eq { field, value } => write!(f, "{} = {}", field.column(), value),
            FilterExpr::Range { field, min, max } => {
                write!(f, "{} BETWEEN {} AND {}", field.column(), min, max)
            }
            FilterExpr::Like { field, pattern } => {
                write!(f, "{} LIKE '%{}%'", field.column(), pattern.replace('\'', "''"))
            }
            FilterExpr::And(c) if c.is_empty() => f.write_str("TRUE"),
            FilterExpr::Or(c) if c.is_empty() => f.write_str("FALSE"),
            FilterExpr::And(c) => write_joined(f, c, " AND "),
            FilterExpr::Or(c) => write_joined(f, c, " OR "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[FilterExpr], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", part)?;
    }
    f.write_str(")")
}
