//! Value, unit and reference-range parsing for lab results.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::ResultStatus;

static NON_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.,\-]").expect("valid non-numeric regex"));

static LEADING_FLOAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(?:\.\d+)?").expect("valid float regex"));

static TRAILING_UNIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]\s*([a-zA-Z/%²³µ]+)$").expect("valid unit regex"));

const NUMBER: &str = r"(-?\d+(?:[.,]\d+)*)";

static BOUNDED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i){NUMBER}\s*(?:-|–|at[eé]|a|à)\s*{NUMBER}"))
        .expect("valid bounded range regex")
});

static UPPER_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)(?:at[eé]|<=?|≤|inferior\s+a)\s*{NUMBER}"))
        .expect("valid upper bound regex")
});

static LOWER_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)(?:>=?|≥|superior\s+a)\s*{NUMBER}"))
        .expect("valid lower bound regex")
});

/// Numeric reading of a printed value.
///
/// Everything but digits, separators and minus is dropped, the first decimal
/// comma becomes a point, and the leading number is parsed.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let cleaned = NON_NUMERIC.replace_all(text, "").replacen(',', ".", 1);
    LEADING_FLOAT
        .find(&cleaned)
        .and_then(|m| m.as_str().parse().ok())
}

/// Unit of a printed value: the trailing alphabetic/percent run after the
/// number, else the first vocabulary entry the value contains.
pub fn unit_of(value: &str, vocabulary: &[String]) -> Option<String> {
    let value = value.trim();
    if let Some(caps) = TRAILING_UNIT.captures(value) {
        return Some(caps[1].to_string());
    }
    vocabulary
        .iter()
        .find(|unit| !unit.is_empty() && value.contains(unit.as_str()))
        .cloned()
}

/// Bounds parsed from a printed reference range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceRange {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl ReferenceRange {
    pub fn contains(&self, value: f64) -> bool {
        self.low.map_or(true, |low| value >= low) && self.high.map_or(true, |high| value <= high)
    }
}

/// Recognizes `a - b`, `a a b`, `a até b`, `até x`, `< x` and `> x`.
pub fn parse_reference(text: &str) -> Option<ReferenceRange> {
    if let Some(caps) = BOUNDED.captures(text) {
        let low = parse_decimal(&caps[1]);
        let high = parse_decimal(&caps[2]);
        if low.is_some() && high.is_some() {
            return Some(ReferenceRange { low, high });
        }
    }
    if let Some(caps) = UPPER_ONLY.captures(text) {
        return parse_decimal(&caps[1]).map(|high| ReferenceRange {
            low: None,
            high: Some(high),
        });
    }
    if let Some(caps) = LOWER_ONLY.captures(text) {
        return parse_decimal(&caps[1]).map(|low| ReferenceRange {
            low: Some(low),
            high: None,
        });
    }
    None
}

/// Status of a value against its reference.
///
/// A value the lab flagged (red font) is altered regardless of the range. A
/// missing reference gives `NoReference`; a reference or value that cannot be
/// read gives `Normal`.
pub fn infer_status(numeric: Option<f64>, reference: Option<&str>, flagged: bool) -> ResultStatus {
    if flagged {
        return ResultStatus::Altered;
    }
    let Some(reference) = reference.filter(|r| !r.trim().is_empty()) else {
        return ResultStatus::NoReference;
    };
    match (numeric, parse_reference(reference)) {
        (Some(value), Some(range)) if !range.contains(value) => ResultStatus::Altered,
        _ => ResultStatus::Normal,
    }
}
