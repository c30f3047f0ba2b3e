//! Bed and ward code normalization.
//!
//! The same bed is printed as "G7", "012-7" or "012.012-0007" depending on
//! the page. Matching expands the requested bed into every form it may take
//! and compares by containment.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::WardTable;
use crate::models::{BedLocation, Patient};

static LETTER_BED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z])(\d+)$").expect("valid letter bed regex"));

static TRAILING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)(\d+)$").expect("valid trailing digits regex"));

static DOTTED_WARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{3})\.\d{3}\s*-\s*(\d+)$").expect("valid dotted ward regex")
});

static NAMED_WARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{3})\s*-\s*(?:\D.*?\s+)?(\d+)$").expect("valid named ward regex")
});

static LETTER_WITH_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:ENFERMARIA\s+)?([A-Z])\s*[-.]?\s*(\d+)$").expect("valid ward letter regex")
});

/// Every plausible system form of a free-form bed, identity first, without duplicates.
pub fn bed_candidates(bed: &str, wards: &WardTable) -> Vec<String> {
    let text = bed.trim().to_uppercase();
    if text.is_empty() {
        return Vec::new();
    }
    let mut out = vec![text.clone()];

    if let Some(caps) = LETTER_BED.captures(&text) {
        let letter = &caps[1];
        let num = &caps[2];
        if let Some(code) = letter.chars().next().and_then(|c| wards.code_for_letter(c)) {
            out.push(format!("{code}.{code}-{num:0>4}"));
            out.push(format!("{code}-{num}"));
            out.push(format!("{letter}{num}"));
        }
    }

    if let Some(caps) = TRAILING_DIGITS.captures(&text) {
        let prefix = &caps[1];
        let num = &caps[2];
        for width in [2, 3, 4] {
            out.push(format!("{prefix}{num:0>width$}"));
        }
    }

    let mut seen = std::collections::HashSet::new();
    out.retain(|c| seen.insert(c.clone()));
    out
}

fn compact(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Whether a patient's printed bed refers to the requested bed.
///
/// True when any candidate form of `requested` contains, or is contained in,
/// `patient_bed`, ignoring case and whitespace. Empty beds never match.
pub fn beds_match(requested: &str, patient_bed: &str, wards: &WardTable) -> bool {
    let target = compact(patient_bed);
    if target.is_empty() {
        return false;
    }
    bed_candidates(requested, wards)
        .iter()
        .map(|c| compact(c))
        .filter(|c| !c.is_empty())
        .any(|c| target.contains(&c) || c.contains(&target))
}

/// Patients whose bed matches `bed`.
pub fn patients_in_bed<'a>(patients: &'a [Patient], bed: &str, wards: &WardTable) -> Vec<&'a Patient> {
    patients
        .iter()
        .filter(|p| beds_match(bed, &p.bed.raw, wards))
        .collect()
}

fn strip_zeros(num: &str) -> String {
    let trimmed = num.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Split a printed bed into ward code and bed number when the form is known.
pub fn normalize_bed(raw: &str, wards: &WardTable) -> BedLocation {
    let text = raw.trim();
    let upper = text.to_uppercase();
    let (ward, bed) = if let Some(caps) = DOTTED_WARD.captures(&upper) {
        (Some(caps[1].to_string()), Some(strip_zeros(&caps[2])))
    } else if let Some(caps) = NAMED_WARD.captures(&upper) {
        (Some(caps[1].to_string()), Some(strip_zeros(&caps[2])))
    } else if let Some(caps) = LETTER_WITH_SEPARATOR.captures(&upper) {
        let code = caps[1]
            .chars()
            .next()
            .and_then(|c| wards.code_for_letter(c))
            .map(str::to_string);
        match code {
            Some(code) => (Some(code), Some(strip_zeros(&caps[2]))),
            None => (None, None),
        }
    } else {
        (None, None)
    };
    BedLocation {
        raw: text.to_string(),
        ward,
        bed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wards() -> WardTable {
        WardTable::new()
    }

    #[test]
    fn test_letter_bed_candidates() {
        let c = bed_candidates("G7", &wards());
        assert!(c.contains(&"012.012-0007".to_string()));
        assert!(c.contains(&"012-7".to_string()));
        assert!(c.contains(&"G7".to_string()));
        assert!(c.contains(&"G07".to_string()));
        assert!(c.contains(&"G0007".to_string()));
        assert_eq!(c[0], "G7");
    }

    #[test]
    fn test_candidates_are_unique() {
        let c = bed_candidates("g7", &wards());
        let mut sorted = c.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), c.len());
    }

    #[test]
    fn test_unknown_letter_only_pads() {
        let c = bed_candidates("Z12", &wards());
        assert_eq!(c, vec!["Z12", "Z012", "Z0012"]);
    }

    #[test]
    fn test_beds_match_across_formats() {
        let w = wards();
        assert!(beds_match("G7", "012.012-0007", &w));
        assert!(beds_match("G7", " g 7 ", &w));
        assert!(beds_match("012.012-0007", "012.012-0007 ", &w));
        assert!(!beds_match("G7", "012.012-0017", &w));
        assert!(!beds_match("G7", "", &w));
        assert!(!beds_match("", "G7", &w));
    }

    #[test]
    fn test_normalize_bed_forms() {
        let w = wards();
        let dotted = normalize_bed("012.012-0007", &w);
        assert_eq!(dotted.ward.as_deref(), Some("012"));
        assert_eq!(dotted.bed.as_deref(), Some("7"));

        let named = normalize_bed("001-UTI Adulto 15", &w);
        assert_eq!(named.ward.as_deref(), Some("001"));
        assert_eq!(named.bed.as_deref(), Some("15"));

        let letter = normalize_bed("H-03", &w);
        assert_eq!(letter.ward.as_deref(), Some("013"));
        assert_eq!(letter.bed.as_deref(), Some("3"));

        let unknown = normalize_bed("Corredor", &w);
        assert_eq!(unknown.raw, "Corredor");
        assert!(unknown.ward.is_none() && unknown.bed.is_none());
    }

    #[test]
    fn test_patients_in_bed() {
        let w = wards();
        let mut a = Patient::new("1", "Ana");
        a.bed = normalize_bed("012.012-0007", &w);
        let mut b = Patient::new("2", "Bia");
        b.bed = normalize_bed("012.012-0008", &w);
        let patients = vec![a, b];
        let found = patients_in_bed(&patients, "G7", &w);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Ana");
    }
}
