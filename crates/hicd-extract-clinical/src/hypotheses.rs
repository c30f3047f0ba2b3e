//! Diagnostic hypothesis extraction.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

/// Cap on hypotheses taken from labeled patterns. ICD codes found afterwards
/// are not counted.
pub const MAX_HYPOTHESES: usize = 10;

/// Hypotheses shorter than this are noise ("HD: ?").
const MIN_HYPOTHESIS: usize = 5;

/// Prefix compared when discarding near-duplicates.
const DUPLICATE_PREFIX: usize = 20;

static LABELED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(?:hipótese|hipóteses|diagnóstico|diagnósticos|suspeita|suspeitas)s?\s*(?:diagnóstica[s]?)?[:\s]*([^.]+)",
        r"(?i)\bHD\b[:\s]*([^.]+)",
        r"(?i)\bDX\b[:\s]*([^.]+)",
        r"(?i)\bCID\b[:\s]*([A-Z]\d{2}[^.]*)",
        r"(?i)(?:impressão diagnóstica|impressão clínica)[:\s]*([^.]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid hypothesis regex"))
    .collect()
});

static ICD_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z]\d{2}(?:\.\d{1,2})?\b").expect("valid ICD code regex")
});

/// Extract diagnostic hypotheses from a note's flattened text.
///
/// Labeled captures come first, in pattern order. A capture is kept when it
/// is longer than five characters and no kept hypothesis already contains its
/// first twenty characters. Bare ICD codes not mentioned by any kept
/// hypothesis are then appended as `"CID: <code>"`.
pub fn extract_hypotheses(text: &str) -> Vec<String> {
    let mut hypotheses: Vec<String> = Vec::new();

    'patterns: for pattern in LABELED.iter() {
        for caps in pattern.captures_iter(text) {
            if hypotheses.len() >= MAX_HYPOTHESES {
                break 'patterns;
            }
            let hypothesis = caps[1].trim();
            if hypothesis.chars().count() <= MIN_HYPOTHESIS {
                continue;
            }
            let prefix: String = hypothesis.chars().take(DUPLICATE_PREFIX).collect();
            if hypotheses.iter().any(|h| h.contains(&prefix)) {
                trace!(hypothesis, "skipping near-duplicate hypothesis");
                continue;
            }
            hypotheses.push(hypothesis.to_string());
        }
    }
    let labeled = hypotheses.len();

    for code in ICD_CODE.find_iter(text).map(|m| m.as_str()) {
        if !hypotheses.iter().any(|h| h.contains(code)) {
            hypotheses.push(format!("CID: {code}"));
        }
    }

    debug!(
        labeled,
        codes = hypotheses.len() - labeled,
        "extracted diagnostic hypotheses"
    );
    hypotheses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hypothesis_and_single_icd() {
        let found = extract_hypotheses("Hipótese diagnóstica: Pneumonia. CID: J18.9");
        assert!(found.contains(&"Pneumonia".to_string()));
        assert_eq!(found.iter().filter(|h| *h == "CID: J18.9").count(), 1);
    }

    #[test]
    fn test_abbreviations() {
        let found = extract_hypotheses("HD: insuficiência cardíaca descompensada. Dx: DPOC exacerbado.");
        assert_eq!(
            found,
            vec![
                "insuficiência cardíaca descompensada".to_string(),
                "DPOC exacerbado".to_string()
            ]
        );
    }

    #[test]
    fn test_abbreviation_needs_word_boundary() {
        assert!(extract_hypotheses("Paciente com shdx recorrente no pulmão").is_empty());
    }

    #[test]
    fn test_near_duplicates_dropped() {
        let text = "Hipótese: sepsis de foco urinário. Impressão clínica: sepsis de foco urinário provável.";
        let found = extract_hypotheses(text);
        assert_eq!(found, vec!["sepsis de foco urinário".to_string()]);
    }

    #[test]
    fn test_short_captures_dropped() {
        assert!(extract_hypotheses("HD: ?. Dx: a esc").is_empty());
    }

    #[test]
    fn test_icd_already_mentioned() {
        let found = extract_hypotheses("Diagnóstico: pneumonia (J18) em tratamento");
        assert_eq!(found, vec!["pneumonia (J18) em tratamento".to_string()]);
    }

    #[test]
    fn test_cap() {
        let text: String = (0..15)
            .map(|i| format!("Suspeita: {i:02} diagnostico em aberto. "))
            .collect();
        assert_eq!(extract_hypotheses(&text).len(), MAX_HYPOTHESES);
    }
}
