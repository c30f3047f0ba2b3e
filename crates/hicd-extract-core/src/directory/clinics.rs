//! Clinic selector parsing.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::extract::{ContainerPattern, ElementPattern, Memo, RecordExtractor, RecordLayout};
use crate::models::{Clinic, ClinicStatus};

/// Option value meaning "no selection".
const NO_SELECTION: &str = "0";

const CLINIC_LAYOUT: RecordLayout = RecordLayout {
    containers: &[
        ContainerPattern::id("select", "clinica"),
        ContainerPattern::name("select", "clinica"),
        ContainerPattern::id("select", "co_clinica"),
        ContainerPattern::name("select", "co_clinica"),
    ],
    record: ElementPattern::tag("option"),
    field: None,
    fallback: &[
        "select#clinica option",
        "select[id*='clinica'] option",
        "select[name*='clinica'] option",
        "[role='listbox'] [role='option']",
    ],
    fallback_field: None,
    keep_empty: false,
};

/// Parser for the clinic selector page.
pub struct ClinicParser {
    records: RecordExtractor,
    memo: Memo<Vec<Clinic>>,
}

impl Default for ClinicParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ClinicParser {
    pub fn new() -> Self {
        Self {
            records: RecordExtractor::new(CLINIC_LAYOUT),
            memo: Memo::new(),
        }
    }

    /// Parse clinics, stamping them with the current time.
    ///
    /// Repeating a call with the same markup returns the cached listing,
    /// timestamp included.
    pub fn parse(&self, markup: &str) -> Vec<Clinic> {
        self.memo
            .get_or_compute(markup, "", || self.parse_at(markup, Utc::now()))
    }

    /// Parse clinics with an explicit fetch timestamp. Not cached.
    pub fn parse_at(&self, markup: &str, fetched_at: DateTime<Utc>) -> Vec<Clinic> {
        let stamp = fetched_at.to_rfc3339();
        let mut seen = HashSet::new();
        let mut skipped = 0usize;
        let clinics: Vec<Clinic> = self
            .records
            .extract(markup)
            .into_iter()
            .filter_map(|row| {
                let name = row.text.clone();
                let code = row
                    .attr("value")
                    .map(|v| v.trim().to_string())
                    .unwrap_or_else(|| name.clone());
                if code.is_empty() || name.is_empty() || code == NO_SELECTION {
                    skipped += 1;
                    return None;
                }
                if !seen.insert(code.clone()) {
                    skipped += 1;
                    return None;
                }
                Some(Clinic {
                    code,
                    name,
                    status: ClinicStatus::Active,
                    last_updated: stamp.clone(),
                })
            })
            .collect();
        debug!(clinics = clinics.len(), skipped, "parsed clinic selector");
        clinics
    }

    /// Find one clinic by code.
    pub fn find_by_code(&self, markup: &str, code: &str) -> Option<Clinic> {
        self.parse(markup).into_iter().find(|c| c.code == code)
    }

    /// All clinic codes, sorted.
    pub fn available_codes(&self, markup: &str) -> Vec<String> {
        let mut codes: Vec<String> = self.parse(markup).into_iter().map(|c| c.code).collect();
        codes.sort();
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const PAGE: &str = r#"
        <form>
          <select id="clinica" name="clinica">
            <option value="0">Selecione...</option>
            <option value="012">ENFERMARIA   G</option>
            <option value="007">U T I</option>
            <option value="">Vazio</option>
            <option value="012">Duplicada</option>
          </select>
        </form>"#;

    fn fixed() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_skips_sentinel_and_collapses_names() {
        let parser = ClinicParser::new();
        let clinics = parser.parse_at(PAGE, fixed());
        assert_eq!(clinics.len(), 2);
        assert_eq!(clinics[0].code, "012");
        assert_eq!(clinics[0].name, "ENFERMARIA G");
        assert_eq!(clinics[1].name, "U T I");
        assert!(clinics.iter().all(|c| c.last_updated == fixed().to_rfc3339()));
        assert!(clinics.iter().all(|c| c.status == ClinicStatus::Active));
    }

    #[test]
    fn test_parse_is_idempotent() {
        let parser = ClinicParser::new();
        let first = parser.parse(PAGE);
        let second = parser.parse(PAGE);
        assert_eq!(first, second);
    }

    #[test]
    fn test_fallback_by_partial_name() {
        let page = r#"<select name="co_clinica_atual"><option value="3">Pediatria</option></select>"#;
        let clinics = ClinicParser::new().parse_at(page, fixed());
        assert_eq!(clinics.len(), 1);
        assert_eq!(clinics[0].code, "3");
    }

    #[test]
    fn test_lookups() {
        let parser = ClinicParser::new();
        assert_eq!(parser.find_by_code(PAGE, "007").map(|c| c.name), Some("U T I".to_string()));
        assert!(parser.find_by_code(PAGE, "999").is_none());
        assert_eq!(parser.available_codes(PAGE), vec!["007", "012"]);
    }

    #[test]
    fn test_garbage_is_empty() {
        let parser = ClinicParser::new();
        assert!(parser.parse("").is_empty());
        assert!(parser.parse("<html><body>Sessão expirada</body></html>").is_empty());
    }
}
