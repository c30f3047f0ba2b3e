//! Patient roster parsing.
//!
//! Roster tables differ between deployments: the record number sits in column
//! 0 on some and column 1 on others, and the trailing columns come in no fixed
//! order. Columns are probed by content rather than position.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::config::{ExtractionConfig, WardTable};
use crate::dates::has_date;
use crate::extract::markup::{elements, text_of};
use crate::extract::{ContainerPattern, ElementPattern, Memo, RecordExtractor, RecordLayout, Row};
use crate::models::{Patient, Sex};

use super::beds::normalize_bed;

const PATIENT_LAYOUT: RecordLayout = RecordLayout {
    containers: &[
        ContainerPattern::class("table", "patient-table"),
        ContainerPattern::id("table", "tabelaPacientes"),
        ContainerPattern::id("table", "pacientes"),
        ContainerPattern::name("table", "pacientes"),
    ],
    record: ElementPattern::tag("tr"),
    field: Some(ElementPattern::tag("td")),
    fallback: &[
        "table.patient-table tr",
        "tr[data-patient]",
        "tr[onclick*='patient']",
        "tr[onclick*='prontuario']",
        "table tr",
    ],
    fallback_field: Some("td"),
    keep_empty: false,
};

/// Patterns recovering a record number from an onclick/href, in priority order.
static ACTION_REFS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)prontuario[=:]?(\d+)",
        r"(?i)patient[_-]?id[=:]?(\d+)",
        r"(?i)codigo[=:]?(\d+)",
        r"(?i)id[=:]?(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid action reference regex"))
    .collect()
});

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4,}").expect("valid digit run regex"));

static ICD_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]\d{2}(?:\.\d{1,2})?$").expect("valid ICD regex"));

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Recover a record number from an action reference (onclick or href).
pub fn record_from_action(action: &str) -> Option<String> {
    if action.is_empty() {
        return None;
    }
    for pattern in ACTION_REFS.iter() {
        if let Some(caps) = pattern.captures(action) {
            return Some(caps[1].to_string());
        }
    }
    DIGIT_RUN
        .find_iter(action)
        .max_by_key(|m| m.as_str().len())
        .map(|m| m.as_str().to_string())
}

/// Filter over a parsed roster.
#[derive(Debug, Clone, Default)]
pub struct PatientFilter {
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    pub sex: Option<Sex>,
}

impl PatientFilter {
    pub fn apply<'a>(&self, patients: &'a [Patient]) -> Vec<&'a Patient> {
        let needle = self.name.as_ref().map(|n| n.to_lowercase());
        patients
            .iter()
            .filter(|p| {
                needle
                    .as_ref()
                    .map_or(true, |n| p.name.to_lowercase().contains(n.as_str()))
            })
            .filter(|p| self.sex.map_or(true, |s| p.sex == Some(s)))
            .collect()
    }
}

/// Parser for a clinic's patient roster.
pub struct PatientParser {
    records: RecordExtractor,
    wards: WardTable,
    memo: Memo<Vec<Patient>>,
}

impl Default for PatientParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PatientParser {
    pub fn new() -> Self {
        Self::with_wards(WardTable::new())
    }

    pub fn with_config(config: &ExtractionConfig) -> Self {
        Self::with_wards(config.wards.clone())
    }

    fn with_wards(wards: WardTable) -> Self {
        Self {
            records: RecordExtractor::new(PATIENT_LAYOUT),
            wards,
            memo: Memo::new(),
        }
    }

    /// Parse a roster. `clinic_code` is stamped on every record and is part of
    /// the cache key.
    pub fn parse(&self, markup: &str, clinic_code: Option<&str>) -> Vec<Patient> {
        self.memo
            .get_or_compute(markup, clinic_code.unwrap_or(""), || {
                self.parse_uncached(markup, clinic_code)
            })
    }

    fn parse_uncached(&self, markup: &str, clinic_code: Option<&str>) -> Vec<Patient> {
        let rows = self.records.extract(markup);
        let total = rows.len();
        let parsed: Vec<Patient> = rows
            .iter()
            .filter_map(|row| self.parse_row(row, clinic_code))
            .collect();
        let patients = validate(parsed);
        debug!(
            rows = total,
            patients = patients.len(),
            dropped = total - patients.len(),
            clinic = clinic_code.unwrap_or(""),
            "parsed patient roster"
        );
        patients
    }

    fn parse_row(&self, row: &Row, clinic_code: Option<&str>) -> Option<Patient> {
        if row.cells.len() < 2 {
            return None;
        }
        let first = row.cell_text(0);
        let second = row.cell_text(1);

        let (mut record, mut name) = if is_all_digits(first) {
            (Some(first.to_string()), second.to_string())
        } else if is_all_digits(second) {
            (Some(second.to_string()), first.to_string())
        } else {
            (None, first.to_string())
        };

        if record.is_none() {
            record = row
                .attr("data-prontuario")
                .or_else(|| row.attr("data-patient"))
                .filter(|v| is_all_digits(v))
                .map(str::to_string);
        }
        if record.is_none() {
            let (action_record, link_text) = self.record_from_links(row);
            record = action_record;
            if name.is_empty() {
                name = link_text.unwrap_or_default();
            }
        }

        let record = record?;
        if name.is_empty() {
            trace!(record = %record, "row without name");
            return None;
        }

        let mut patient = Patient::new(&record, &name);
        patient.clinic_code = clinic_code.map(str::to_string);
        if row.cells.len() >= 3 {
            patient.bed = normalize_bed(row.cell_text(2), &self.wards);
        }
        for cell in row.cells.iter().skip(3) {
            classify_cell(&cell.text, &mut patient);
        }
        Some(patient)
    }

    /// Record number from the row's own onclick or its first link, plus the link text.
    fn record_from_links(&self, row: &Row) -> (Option<String>, Option<String>) {
        if let Some(found) = row.attr("onclick").and_then(record_from_action) {
            return (Some(found), None);
        }
        let links = elements(&row.html, |tag, _| tag == "a");
        let Some(link) = links.first() else {
            return (None, None);
        };
        let record = link
            .attr("onclick")
            .and_then(record_from_action)
            .or_else(|| link.attr("href").and_then(record_from_action));
        let text = text_of(link.inner(&row.html));
        (record, (!text.is_empty()).then_some(text))
    }

    /// Find one patient by record number.
    pub fn find_by_record(
        &self,
        markup: &str,
        clinic_code: Option<&str>,
        record: &str,
    ) -> Option<Patient> {
        self.parse(markup, clinic_code)
            .into_iter()
            .find(|p| p.record_number == record)
    }

    /// All record numbers, sorted.
    pub fn available_records(&self, markup: &str, clinic_code: Option<&str>) -> Vec<String> {
        let mut records: Vec<String> = self
            .parse(markup, clinic_code)
            .into_iter()
            .map(|p| p.record_number)
            .collect();
        records.sort();
        records
    }

    pub fn wards(&self) -> &WardTable {
        &self.wards
    }
}

/// Assign a trailing roster cell to the first empty field its content fits.
fn classify_cell(text: &str, patient: &mut Patient) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if patient.sex.is_none() {
        if let Some(sex) = Sex::parse(text) {
            patient.sex = Some(sex);
            return;
        }
    }
    if patient.admission_date.is_none() && has_date(text) {
        patient.admission_date = Some(text.to_string());
        return;
    }
    if patient.days_admitted.is_none() && is_all_digits(text) {
        if let Ok(days) = text.parse() {
            patient.days_admitted = Some(days);
            return;
        }
    }
    if patient.cid.is_none() && ICD_CELL.is_match(&text.to_uppercase()) {
        patient.cid = Some(text.to_uppercase());
    }
}

/// Drop records without key or name, then duplicate keys (first wins).
fn validate(patients: Vec<Patient>) -> Vec<Patient> {
    let mut seen = HashSet::new();
    patients
        .into_iter()
        .filter(|p| !p.record_number.trim().is_empty() && !p.name.trim().is_empty())
        .filter(|p| seen.insert(p.record_number.clone()))
        .collect()
}
