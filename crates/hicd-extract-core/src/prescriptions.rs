//! Prescription list parsing.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::extract::{ContainerPattern, ElementPattern, Memo, RecordExtractor, RecordLayout, Row};
use crate::models::Prescription;

/// Columns of a prescription row: code, issued at, patient, record,
/// admission, ward/bed, clinic.
const MIN_CELLS: usize = 7;

const PRESCRIPTION_LAYOUT: RecordLayout = RecordLayout {
    containers: &[ContainerPattern::class("table", "linhas_impressao_med")],
    record: ElementPattern::tag("tr"),
    field: Some(ElementPattern::tag("td")),
    fallback: &[
        "table.linhas_impressao_med tr",
        "table[class*='impressao'] tr",
        "table[class*='prescri'] tr",
    ],
    fallback_field: Some("td"),
    keep_empty: false,
};

static PRESCRIPTION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"id_prescricao=(\d+)").expect("valid prescription id regex"));

/// Parser for a patient's prescription list.
pub struct PrescriptionParser {
    records: RecordExtractor,
    memo: Memo<Vec<Prescription>>,
}

impl Default for PrescriptionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PrescriptionParser {
    pub fn new() -> Self {
        Self {
            records: RecordExtractor::new(PRESCRIPTION_LAYOUT),
            memo: Memo::new(),
        }
    }

    pub fn parse(&self, markup: &str, patient_id: &str) -> Vec<Prescription> {
        self.memo.get_or_compute(markup, patient_id, || {
            let rows = self.records.extract(markup);
            let mut seen = HashSet::new();
            let prescriptions: Vec<Prescription> = rows
                .iter()
                .filter_map(|row| parse_row(row, patient_id))
                .filter(|p| seen.insert(p.id.clone()))
                .collect();
            debug!(
                patient = patient_id,
                rows = rows.len(),
                prescriptions = prescriptions.len(),
                "parsed prescription list"
            );
            prescriptions
        })
    }
}

/// A row with enough cells and a print action carrying the prescription id.
fn parse_row(row: &Row, patient_id: &str) -> Option<Prescription> {
    if row.cells.len() < MIN_CELLS {
        return None;
    }
    let id = PRESCRIPTION_ID.captures(&row.html)?[1].to_string();
    Some(Prescription {
        id,
        code: row.cell_text(0).to_string(),
        issued_at: row.cell_text(1).to_string(),
        patient_name: row.cell_text(2).to_string(),
        record_number: row.cell_text(3).to_string(),
        admission: row.cell_text(4).to_string(),
        ward_bed: row.cell_text(5).to_string(),
        clinic: row.cell_text(6).to_string(),
        patient_id: patient_id.to_string(),
    })
}
