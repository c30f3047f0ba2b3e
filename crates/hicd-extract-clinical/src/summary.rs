//! Clinical summary of a patient's latest medical note.

use hicd_extract_core::dates::sort_key;
use hicd_extract_core::extract::markup::normalize_ws;
use hicd_extract_core::{is_medical_note, ClinicalNote};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ancillary::{extract_ancillary, Ancillary};
use crate::hda::extract_hda;
use crate::hypotheses::extract_hypotheses;

/// Remark attached when a patient has no medical note.
pub const NO_MEDICAL_NOTE: &str = "Nenhuma evolução médica encontrada";

/// What the latest medical note says about a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalSummary {
    pub patient_id: String,
    /// Key of the note the summary was built from
    pub source_note_id: Option<String>,
    pub history_of_present_illness: Option<String>,
    pub diagnostic_hypotheses: Vec<String>,
    pub ancillary: Ancillary,
    pub author_name: Option<String>,
    pub noted_at: Option<String>,
    /// Medical notes among the input
    pub medical_note_count: usize,
    /// Explanation when fields could not be filled
    pub remark: Option<String>,
}

impl ClinicalSummary {
    pub fn has_hda(&self) -> bool {
        self.history_of_present_illness.is_some()
    }

    pub fn has_hypotheses(&self) -> bool {
        !self.diagnostic_hypotheses.is_empty()
    }
}

/// Summarize the most recent medical note of `notes`.
///
/// Notes are ordered by their parsed date, newest first; an unparsable date
/// sorts last and equal dates keep their page order. Without any medical note
/// the summary is empty apart from [`NO_MEDICAL_NOTE`].
pub fn build_summary(patient_id: &str, notes: &[ClinicalNote]) -> ClinicalSummary {
    let mut medical: Vec<&ClinicalNote> = notes.iter().filter(|n| is_medical_note(n)).collect();
    debug!(
        patient = patient_id,
        notes = notes.len(),
        medical = medical.len(),
        "building clinical summary"
    );

    if medical.is_empty() {
        return ClinicalSummary {
            patient_id: patient_id.to_string(),
            remark: Some(NO_MEDICAL_NOTE.to_string()),
            ..Default::default()
        };
    }

    medical.sort_by_key(|n| std::cmp::Reverse(sort_key(&n.noted_at)));
    let latest = medical[0];
    let text = normalize_ws(&latest.clean_text);

    ClinicalSummary {
        patient_id: patient_id.to_string(),
        source_note_id: Some(latest.key()),
        history_of_present_illness: extract_hda(&text),
        diagnostic_hypotheses: extract_hypotheses(&text),
        ancillary: extract_ancillary(&text),
        author_name: Some(latest.author_name.clone()).filter(|a| !a.is_empty()),
        noted_at: Some(latest.noted_at.clone()).filter(|d| !d.is_empty()),
        medical_note_count: medical.len(),
        remark: None,
    }
}
