//! Ward-wide analysis.
//!
//! The analyzer walks the clinic selector, every clinic's roster and each
//! matching patient's note history, and reduces it all to one report. Pages
//! come from a [`PageSource`]; fetching them is not this crate's concern.
//!
//! A patient whose notes cannot be fetched or parsed is recorded in the
//! report and the walk moves on.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use hicd_extract_core::extract::markup::fold_label;
use hicd_extract_core::{
    patients_in_bed, Clinic, ClinicParser, ExtractionConfig, NoteParser, Patient, PatientParser,
    Sex,
};
use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};
use tracing::{debug, info, warn};

use crate::error::{AnalyzerResult, SourceError};
use crate::summary::{build_summary, ClinicalSummary};

/// Clinic names scoring at least this against a ward name are the ward.
pub const NAME_SIMILARITY: f64 = 0.88;

/// Access to the pages the analyzer reads.
pub trait PageSource {
    /// The clinic selector page.
    fn clinics_page(&self) -> Result<String, SourceError>;

    /// The roster of one clinic.
    fn patients_page(&self, clinic_code: &str) -> Result<String, SourceError>;

    /// The note history of one patient.
    fn notes_page(&self, patient_id: &str) -> Result<String, SourceError>;
}

/// How much of each patient's summary goes into a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportDetail {
    Condensed,
    #[default]
    Detailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Success,
    /// Notes were fetched but nothing could be extracted
    Failed,
    /// The notes page could not be fetched
    Error,
}

/// Patient fields repeated in a report entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientBrief {
    pub record_number: String,
    pub name: String,
    pub bed: String,
    pub sex: Option<Sex>,
    pub days_admitted: Option<u32>,
    pub clinic_code: Option<String>,
}

impl From<&Patient> for PatientBrief {
    fn from(p: &Patient) -> Self {
        Self {
            record_number: p.record_number.clone(),
            name: p.name.clone(),
            bed: p.bed.raw.clone(),
            sex: p.sex,
            days_admitted: p.days_admitted,
            clinic_code: p.clinic_code.clone(),
        }
    }
}

/// Counts standing in for a summary in condensed reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CondensedSummary {
    pub hda_found: bool,
    pub hypothesis_count: usize,
    pub author_name: Option<String>,
    pub noted_at: Option<String>,
    pub medical_note_count: usize,
}

impl From<&ClinicalSummary> for CondensedSummary {
    fn from(s: &ClinicalSummary) -> Self {
        Self {
            hda_found: s.has_hda(),
            hypothesis_count: s.diagnostic_hypotheses.len(),
            author_name: s.author_name.clone(),
            noted_at: s.noted_at.clone(),
            medical_note_count: s.medical_note_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Analysis {
    Detailed(ClinicalSummary),
    Condensed(CondensedSummary),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientEntry {
    pub patient: PatientBrief,
    pub status: EntryStatus,
    pub analysis: Option<Analysis>,
    pub error: Option<String>,
}

/// Aggregate result of analyzing one ward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WardReport {
    pub ward: String,
    /// RFC 3339
    pub analyzed_at: String,
    pub total_patients: usize,
    pub analyzed: usize,
    pub successes: usize,
    pub failures: usize,
    pub with_hda: usize,
    pub with_hypotheses: usize,
    /// Percentage of analyzed patients that succeeded
    pub success_rate: f64,
    /// Clinics whose roster could not be fetched
    pub unreachable_clinics: Vec<String>,
    pub entries: Vec<PatientEntry>,
    pub summary: String,
}

impl WardReport {
    fn new(ward: &str, analyzed_at: DateTime<Utc>) -> Self {
        Self {
            ward: ward.to_string(),
            analyzed_at: analyzed_at.to_rfc3339(),
            total_patients: 0,
            analyzed: 0,
            successes: 0,
            failures: 0,
            with_hda: 0,
            with_hypotheses: 0,
            success_rate: 0.0,
            unreachable_clinics: Vec::new(),
            entries: Vec::new(),
            summary: String::new(),
        }
    }

    fn finish(&mut self) {
        self.analyzed = self.entries.len();
        if self.analyzed > 0 {
            self.success_rate = self.successes as f64 * 100.0 / self.analyzed as f64;
        }
        self.summary = if self.total_patients == 0 {
            format!("No patients found for {}", self.ward)
        } else {
            format!(
                "Analyzed {} patients of {}: {} succeeded, {} failed, {} with HDA, {} with diagnostic hypotheses",
                self.total_patients,
                self.ward,
                self.successes,
                self.failures,
                self.with_hda,
                self.with_hypotheses
            )
        };
    }
}

/// A patient together with the clinic whose roster listed them.
struct Listed {
    patient: Patient,
    clinic_name: String,
}

/// Runs the extractors over a whole ward.
pub struct ClinicAnalyzer<S: PageSource> {
    source: S,
    config: ExtractionConfig,
    clinics: ClinicParser,
    patients: PatientParser,
    notes: NoteParser,
}

impl<S: PageSource> ClinicAnalyzer<S> {
    /// Create an analyzer with the default configuration.
    pub fn new(source: S) -> Self {
        Self::with_config(source, ExtractionConfig::default())
    }

    pub fn with_config(source: S, config: ExtractionConfig) -> Self {
        Self {
            patients: PatientParser::with_config(&config),
            clinics: ClinicParser::new(),
            notes: NoteParser::new(),
            source,
            config,
        }
    }

    /// Create an analyzer from a JSON configuration document.
    pub fn from_json(source: S, json: &str) -> AnalyzerResult<Self> {
        let config = ExtractionConfig::from_json(json)?;
        Ok(Self::with_config(source, config))
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Summarize the latest medical note of one patient.
    pub fn analyze_patient(&self, patient_id: &str) -> AnalyzerResult<ClinicalSummary> {
        let markup = self.source.notes_page(patient_id)?;
        let notes = self.notes.parse(&markup, patient_id);
        Ok(build_summary(patient_id, &notes))
    }

    /// Analyze every patient of `ward`, stamping the report with the current time.
    pub fn analyze_ward(&self, ward: &str, detail: ReportDetail) -> AnalyzerResult<WardReport> {
        self.analyze_ward_at(ward, detail, Utc::now())
    }

    /// Analyze every patient of `ward`.
    ///
    /// Fails only when the clinic selector cannot be fetched. A roster that
    /// cannot be fetched is listed in `unreachable_clinics`; a patient whose
    /// notes cannot be fetched gets an error entry.
    pub fn analyze_ward_at(
        &self,
        ward: &str,
        detail: ReportDetail,
        analyzed_at: DateTime<Utc>,
    ) -> AnalyzerResult<WardReport> {
        let mut report = WardReport::new(ward, analyzed_at);
        let (listed, unreachable) = self.list_patients()?;
        report.unreachable_clinics = unreachable;

        let in_ward: Vec<&Listed> = listed.iter().filter(|l| self.in_ward(l, ward)).collect();
        report.total_patients = in_ward.len();
        info!(ward, patients = in_ward.len(), "analyzing ward");

        for listed in in_ward {
            let patient = &listed.patient;
            let brief = PatientBrief::from(patient);
            let entry = match self.source.notes_page(&patient.record_number) {
                Err(e) => {
                    warn!(record = %patient.record_number, error = %e, "notes page unavailable");
                    report.failures += 1;
                    PatientEntry {
                        patient: brief,
                        status: EntryStatus::Error,
                        analysis: None,
                        error: Some(e.to_string()),
                    }
                }
                Ok(markup) => {
                    let notes = self.notes.parse(&markup, &patient.record_number);
                    if notes.is_empty() {
                        debug!(record = %patient.record_number, "no notes extracted");
                        report.failures += 1;
                        PatientEntry {
                            patient: brief,
                            status: EntryStatus::Failed,
                            analysis: None,
                            error: Some("No clinical notes extracted".to_string()),
                        }
                    } else {
                        let summary = build_summary(&patient.record_number, &notes);
                        report.successes += 1;
                        report.with_hda += usize::from(summary.has_hda());
                        report.with_hypotheses += usize::from(summary.has_hypotheses());
                        let analysis = match detail {
                            ReportDetail::Detailed => Analysis::Detailed(summary),
                            ReportDetail::Condensed => Analysis::Condensed((&summary).into()),
                        };
                        PatientEntry {
                            patient: brief,
                            status: EntryStatus::Success,
                            analysis: Some(analysis),
                            error: None,
                        }
                    }
                }
            };
            report.entries.push(entry);
        }

        report.finish();
        info!(
            ward,
            successes = report.successes,
            failures = report.failures,
            "ward analysis finished"
        );
        Ok(report)
    }

    /// Patients in `bed` across every clinic.
    pub fn find_patients_by_bed(&self, bed: &str) -> AnalyzerResult<Vec<Patient>> {
        let (listed, _) = self.list_patients()?;
        let patients: Vec<Patient> = listed.into_iter().map(|l| l.patient).collect();
        let found: Vec<Patient> = patients_in_bed(&patients, bed, &self.config.wards)
            .into_iter()
            .cloned()
            .collect();
        debug!(bed, found = found.len(), "searched beds");
        Ok(found)
    }

    /// Every listed patient once, first clinic wins, plus the codes of
    /// clinics whose roster could not be fetched.
    fn list_patients(&self) -> AnalyzerResult<(Vec<Listed>, Vec<String>)> {
        let clinics = self.clinics.parse(&self.source.clinics_page()?);
        let mut seen = HashSet::new();
        let mut listed = Vec::new();
        let mut unreachable = Vec::new();

        for clinic in &clinics {
            let markup = match self.source.patients_page(&clinic.code) {
                Ok(markup) => markup,
                Err(e) => {
                    warn!(clinic = %clinic.code, error = %e, "roster unavailable");
                    unreachable.push(clinic.code.clone());
                    continue;
                }
            };
            for patient in self.patients.parse(&markup, Some(&clinic.code)) {
                if seen.insert(patient.record_number.clone()) {
                    listed.push(Listed {
                        patient,
                        clinic_name: clinic.name.clone(),
                    });
                }
            }
        }
        debug!(
            clinics = clinics.len(),
            patients = listed.len(),
            unreachable = unreachable.len(),
            "listed patients"
        );
        Ok((listed, unreachable))
    }

    /// Whether a listed patient belongs to `ward`.
    ///
    /// The clinic name or bed may contain the ward name or one of its table
    /// terms ("012.012" for ward G). Names outside the ward table also match
    /// clinic names that are close enough.
    fn in_ward(&self, listed: &Listed, ward: &str) -> bool {
        let wanted = ward.trim().to_uppercase();
        if wanted.is_empty() {
            return false;
        }
        let clinic = listed.clinic_name.to_uppercase();
        let bed = listed.patient.bed.raw.to_uppercase();
        if clinic.contains(&wanted) || bed.contains(&wanted) {
            return true;
        }

        let terms = self.config.wards.match_terms(&wanted);
        if !terms.is_empty() {
            return terms.iter().any(|t| clinic.contains(t) || bed.contains(t));
        }
        name_similarity(&listed.clinic_name, ward) >= NAME_SIMILARITY
    }
}

/// Similarity of two clinic names, ignoring case, accents and spacing.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (fold_label(a), fold_label(b));
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    jaro_winkler(&a, &b) * 0.6 + normalized_levenshtein(&a, &b) * 0.4
}

/// Clinics whose name resolves to `ward`, best match first.
pub fn clinics_matching<'a>(clinics: &'a [Clinic], ward: &str) -> Vec<&'a Clinic> {
    let mut scored: Vec<(f64, &Clinic)> = clinics
        .iter()
        .map(|c| (name_similarity(&c.name, ward), c))
        .filter(|(score, _)| *score >= NAME_SIMILARITY)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, c)| c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hicd_extract_core::ClinicStatus;

    fn clinic(code: &str, name: &str) -> Clinic {
        Clinic {
            code: code.into(),
            name: name.into(),
            status: ClinicStatus::Active,
            last_updated: String::new(),
        }
    }

    #[test]
    fn test_name_similarity() {
        assert!(name_similarity("CLÍNICA MÉDICA", "clinica medica") > 0.99);
        assert!(name_similarity("CLINCA MEDICA", "Clínica Médica") >= NAME_SIMILARITY);
        assert!(name_similarity("PEDIATRIA", "ORTOPEDIA") < NAME_SIMILARITY);
        assert_eq!(name_similarity("", "UTI"), 0.0);
    }

    #[test]
    fn test_clinics_matching_orders_best_first() {
        let clinics = vec![
            clinic("1", "ORTOPEDIA"),
            clinic("2", "CLINICA MEDICA II"),
            clinic("3", "CLINICA MEDICA"),
        ];
        let found = clinics_matching(&clinics, "Clínica Médica");
        let codes: Vec<&str> = found.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["3", "2"]);
    }
}
