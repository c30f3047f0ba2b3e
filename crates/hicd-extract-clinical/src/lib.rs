//! Clinical text mining and ward analysis.
//!
//! Works on the records produced by `hicd-extract-core`:
//!
//! - [`hda`]: history of present illness from a note body
//! - [`hypotheses`]: diagnostic hypotheses and ICD codes
//! - [`ancillary`]: orders, requested exams, medications
//! - [`summary`]: summary of a patient's latest medical note
//! - [`analyzer`]: ward-wide report over a [`PageSource`]

pub mod analyzer;
pub mod ancillary;
pub mod error;
pub mod hda;
pub mod hypotheses;
pub mod summary;

pub use analyzer::{
    clinics_matching, name_similarity, Analysis, ClinicAnalyzer, CondensedSummary, EntryStatus,
    PageSource, PatientBrief, PatientEntry, ReportDetail, WardReport,
};
pub use ancillary::{extract_ancillary, Ancillary};
pub use error::{AnalyzerError, AnalyzerResult, SourceError};
pub use hda::extract_hda;
pub use hypotheses::extract_hypotheses;
pub use summary::{build_summary, ClinicalSummary, NO_MEDICAL_NOTE};
