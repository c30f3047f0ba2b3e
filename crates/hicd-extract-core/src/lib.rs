//! HICD Extract Core Library
//!
//! Turns pages of the HICD hospital information system into typed records.
//!
//! # Architecture
//!
//! ```text
//!  raw markup ──► RecordExtractor ──┬── fast path: scan for container, iterate records
//!                                   │
//!                                   └── fallback: DOM tree + selector chain
//!                                                     │
//!                                               Vec<Row>
//!                                                     │
//!            ┌──────────────┬──────────────┬─────────┴────┬───────────────┐
//!            ▼              ▼              ▼              ▼               ▼
//!         Clinics       Patients         Notes      Prescriptions    (exam pages
//!                      + bed match    merged by id                  use the tree)
//! ```
//!
//! Every parser owns a single-entry memo: calling it again with the same
//! markup and context returns the previous result.
//!
//! # Modules
//!
//! - [`extract`]: two-strategy record extraction and the markup scanner
//! - [`directory`]: clinic selector, patient roster, bed normalization
//! - [`notes`]: note history, merge by id, authoring-role classification
//! - [`exams`]: requisitions, results, print queries
//! - [`prescriptions`]: prescription list
//! - [`registration`]: patient registration panel
//! - [`config`]: ward and analyte tables
//! - [`models`]: record types

pub mod config;
pub mod dates;
pub mod directory;
pub mod error;
pub mod exams;
pub mod extract;
pub mod models;
pub mod notes;
pub mod prescriptions;
pub mod registration;

// Re-export commonly used types
pub use config::{AnalytePattern, ExtractionConfig, WardTable};
pub use directory::{
    bed_candidates, beds_match, normalize_bed, patients_in_bed, ClinicParser, PatientFilter,
    PatientParser,
};
pub use error::{ConfigError, ConfigResult, ExtractError, ExtractResult};
pub use exams::{
    build_print_queries, build_print_query, decode_print_param, RequisitionParser, ResultParser,
};
pub use extract::{Located, Memo, RecordExtractor, RecordLayout, Row};
pub use models::{
    BedLocation, Clinic, ClinicStatus, ClinicalNote, ExamItem, ExamRequisition, ExamResult,
    Patient, PatientRegistration, PrintQuery, Prescription, ResultStatus, Sex,
};
pub use notes::{is_medical_note, NoteParser};
pub use prescriptions::PrescriptionParser;
pub use registration::parse_registration;
