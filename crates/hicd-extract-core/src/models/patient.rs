//! Patient models.

use serde::{Deserialize, Serialize};

/// An admitted patient as listed in a clinic's roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Record number (prontuário), unique within one listing
    pub record_number: String,
    pub name: String,
    pub bed: BedLocation,
    /// Admission date as printed
    pub admission_date: Option<String>,
    pub days_admitted: Option<u32>,
    pub sex: Option<Sex>,
    /// ICD-like code shown in some rosters
    pub cid: Option<String>,
    /// Code of the clinic whose listing produced this record
    pub clinic_code: Option<String>,
}

impl Patient {
    /// Create a patient with only the required fields.
    pub fn new(record_number: &str, name: &str) -> Self {
        Self {
            record_number: record_number.to_string(),
            name: name.to_string(),
            bed: BedLocation::default(),
            admission_date: None,
            days_admitted: None,
            sex: None,
            cid: None,
            clinic_code: None,
        }
    }
}

/// A bed as printed plus its normalized ward/bed pair when recognizable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BedLocation {
    /// Bed text as printed, e.g. "012.012-0007" or "G7"
    pub raw: String,
    /// Three-digit ward code
    pub ward: Option<String>,
    /// Bed number without leading zeros
    pub bed: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Sex {
    M,
    F,
}

impl Sex {
    /// Recognize the spellings rosters use: m/masc/masculino, f/fem/feminino.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "m" | "masc" | "masculino" => Some(Sex::M),
            "f" | "fem" | "feminino" => Some(Sex::F),
            _ => None,
        }
    }
}
