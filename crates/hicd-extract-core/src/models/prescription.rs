//! Prescription list models.

use serde::{Deserialize, Serialize};

/// One row of a patient's prescription list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    /// Prescription id from the print button
    pub id: String,
    pub code: String,
    pub issued_at: String,
    pub patient_name: String,
    pub record_number: String,
    pub admission: String,
    pub ward_bed: String,
    pub clinic: String,
    pub patient_id: String,
}
