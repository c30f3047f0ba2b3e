//! Exam requisition and result models.

use serde::{Deserialize, Serialize};

/// One exam inside a requisition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExamItem {
    pub code: String,
    pub name: String,
}

/// A batch exam order as listed in the patient's exam history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExamRequisition {
    /// Requisition id from the print trigger
    pub requisition_id: String,
    /// Positional key used to build print queries
    pub line_index: String,
    pub patient_id: String,
    /// Date and time as printed, joined by a space
    pub ordered_at: String,
    pub ordering_physician: String,
    pub clinic: String,
    pub items: Vec<ExamItem>,
    /// Requisition number shown in the info block
    pub requisition_number: String,
    pub patient_name: String,
    pub health_unit: String,
}

/// Result status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Normal,
    Altered,
    NoReference,
}

/// One analyte value from a result page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub requisition_id: String,
    pub analyte_code: String,
    pub raw_value: String,
    pub unit: Option<String>,
    pub numeric_value: Option<f64>,
    pub reference_range: Option<String>,
    pub status: ResultStatus,
}

/// Print-view query for a set of exams.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrintQuery {
    pub requisition_id: String,
    pub line_index: String,
    /// `idPrint_<line>=<code>` pairs joined by `&`
    pub query_string: String,
    /// Base64 of `query_string`
    pub encoded_param: String,
    pub item_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ResultStatus::NoReference).unwrap();
        assert_eq!(json, "\"no_reference\"");
    }

    #[test]
    fn test_result_field_names() {
        let result = ExamResult {
            requisition_id: "1".into(),
            analyte_code: "HGB".into(),
            raw_value: "13,5".into(),
            unit: None,
            numeric_value: Some(13.5),
            reference_range: None,
            status: ResultStatus::NoReference,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["analyteCode"], "HGB");
        assert!(value["referenceRange"].is_null());
    }
}
