//! Patient registration (cadastro) models.

use serde::{Deserialize, Serialize};

/// The registration panel of one patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PatientRegistration {
    pub patient_id: String,
    pub record_number: Option<String>,
    pub name: Option<String>,
    pub mother_name: Option<String>,
    pub birth_date: Option<String>,
    pub age: Option<String>,
    pub sex: Option<super::Sex>,
    pub address: Address,
    pub phone: Option<String>,
    pub guardian: Option<String>,
    pub documents: Documents,
    pub admission: Admission,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Documents {
    /// Emergency bulletin number
    pub be: Option<String>,
    /// National health card
    pub cns: Option<String>,
    pub document: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Admission {
    /// "Clinica / Leito" as printed, e.g. "001-UTI Adulto 15"
    pub clinic_bed: Option<String>,
    pub clinic_code: Option<String>,
    pub clinic_name: Option<String>,
    pub bed: Option<String>,
}
