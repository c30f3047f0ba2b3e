//! Clinic models.

use serde::{Deserialize, Serialize};

/// A clinic (ward/service) as listed in the clinic selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Clinic {
    /// Clinic code, unique within a listing
    pub code: String,
    /// Display name, whitespace-collapsed
    pub name: String,
    pub status: ClinicStatus,
    /// Fetch timestamp (RFC 3339), shared by every clinic of one listing
    pub last_updated: String,
}

/// Listing status. The selector only lists clinics that are open.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClinicStatus {
    #[default]
    Active,
}
