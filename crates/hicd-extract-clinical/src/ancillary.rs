//! Orders, requested exams and medications mentioned in a note.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Requested exam captures kept at most.
pub const MAX_EXAMS: usize = 5;

/// Exam captures this short are labels without content.
const MIN_EXAM: usize = 10;

static ORDERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:condutas?|plano|planejamento)[:\s]*([^.]+(?:\.[^.]*){0,2})")
        .expect("valid orders regex")
});

static EXAMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:exames?|solicitar|solicitado)[:\s]*([^.]+)")
        .expect("valid exams regex")
});

static MEDICATIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:medicação|medicamentos|prescrição|prescrito)[:\s]*([^.]+)")
        .expect("valid medications regex")
});

/// Ancillary data of a note. Absent sections stay `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Ancillary {
    /// Conduct / plan section
    pub orders: Option<String>,
    pub exams_requested: Option<Vec<String>>,
    pub medications: Option<String>,
}

impl Ancillary {
    pub fn is_empty(&self) -> bool {
        self.orders.is_none() && self.exams_requested.is_none() && self.medications.is_none()
    }
}

fn first_capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
}

/// Extract orders, requested exams and medications from flattened note text.
pub fn extract_ancillary(text: &str) -> Ancillary {
    let exams: Vec<String> = EXAMS
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|exam| exam.chars().count() > MIN_EXAM)
        .take(MAX_EXAMS)
        .collect();

    Ancillary {
        orders: first_capture(&ORDERS, text),
        exams_requested: (!exams.is_empty()).then_some(exams),
        medications: first_capture(&MEDICATIONS, text),
    }
}
