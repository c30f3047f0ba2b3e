//! Clinical note (evolution) models.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Characters of the body folded into a synthetic key.
const KEY_BODY_PREFIX: usize = 64;

/// A timestamped progress note from a patient's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalNote {
    /// Note id from the page; some notes carry none
    pub id: Option<String>,
    pub patient_id: String,
    pub author_name: String,
    /// Activity line, e.g. "Evolução Médica"
    pub author_role_text: String,
    pub noted_at: String,
    pub updated_at: String,
    pub ward_bed_at_time: String,
    /// Description as printed (markup)
    pub body_text: String,
    /// Description as plain text, line breaks kept
    pub clean_text: String,
}

impl ClinicalNote {
    /// Identity used for deduplication: the page id, or a digest of the fields
    /// that identify an id-less note.
    pub fn key(&self) -> String {
        if let Some(id) = self.id.as_deref().filter(|id| !id.is_empty()) {
            return id.to_string();
        }
        let prefix: String = self.clean_text.chars().take(KEY_BODY_PREFIX).collect();
        let mut hasher = Sha256::new();
        for part in [
            self.patient_id.as_str(),
            self.noted_at.as_str(),
            self.author_name.as_str(),
            prefix.as_str(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0x1f]);
        }
        format!("syn-{}", &hex::encode(hasher.finalize())[..16])
    }

    /// Fold another fragment of the same note into this one, field by field.
    ///
    /// The longer non-empty value wins; on equal length the current value stays.
    pub fn merge(&mut self, other: &ClinicalNote) {
        if self.id.is_none() {
            self.id = other.id.clone();
        }
        merge_field(&mut self.patient_id, &other.patient_id);
        merge_field(&mut self.author_name, &other.author_name);
        merge_field(&mut self.author_role_text, &other.author_role_text);
        merge_field(&mut self.noted_at, &other.noted_at);
        merge_field(&mut self.updated_at, &other.updated_at);
        merge_field(&mut self.ward_bed_at_time, &other.ward_bed_at_time);
        merge_field(&mut self.body_text, &other.body_text);
        merge_field(&mut self.clean_text, &other.clean_text);
    }
}

/// Keep the more complete of two values.
pub fn merge_field(current: &mut String, candidate: &str) {
    if candidate.trim().chars().count() > current.trim().chars().count() {
        *current = candidate.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: Option<&str>, role: &str, body: &str) -> ClinicalNote {
        ClinicalNote {
            id: id.map(str::to_string),
            patient_id: "123".into(),
            author_role_text: role.into(),
            clean_text: body.into(),
            noted_at: "01/02/2024 08:00".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_key_prefers_page_id() {
        assert_eq!(note(Some("987"), "", "").key(), "987");
    }

    #[test]
    fn test_synthetic_key_is_stable() {
        let a = note(None, "x", "Paciente estável");
        let b = note(None, "y", "Paciente estável");
        assert_eq!(a.key(), b.key());
        assert!(a.key().starts_with("syn-"));
        assert_ne!(a.key(), note(None, "x", "Outro texto").key());
    }

    #[test]
    fn test_merge_fills_empty_fields() {
        let mut a = note(Some("1"), "Evolução Médica", "");
        let b = note(Some("1"), "", &"x".repeat(500));
        a.merge(&b);
        assert_eq!(a.author_role_text, "Evolução Médica");
        assert_eq!(a.clean_text.len(), 500);
    }

    #[test]
    fn test_merge_keeps_current_on_tie() {
        let mut a = note(Some("1"), "abc", "");
        a.merge(&note(Some("1"), "xyz", ""));
        assert_eq!(a.author_role_text, "abc");
    }

    #[test]
    fn test_empty_never_overrides() {
        let mut value = "texto".to_string();
        merge_field(&mut value, "");
        merge_field(&mut value, "   ");
        assert_eq!(value, "texto");
    }
}
