//! Authoring-role classification.

use crate::models::ClinicalNote;

/// Roles that are never medical. Checked first: "técnico" must lose even
/// when the activity line also says "clínica médica".
const NON_MEDICAL: &[&str] = &[
    "psicologo",
    "psicólogo",
    "enfermeiro",
    "enfermeira",
    "enfermagem",
    "fisioterapeuta",
    "nutricionista",
    "farmaceutico",
    "farmacêutico",
    "assistente social",
    "fonoaudiologo",
    "fonoaudiólogo",
    "tecnico",
    "técnico",
    "auxiliar",
];

const MEDICAL: &[&str] = &[
    "medico",
    "médico",
    "residente",
    "resident",
    "clinica medica",
    "clínica médica",
    "medicina",
    "evolução médica",
    "evolucao medica",
    "clinico",
    "clínico",
    "pediatra",
    "intensivista",
    "cirurgi",
    "dr.",
    "dra.",
    "doutor",
    "doutora",
];

/// Whether an activity line and author name describe a physician.
pub fn is_medical_role(role_text: &str, author_name: &str) -> bool {
    if role_text.trim().is_empty() && author_name.trim().is_empty() {
        return false;
    }
    let haystack = format!("{role_text} {author_name}").to_lowercase();
    if NON_MEDICAL.iter().any(|p| haystack.contains(p)) {
        return false;
    }
    MEDICAL.iter().any(|p| haystack.contains(p))
}

/// Whether a note was written by a physician.
pub fn is_medical_note(note: &ClinicalNote) -> bool {
    is_medical_role(&note.author_role_text, &note.author_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medical_roles() {
        assert!(is_medical_role("Evolução Médica", "ANA"));
        assert!(is_medical_role("MEDICO RESIDENTE", ""));
        assert!(is_medical_role("", "Dra. Paula Reis"));
        assert!(is_medical_role("PEDIATRA Sub-Atividade: PEDIATRA - UTI PEDIATRICA", "TAMILA"));
    }

    #[test]
    fn test_exclusion_wins() {
        assert!(!is_medical_role("Técnico de Enfermagem - Clínica Médica", "JOAO"));
        assert!(!is_medical_role("Evolução de Enfermagem", "Dr. Fulano"));
        assert!(!is_medical_role("FISIOTERAPEUTA", ""));
        assert!(!is_medical_role("Assistente Social", "MARIA"));
    }

    #[test]
    fn test_unknown_and_empty_are_not_medical() {
        assert!(!is_medical_role("", ""));
        assert!(!is_medical_role("Recepção", "CARLOS"));
    }
}
