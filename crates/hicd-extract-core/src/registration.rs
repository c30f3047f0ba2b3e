//! Patient registration panel parsing.
//!
//! The panel is a set of `<p>Label: value</p>` paragraphs spread over three
//! columns. Labels are matched wherever they appear; two hidden inputs carry
//! the name and record number when the paragraphs omit them.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{ExtractError, ExtractResult};
use crate::extract::markup::{elements, text_of};
use crate::models::{PatientRegistration, Sex};

static BE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"BE:\s*(\d+)").expect("valid BE regex"));
static BIRTH_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Nascimento:\s*(\d{2}/\d{2}/\d{4})").expect("valid birth date regex")
});
static AGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Idade:\s*(\S+)").expect("valid age regex"));
static STATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Estado:\s*(\w+)").expect("valid state regex"));
static POSTAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CEP:\s*(\d+)").expect("valid postal code regex"));
static CLINIC_BED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Cl[ií]nica\s*/\s*Leito:\s*(.+)").expect("valid clinic bed regex")
});
static CLINIC_BED_PARTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{3})-(.+?)\s+(\d+)").expect("valid clinic bed parts regex"));

/// Paragraph labels in match order. "Nome da mãe:" must precede "Nome:".
const SIMPLE_LABELS: &[(&str, Field)] = &[
    ("Registro:", Field::Record),
    ("Nome da mãe:", Field::MotherName),
    ("Nome:", Field::Name),
    ("Logradouro:", Field::Street),
    ("Bairro:", Field::District),
    ("Telefone:", Field::Phone),
    ("CNS:", Field::Cns),
    ("Documento:", Field::Document),
    ("Número:", Field::Number),
    ("Município:", Field::City),
    ("Responsável:", Field::Guardian),
    ("Sexo:", Field::Sex),
    ("Complemento:", Field::Complement),
];

#[derive(Debug, Clone, Copy)]
enum Field {
    Record,
    MotherName,
    Name,
    Street,
    District,
    Phone,
    Cns,
    Document,
    Number,
    City,
    Guardian,
    Sex,
    Complement,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parse the registration panel of `patient_id`.
///
/// Fails with [`ExtractError::EmptyInput`] on blank input and
/// [`ExtractError::NoFields`] when no field could be read.
pub fn parse_registration(markup: &str, patient_id: &str) -> ExtractResult<PatientRegistration> {
    if markup.trim().is_empty() {
        return Err(ExtractError::EmptyInput);
    }
    let mut reg = PatientRegistration {
        patient_id: patient_id.to_string(),
        ..Default::default()
    };
    let mut recovered = 0usize;

    for paragraph in paragraphs(markup) {
        recovered += apply_paragraph(&paragraph, &mut reg);
    }

    let hidden = hidden_inputs(markup);
    if reg.name.is_none() {
        if let Some(name) = hidden.name {
            reg.name = Some(name);
            recovered += 1;
        }
    }
    if reg.record_number.is_none() {
        if let Some(record) = hidden.record {
            reg.record_number = Some(record);
            recovered += 1;
        }
    }

    debug!(patient = patient_id, fields = recovered, "parsed registration");
    if recovered == 0 {
        return Err(ExtractError::NoFields("patient registration".to_string()));
    }
    Ok(reg)
}

/// Paragraph texts of the registration panel, or of the whole page when
/// there is no panel.
fn paragraphs(markup: &str) -> Vec<String> {
    let panels = elements(markup, |tag, attrs| {
        tag == "div"
            && attrs
                .iter()
                .any(|(k, v)| k == "class" && v.split_whitespace().any(|c| c == "panel-body"))
    });
    let scopes: Vec<&str> = if panels.is_empty() {
        vec![markup]
    } else {
        panels.iter().map(|p| p.inner(markup)).collect()
    };
    scopes
        .into_iter()
        .flat_map(|scope| {
            elements(scope, |tag, _| tag == "p")
                .into_iter()
                .map(move |p| text_of(p.inner(scope)))
        })
        .filter(|t| !t.is_empty())
        .collect()
}

/// Apply one paragraph; returns how many fields it filled.
fn apply_paragraph(text: &str, reg: &mut PatientRegistration) -> usize {
    let mut filled = 0usize;

    if let Some(caps) = CLINIC_BED.captures(text) {
        let clinic_bed = caps[1].trim().to_string();
        if let Some(parts) = CLINIC_BED_PARTS.captures(&clinic_bed) {
            reg.admission.clinic_code = Some(parts[1].to_string());
            reg.admission.clinic_name = non_empty(&parts[2]);
            reg.admission.bed = Some(parts[3].to_string());
        }
        reg.admission.clinic_bed = Some(clinic_bed);
        return 1;
    }
    if text.contains("Nascimento:") {
        if let Some(caps) = BIRTH_DATE.captures(text) {
            reg.birth_date = Some(caps[1].to_string());
            filled += 1;
        }
        if let Some(caps) = AGE.captures(text) {
            reg.age = Some(caps[1].to_string());
            filled += 1;
        }
        return filled;
    }
    if text.contains("Estado:") {
        if let Some(caps) = STATE.captures(text) {
            reg.address.state = Some(caps[1].to_string());
            filled += 1;
        }
        if let Some(caps) = POSTAL_CODE.captures(text) {
            reg.address.postal_code = Some(caps[1].to_string());
            filled += 1;
        }
        return filled;
    }
    if let Some(caps) = BE_NUMBER.captures(text) {
        reg.documents.be = Some(caps[1].to_string());
        return 1;
    }

    let Some((label, field)) = SIMPLE_LABELS.iter().find(|(label, _)| text.contains(label)) else {
        return 0;
    };
    let Some(value) = text.split_once(label).and_then(|(_, v)| non_empty(v)) else {
        return 0;
    };
    match field {
        Field::Record => reg.record_number = Some(value),
        Field::MotherName => reg.mother_name = Some(value),
        Field::Name => reg.name = Some(value),
        Field::Street => reg.address.street = Some(value),
        Field::District => reg.address.district = Some(value),
        Field::Phone => reg.phone = Some(value),
        Field::Cns => reg.documents.cns = Some(value),
        Field::Document => reg.documents.document = Some(value),
        Field::Number => reg.address.number = Some(value),
        Field::City => reg.address.city = Some(value),
        Field::Guardian => reg.guardian = Some(value),
        Field::Sex => match Sex::parse(&value) {
            Some(sex) => reg.sex = Some(sex),
            None => return 0,
        },
        Field::Complement => reg.address.complement = Some(value),
    }
    1
}

#[derive(Default)]
struct Hidden {
    name: Option<String>,
    record: Option<String>,
}

fn hidden_inputs(markup: &str) -> Hidden {
    let mut hidden = Hidden::default();
    for input in elements(markup, |tag, _| tag == "input") {
        let value = input.attr("value").and_then(non_empty);
        match input.attr("id") {
            Some("pac_name") => hidden.name = value,
            Some("pac_pront") => hidden.record = value,
            _ => {}
        }
    }
    hidden
}

#[cfg(test)]
mod tests {
    use super::*;

    const PANEL: &str = r#"
        <div class="panel panel-default"><div class="panel-body">
          <div class="col-lg-3">
            <p><b>Registro:</b> 12345</p>
            <p><b>Nome:</b> MARIA DA SILVA</p>
            <p><b>Nome da mãe:</b> ANA DA SILVA</p>
            <p><b>Logradouro:</b> RUA DAS FLORES</p>
            <p><b>Bairro:</b> CENTRO</p>
            <p><b>Telefone:</b> (69) 99999-0000</p>
          </div>
          <div class="col-lg-4">
            <p><b>BE:</b> 778899</p>
            <p><b>CNS:</b> 700000000000000</p>
            <p><b>Número:</b> 100</p>
            <p><b>Município:</b> PORTO VELHO</p>
            <p><b>Responsável:</b> JOSE DA SILVA</p>
          </div>
          <div class="col-lg-4">
            <p><b>Clinica / Leito:</b> 001-UTI Adulto 15</p>
            <p><b>Nascimento:</b> 01/02/1980 <b>Idade:</b> 44 anos</p>
            <p><b>Sexo:</b> Feminino</p>
            <p><b>Estado:</b> RO <b>CEP:</b> 76800000</p>
          </div>
        </div></div>"#;

    #[test]
    fn test_full_panel() {
        let reg = parse_registration(PANEL, "12345").unwrap();
        assert_eq!(reg.record_number.as_deref(), Some("12345"));
        assert_eq!(reg.name.as_deref(), Some("MARIA DA SILVA"));
        assert_eq!(reg.mother_name.as_deref(), Some("ANA DA SILVA"));
        assert_eq!(reg.address.street.as_deref(), Some("RUA DAS FLORES"));
        assert_eq!(reg.address.city.as_deref(), Some("PORTO VELHO"));
        assert_eq!(reg.address.state.as_deref(), Some("RO"));
        assert_eq!(reg.address.postal_code.as_deref(), Some("76800000"));
        assert_eq!(reg.documents.be.as_deref(), Some("778899"));
        assert_eq!(reg.guardian.as_deref(), Some("JOSE DA SILVA"));
        assert_eq!(reg.birth_date.as_deref(), Some("01/02/1980"));
        assert_eq!(reg.age.as_deref(), Some("44"));
        assert_eq!(reg.sex, Some(Sex::F));
        assert_eq!(reg.admission.clinic_code.as_deref(), Some("001"));
        assert_eq!(reg.admission.clinic_name.as_deref(), Some("UTI Adulto"));
        assert_eq!(reg.admission.bed.as_deref(), Some("15"));
    }

    #[test]
    fn test_hidden_inputs_fill_gaps() {
        let html = r#"<form><input type="hidden" id="pac_name" value="CARLOS">
            <input type="hidden" id="pac_pront" value="555"></form>"#;
        let reg = parse_registration(html, "555").unwrap();
        assert_eq!(reg.name.as_deref(), Some("CARLOS"));
        assert_eq!(reg.record_number.as_deref(), Some("555"));
    }

    #[test]
    fn test_nothing_recovered_is_an_error() {
        assert!(matches!(
            parse_registration("<div>Sessão expirada</div>", "1"),
            Err(ExtractError::NoFields(_))
        ));
        assert!(matches!(parse_registration("   ", "1"), Err(ExtractError::EmptyInput)));
    }
}
