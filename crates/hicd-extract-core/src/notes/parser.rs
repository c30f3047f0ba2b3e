//! Note history parsing.
//!
//! The history area is a flat run of `.row` blocks. Every note spans five
//! consecutive rows holding `label | value` column pairs; the label positions
//! shift between deployments, so each label is looked up across the whole
//! group. A note may be printed more than once (header and body in separate
//! fragments); fragments sharing an id are merged.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::dates::has_date;
use crate::extract::markup::{clean_multiline, elements, fold_label};
use crate::extract::{
    Cell, ContainerPattern, ElementPattern, Memo, RecordExtractor, RecordLayout, Row,
};
use crate::models::ClinicalNote;

/// Rows per note in the history area.
pub const ROWS_PER_NOTE: usize = 5;

const NOTE_LAYOUT: RecordLayout = RecordLayout {
    containers: &[
        ContainerPattern::id("div", "areaHistEvol"),
        ContainerPattern::name("div", "areaHistEvol"),
    ],
    record: ElementPattern::class("div", "row"),
    field: Some(ElementPattern::any_with_class("col-lg-")),
    fallback: &[
        "[id*='HistEvol'] .row",
        "[id*='histEvol'] .row",
        "[name*='HistEvol'] .row",
    ],
    fallback_field: Some("[class*='col-lg-']"),
    keep_empty: true,
};

const AUTHOR: &[&str] = &["Profissional:"];
const ROLE: &[&str] = &["Atividade:"];
const NOTED_AT: &[&str] = &["Data Evolução:"];
const UPDATED_AT: &[&str] = &["Data de Atualização:", "Data Atualização:"];
const WARD_BED: &[&str] = &["Clínica/Leito:"];
const DESCRIPTION: &[&str] = &["Descrição:"];

static NOTE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"txtView(\w+)").expect("valid note id regex"));

/// Value cell following the first cell labeled with any of `labels`.
fn labeled<'a>(group: &'a [Row], labels: &[&str]) -> Option<&'a Cell> {
    let folded: Vec<String> = labels.iter().map(|l| fold_label(l)).collect();
    group.iter().find_map(|row| {
        let idx = row.cells.iter().position(|cell| {
            let text = fold_label(&cell.text);
            folded.iter().any(|l| text.starts_with(l.as_str()))
        })?;
        row.cells.get(idx + 1)
    })
}

fn labeled_text(group: &[Row], labels: &[&str]) -> String {
    labeled(group, labels).map(|c| c.text.clone()).unwrap_or_default()
}

/// Parser for a patient's note history.
pub struct NoteParser {
    records: RecordExtractor,
    memo: Memo<Vec<ClinicalNote>>,
}

impl Default for NoteParser {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteParser {
    pub fn new() -> Self {
        Self {
            records: RecordExtractor::new(NOTE_LAYOUT),
            memo: Memo::new(),
        }
    }

    /// Parse every note of the history page, merged by id.
    pub fn parse(&self, markup: &str, patient_id: &str) -> Vec<ClinicalNote> {
        self.memo
            .get_or_compute(markup, patient_id, || self.parse_uncached(markup, patient_id))
    }

    fn parse_uncached(&self, markup: &str, patient_id: &str) -> Vec<ClinicalNote> {
        let rows = self.records.extract(markup);
        let mut notes: Vec<ClinicalNote> = Vec::new();
        let mut by_key: HashMap<String, usize> = HashMap::new();
        let mut skipped = 0usize;
        let mut merged = 0usize;

        for group in rows.chunks(ROWS_PER_NOTE) {
            let Some(note) = parse_group(group, patient_id) else {
                skipped += 1;
                continue;
            };
            let key = note.key();
            match by_key.get(&key) {
                Some(&idx) => {
                    notes[idx].merge(&note);
                    merged += 1;
                }
                None => {
                    by_key.insert(key, notes.len());
                    notes.push(note);
                }
            }
        }

        debug!(
            patient = patient_id,
            rows = rows.len(),
            notes = notes.len(),
            skipped,
            merged,
            "parsed note history"
        );
        notes
    }
}

/// One note from a group of rows. Groups without a note date are skipped.
fn parse_group(group: &[Row], patient_id: &str) -> Option<ClinicalNote> {
    let noted_at = labeled_text(group, NOTED_AT);
    if !has_date(&noted_at) {
        trace!(noted_at = %noted_at, "group without note date");
        return None;
    }

    let group_html: String = group.iter().map(|r| r.html.as_str()).collect();
    let id = NOTE_ID
        .captures(&group_html)
        .map(|caps| caps[1].to_string());

    let body = match labeled(group, DESCRIPTION) {
        Some(cell) => cell.html.trim().to_string(),
        None => description_panel(&group_html).unwrap_or_default(),
    };

    Some(ClinicalNote {
        id,
        patient_id: patient_id.to_string(),
        author_name: labeled_text(group, AUTHOR),
        author_role_text: labeled_text(group, ROLE),
        noted_at,
        updated_at: labeled_text(group, UPDATED_AT),
        ward_bed_at_time: labeled_text(group, WARD_BED),
        clean_text: clean_multiline(&body),
        body_text: body,
    })
}

/// Body of a `txtView…` panel when the group has no labeled description.
fn description_panel(html: &str) -> Option<String> {
    let panel = elements(html, |_, attrs| {
        attrs
            .iter()
            .any(|(k, v)| k == "id" && v.starts_with("txtView"))
    })
    .into_iter()
    .next()?;
    Some(panel.inner(html).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(label: &str, value: &str) -> String {
        format!(r#"<div class="col-lg-2"><b>{label}</b></div><div class="col-lg-4">{value}</div>"#)
    }

    fn group(id: &str, author: &str, role: &str, at: &str, body: &str) -> String {
        format!(
            r#"<div class="row">{}{}</div>
               <div class="row">{}{}</div>
               <div class="row">{}</div>
               <div class="row"><div class="col-lg-2">Descrição:</div><div class="col-lg-10"><div id="txtView{id}">{body}</div></div></div>
               <div class="row"><div class="col-lg-12"><hr></div></div>"#,
            pair("Profissional:", author),
            pair("Data Evolução:", at),
            pair("Atividade:", role),
            pair("Data de Atualização:", at),
            pair("Clinica / Leito:", "007-U T I"),
        )
    }

    fn page(groups: &[String]) -> String {
        format!(r#"<html><body><div id="areaHistEvol">{}</div></body></html>"#, groups.concat())
    }

    #[test]
    fn test_parse_single_note() {
        let html = page(&[group(
            "901",
            "TAMILA ARAGAO",
            "PEDIATRA",
            "23/08/2025 15:28:30",
            "Admissão em UTIP<br>Hipóteses diagnósticas:<br>Crise convulsiva",
        )]);
        let notes = NoteParser::new().parse(&html, "TESTE123");
        assert_eq!(notes.len(), 1);
        let note = &notes[0];
        assert_eq!(note.id.as_deref(), Some("901"));
        assert_eq!(note.patient_id, "TESTE123");
        assert_eq!(note.author_name, "TAMILA ARAGAO");
        assert_eq!(note.author_role_text, "PEDIATRA");
        assert_eq!(note.noted_at, "23/08/2025 15:28:30");
        assert_eq!(note.updated_at, "23/08/2025 15:28:30");
        assert_eq!(note.ward_bed_at_time, "007-U T I");
        assert_eq!(
            note.clean_text,
            "Admissão em UTIP\nHipóteses diagnósticas:\nCrise convulsiva"
        );
    }

    #[test]
    fn test_group_without_date_is_skipped() {
        let html = page(&[
            group("1", "ANA", "Médico", "sem data", "texto"),
            group("2", "BIA", "Médico", "01/02/2024 08:00", "texto"),
        ]);
        let notes = NoteParser::new().parse(&html, "1");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id.as_deref(), Some("2"));
    }

    #[test]
    fn test_fragments_with_same_id_merge() {
        let long_body = "x".repeat(500);
        let html = page(&[
            group("77", "DR. JOSE", "Evolução Médica", "01/02/2024 08:00", ""),
            group("77", "DR. JOSE", "", "01/02/2024 08:00", &long_body),
        ]);
        let notes = NoteParser::new().parse(&html, "1");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].author_role_text, "Evolução Médica");
        assert_eq!(notes[0].clean_text.len(), 500);
    }

    #[test]
    fn test_not_found_container_uses_fallback() {
        let inner = group("5", "ANA", "Médico", "02/02/2024 09:00", "corpo");
        let html = format!(r#"<div id="divHistEvolucao">{inner}</div>"#);
        let notes = NoteParser::new().parse(&html, "9");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].author_name, "ANA");
        assert_eq!(notes[0].clean_text, "corpo");
    }

    /// Three labeled rows followed by two bare spacer rows.
    fn spaced_group(id: &str, author: &str, at: &str) -> String {
        format!(
            r#"<div class="row">{}{}</div>
               <div class="row">{}{}</div>
               <div class="row"><div class="col-lg-2">Descrição:</div><div class="col-lg-10"><div id="txtView{id}">nota {id}</div></div></div>
               <div class="row"></div>
               <div class="row"><hr></div>"#,
            pair("Profissional:", author),
            pair("Data Evolução:", at),
            pair("Atividade:", "Médico"),
            pair("Data de Atualização:", at),
        )
    }

    #[test]
    fn test_cellless_spacer_rows_keep_groups_aligned() {
        let html = page(&[
            spaced_group("1", "ANA", "01/02/2024 08:00"),
            spaced_group("2", "BIA", "02/02/2024 08:00"),
            spaced_group("3", "CAIO", "03/02/2024 08:00"),
        ]);
        let notes = NoteParser::new().parse(&html, "1");
        assert_eq!(notes.len(), 3);
        let summary: Vec<(Option<&str>, &str, &str)> = notes
            .iter()
            .map(|n| (n.id.as_deref(), n.author_name.as_str(), n.noted_at.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Some("1"), "ANA", "01/02/2024 08:00"),
                (Some("2"), "BIA", "02/02/2024 08:00"),
                (Some("3"), "CAIO", "03/02/2024 08:00"),
            ]
        );
        assert_eq!(notes[1].clean_text, "nota 2");
    }

    #[test]
    fn test_empty_history() {
        let parser = NoteParser::new();
        assert!(parser.parse(r#"<div id="areaHistEvol"></div>"#, "1").is_empty());
        assert!(parser.parse("", "1").is_empty());
    }
}
