//! Exam result page parsing.
//!
//! Result pages come in three shapes: tables, named-analyte free text
//! (`Hematocrito....: 40,5 % VR: 36 a 46`), and loose `CODE: value` blocks.
//! They are tried in that order; the first that yields results wins.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace, warn};

use crate::config::ExtractionConfig;
use crate::extract::markup::clean_multiline;
use crate::extract::{element_text, is_malformed, Memo};
use crate::models::ExamResult;

use super::values::{infer_status, parse_decimal, unit_of};

static ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid row selector"));
static BLOCK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div, p, span").expect("valid block selector"));
static FONT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("font").expect("valid font selector"));

static CODE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\p{N}\-_.\s]+$").expect("valid code regex"));
static LOOSE_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z0-9\-_]+):\s*(.+)$").expect("valid loose pair regex"));
static INLINE_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.*?)\s*VR:\s*(.+)$").expect("valid inline reference regex"));

const HEADER_CODE_WORDS: &[&str] = &["exame", "resultado", "referência", "referencia"];
const HEADER_VALUE_WORDS: &[&str] = &["valor", "resultado"];

/// Whether a code/value pair looks like a result rather than a header.
pub fn is_valid_result(code: &str, value: &str) -> bool {
    let code = code.trim();
    let value = value.trim();
    if code.is_empty() || value.is_empty() {
        return false;
    }
    let code_lc = code.to_lowercase();
    let value_lc = value.to_lowercase();
    if HEADER_CODE_WORDS.iter().any(|w| code_lc.contains(w))
        || HEADER_VALUE_WORDS.iter().any(|w| value_lc.contains(w))
    {
        return false;
    }
    code.chars().count() >= 2 && CODE_CHARS.is_match(code)
}

/// A table cell as the layouts see it.
#[derive(Debug, Clone, Default)]
pub struct ResultCell {
    pub text: String,
    /// Value printed in the lab's alert color
    pub flagged: bool,
}

/// Column arrangement of a result table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultLayout {
    /// code | description | value | reference
    CodeDescValueRef,
    /// description | value | reference
    DescValueRef,
    /// code | value
    CodeValue,
}

/// Row values accepted by a layout.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutMatch {
    pub code: String,
    pub value: String,
    pub reference: Option<String>,
    pub flagged: bool,
}

impl ResultLayout {
    /// Layouts in the order they are tried.
    pub const ALL: [ResultLayout; 3] = [
        ResultLayout::CodeDescValueRef,
        ResultLayout::DescValueRef,
        ResultLayout::CodeValue,
    ];

    /// (code column, value column, reference column, minimum cells)
    const fn columns(self) -> (usize, usize, Option<usize>, usize) {
        match self {
            ResultLayout::CodeDescValueRef => (0, 2, Some(3), 4),
            ResultLayout::DescValueRef => (0, 1, Some(2), 3),
            ResultLayout::CodeValue => (0, 1, None, 2),
        }
    }

    pub fn apply(self, cells: &[ResultCell]) -> Option<LayoutMatch> {
        let (code_idx, value_idx, ref_idx, min_cells) = self.columns();
        if cells.len() < min_cells {
            return None;
        }
        let code = cells[code_idx].text.trim();
        let value = cells[value_idx].text.trim();
        if !is_valid_result(code, value) {
            return None;
        }
        let reference = ref_idx
            .map(|i| cells[i].text.trim().to_string())
            .filter(|r| !r.is_empty());
        Some(LayoutMatch {
            code: code.to_string(),
            value: value.to_string(),
            reference,
            flagged: cells[value_idx].flagged,
        })
    }
}

/// First layout accepting the row.
pub fn match_layout(cells: &[ResultCell]) -> Option<(ResultLayout, LayoutMatch)> {
    ResultLayout::ALL
        .iter()
        .find_map(|layout| layout.apply(cells).map(|m| (*layout, m)))
}

/// Parser for exam result pages.
pub struct ResultParser {
    analytes: Vec<(String, Regex)>,
    units: Vec<String>,
    memo: Memo<Vec<ExamResult>>,
}

impl Default for ResultParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultParser {
    pub fn new() -> Self {
        Self::with_config(&ExtractionConfig::default())
    }

    /// Analyte patterns that fail to compile are logged and skipped.
    pub fn with_config(config: &ExtractionConfig) -> Self {
        let analytes = config
            .analytes
            .iter()
            .filter_map(|a| match Regex::new(&a.to_regex()) {
                Ok(re) => Some((a.code.clone(), re)),
                Err(err) => {
                    warn!(code = %a.code, %err, "dropping analyte pattern");
                    None
                }
            })
            .collect();
        Self {
            analytes,
            units: config.units.clone(),
            memo: Memo::new(),
        }
    }

    pub fn parse(&self, markup: &str, requisition_id: &str) -> Vec<ExamResult> {
        self.memo.get_or_compute(markup, requisition_id, || {
            self.parse_uncached(markup, requisition_id)
        })
    }

    fn parse_uncached(&self, markup: &str, requisition_id: &str) -> Vec<ExamResult> {
        if is_malformed(markup) {
            return Vec::new();
        }
        let doc = Html::parse_document(markup);

        let results = self.from_tables(&doc, requisition_id);
        if !results.is_empty() {
            debug!(requisition = requisition_id, results = results.len(), "table results");
            return results;
        }
        let results = self.from_analytes(markup, requisition_id);
        if !results.is_empty() {
            debug!(requisition = requisition_id, results = results.len(), "analyte results");
            return results;
        }
        let results = self.from_loose_pairs(&doc, requisition_id);
        debug!(requisition = requisition_id, results = results.len(), "loose pair results");
        results
    }

    fn from_tables(&self, doc: &Html, requisition_id: &str) -> Vec<ExamResult> {
        doc.select(&ROW)
            .filter_map(|row| {
                let cells = row_cells(row);
                let (layout, m) = match_layout(&cells)?;
                trace!(?layout, code = %m.code, "result row");
                Some(self.build(
                    requisition_id,
                    m.code,
                    m.value,
                    m.reference,
                    m.flagged,
                ))
            })
            .collect()
    }

    fn from_analytes(&self, markup: &str, requisition_id: &str) -> Vec<ExamResult> {
        let text = clean_multiline(markup);
        let mut results = Vec::new();
        for (code, pattern) in &self.analytes {
            for caps in pattern.captures_iter(&text) {
                let value = caps[1].to_string();
                let unit = match caps.name("unit") {
                    Some(u) => Some(u.as_str().to_string()),
                    None => unit_of(&caps[0], &self.units),
                };
                let reference = caps
                    .name("reference")
                    .map(|r| r.as_str().trim().to_string())
                    .filter(|r| !r.is_empty());
                let numeric_value = parse_decimal(&value);
                results.push(ExamResult {
                    requisition_id: requisition_id.to_string(),
                    analyte_code: code.clone(),
                    status: infer_status(numeric_value, reference.as_deref(), false),
                    raw_value: value,
                    unit,
                    numeric_value,
                    reference_range: reference,
                });
            }
        }
        results
    }

    fn from_loose_pairs(&self, doc: &Html, requisition_id: &str) -> Vec<ExamResult> {
        let mut seen = HashSet::new();
        let mut results = Vec::new();
        // innermost blocks only; an outer block's text fuses its children
        for block in doc.select(&BLOCK) {
            if block.select(&BLOCK).next().is_some() {
                continue;
            }
            let text = element_text(&block);
            let Some(caps) = LOOSE_PAIR.captures(&text) else {
                continue;
            };
            let code = caps[1].trim().to_string();
            let rest = caps[2].trim();
            let (value, reference) = match INLINE_REFERENCE.captures(rest) {
                Some(r) => (r[1].trim().to_string(), Some(r[2].trim().to_string())),
                None => (rest.to_string(), None),
            };
            if !is_valid_result(&code, &value) || !seen.insert((code.clone(), value.clone())) {
                continue;
            }
            results.push(self.build(requisition_id, code, value, reference, false));
        }
        results
    }

    fn build(
        &self,
        requisition_id: &str,
        code: String,
        value: String,
        reference: Option<String>,
        flagged: bool,
    ) -> ExamResult {
        let numeric_value = parse_decimal(&value);
        ExamResult {
            requisition_id: requisition_id.to_string(),
            analyte_code: code,
            unit: unit_of(&value, &self.units),
            status: infer_status(numeric_value, reference.as_deref(), flagged),
            raw_value: value,
            numeric_value,
            reference_range: reference,
        }
    }
}

/// Direct `td` children of a row, so nested tables don't leak cells upward.
fn row_cells(row: ElementRef<'_>) -> Vec<ResultCell> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .map(|td| ResultCell {
            text: element_text(&td),
            flagged: is_flagged(td),
        })
        .collect()
}

fn is_flagged(cell: ElementRef<'_>) -> bool {
    cell.select(&FONT).any(|font| {
        font.value().attr("color").is_some_and(|c| {
            let c = c.trim().to_lowercase();
            c == "#ff0000" || c == "red"
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResultStatus;

    fn cells(texts: &[&str]) -> Vec<ResultCell> {
        texts
            .iter()
            .map(|t| ResultCell { text: t.to_string(), flagged: false })
            .collect()
    }

    #[test]
    fn test_layout_order() {
        let (layout, m) = match_layout(&cells(&["HGB", "Hemoglobina", "13,5 g/dL", "12 a 16"])).unwrap();
        assert_eq!(layout, ResultLayout::CodeDescValueRef);
        assert_eq!(m.value, "13,5 g/dL");
        assert_eq!(m.reference.as_deref(), Some("12 a 16"));

        let (layout, m) = match_layout(&cells(&["Hemoglobina", "13,5 g/dL", "12 a 16"])).unwrap();
        assert_eq!(layout, ResultLayout::DescValueRef);
        assert_eq!(m.code, "Hemoglobina");

        let (layout, m) = match_layout(&cells(&["PLT", "250000"])).unwrap();
        assert_eq!(layout, ResultLayout::CodeValue);
        assert_eq!(m.reference, None);
    }

    #[test]
    fn test_header_rows_rejected() {
        assert!(match_layout(&cells(&["Exame", "Resultado", "Referência"])).is_none());
        assert!(match_layout(&cells(&["HGB", "Valor"])).is_none());
        assert!(match_layout(&cells(&["X", "10"])).is_none());
        assert!(match_layout(&cells(&["HGB"])).is_none());
        assert!(!is_valid_result("HGB*", "10"));
    }

    #[test]
    fn test_two_column_table() {
        let html = r#"<table>
            <tr><td>HGB</td><td>13,5 g/dL</td></tr>
            <tr><td>PLT</td><td>250000</td></tr>
        </table>"#;
        let results = ResultParser::new().parse(html, "77");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].analyte_code, "HGB");
        assert_eq!(results[0].unit.as_deref(), Some("g/dL"));
        assert_eq!(results[0].numeric_value, Some(13.5));
        assert_eq!(results[0].reference_range, None);
        assert_eq!(results[0].status, ResultStatus::NoReference);
        assert_eq!(results[1].requisition_id, "77");
    }

    #[test]
    fn test_status_from_reference_and_color() {
        let html = r##"<table>
            <tr><td>Exame</td><td>Descrição</td><td>Resultado</td><td>Referência</td></tr>
            <tr><td>HGB</td><td>Hemoglobina</td><td>9,1 g/dL</td><td>12 a 16</td></tr>
            <tr><td>HTO</td><td>Hematócrito</td><td>40 %</td><td>36 a 46</td></tr>
            <tr><td>K</td><td>Potássio</td><td>4,0</td><td>3,5 - 5,1</td></tr>
            <tr><td>NA</td><td>Sódio</td><td><font color="#FF0000">139</font></td><td>135 - 145</td></tr>
        </table>"##;
        let results = ResultParser::new().parse(html, "1");
        let status: Vec<_> = results.iter().map(|r| (r.analyte_code.as_str(), r.status)).collect();
        assert_eq!(
            status,
            vec![
                ("HGB", ResultStatus::Altered),
                ("HTO", ResultStatus::Normal),
                ("NA", ResultStatus::Altered),
            ]
        );
    }

    #[test]
    fn test_named_analyte_text() {
        let html = r#"<html><body><pre>
            Hematocrito..............: 40,5 % VR: 36 a 46<br>
            Hemoglobina..............: 10,2 g/dl VR: 12,0 a 16,0<br>
            RNI......................: 1,1<br>
        </pre></body></html>"#;
        let results = ResultParser::new().parse(html, "9");
        let hto = results.iter().find(|r| r.analyte_code == "HTO").unwrap();
        assert_eq!(hto.raw_value, "40,5");
        assert_eq!(hto.unit.as_deref(), Some("%"));
        assert_eq!(hto.reference_range.as_deref(), Some("36 a 46"));
        assert_eq!(hto.status, ResultStatus::Normal);

        let hgb = results.iter().find(|r| r.analyte_code == "HGB").unwrap();
        assert_eq!(hgb.status, ResultStatus::Altered);

        let rni = results.iter().find(|r| r.analyte_code == "RNI").unwrap();
        assert_eq!(rni.numeric_value, Some(1.1));
        assert_eq!(rni.status, ResultStatus::NoReference);
    }

    #[test]
    fn test_loose_pairs_fallback() {
        let html = r#"<div><p>GLI: 98 mg/dL VR: 70 a 99</p><p>GLI: 98 mg/dL VR: 70 a 99</p><span>obs: texto</span></div>"#;
        let results = ResultParser::new().parse(html, "3");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].analyte_code, "GLI");
        assert_eq!(results[0].raw_value, "98 mg/dL");
        assert_eq!(results[0].unit.as_deref(), Some("mg/dL"));
        assert_eq!(results[0].reference_range.as_deref(), Some("70 a 99"));
        assert_eq!(results[0].status, ResultStatus::Normal);
    }

    #[test]
    fn test_malformed_page() {
        assert!(ResultParser::new().parse("sem resultados", "1").is_empty());
    }
}
