//! Exam requisition list parsing.
//!
//! Each requisition is printed as an "Informações:" fieldset (a label/value
//! table) immediately followed by a fieldset listing its exams and the print
//! trigger.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};

use crate::extract::markup::fold_label;
use crate::extract::{element_text, is_malformed, Memo};
use crate::models::{ExamItem, ExamRequisition};

static FIELDSET: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("fieldset").expect("valid fieldset selector"));
static LEGEND: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("legend").expect("valid legend selector"));
static INFO_ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table tr").expect("valid info row selector"));
static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("valid cell selector"));
static PRINT_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[onclick*='imprimirEvo']").expect("valid print link selector")
});
static ITEM_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[onclick*='selecionaEx']").expect("valid item link selector")
});

static PRINT_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"imprimirEvo\(\s*'([^']*)'\s*,\s*'([^']*)'\s*\)").expect("valid print ref regex")
});
static ITEM_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"selecionaEx\(\s*'([^']+)'").expect("valid item ref regex"));

const INFO_LEGEND: &str = "Informações:";

/// Parser for a patient's exam requisition list.
#[derive(Default)]
pub struct RequisitionParser {
    memo: Memo<Vec<ExamRequisition>>,
}

impl RequisitionParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&self, markup: &str, patient_id: &str) -> Vec<ExamRequisition> {
        self.memo
            .get_or_compute(markup, patient_id, || parse_requisitions(markup, patient_id))
    }
}

fn parse_requisitions(markup: &str, patient_id: &str) -> Vec<ExamRequisition> {
    if is_malformed(markup) {
        return Vec::new();
    }
    let doc = Html::parse_document(markup);
    let info_legend = fold_label(INFO_LEGEND);
    let mut requisitions = Vec::new();
    let mut dropped = 0usize;

    for fieldset in doc.select(&FIELDSET) {
        let is_info = fieldset
            .select(&LEGEND)
            .next()
            .is_some_and(|legend| fold_label(&element_text(&legend)) == info_legend);
        if !is_info {
            continue;
        }
        let Some(mut requisition) = parse_info(fieldset, patient_id) else {
            dropped += 1;
            continue;
        };
        if let Some(items_block) = next_fieldset(fieldset) {
            parse_items(items_block, &mut requisition);
        }
        if requisition.requisition_id.is_empty() {
            requisition.requisition_id = requisition.requisition_number.clone();
        }
        requisitions.push(requisition);
    }

    debug!(
        patient = patient_id,
        requisitions = requisitions.len(),
        dropped,
        "parsed exam requisitions"
    );
    requisitions
}

/// The sibling element right after `el`, when it is a fieldset.
fn next_fieldset(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.next_siblings()
        .find_map(ElementRef::wrap)
        .filter(|sibling| sibling.value().name() == "fieldset")
}

/// Label/value table of an info block. Blocks with neither a patient name nor
/// a requisition number are dropped.
fn parse_info(fieldset: ElementRef<'_>, patient_id: &str) -> Option<ExamRequisition> {
    let mut requisition = ExamRequisition {
        patient_id: patient_id.to_string(),
        ..Default::default()
    };
    let mut date = String::new();
    let mut time = String::new();

    for row in fieldset.select(&INFO_ROW) {
        let cells: Vec<ElementRef> = row.select(&CELL).collect();
        if cells.len() < 2 {
            continue;
        }
        let value = element_text(&cells[1]);
        match fold_label(&element_text(&cells[0])).as_str() {
            "nome:" => requisition.patient_name = value,
            "data:" => date = value,
            "hora:" => time = value,
            "requisicao:" => requisition.requisition_number = value,
            "clinica:" => requisition.clinic = value,
            "medico:" => requisition.ordering_physician = value,
            "unidadedesaude:" => requisition.health_unit = value,
            other => trace!(label = other, "unknown requisition label"),
        }
    }

    requisition.ordered_at = format!("{date} {time}").trim().to_string();
    if requisition.patient_name.is_empty() && requisition.requisition_number.is_empty() {
        return None;
    }
    Some(requisition)
}

/// Print trigger and exam items of the block following an info block.
fn parse_items(block: ElementRef<'_>, requisition: &mut ExamRequisition) {
    let trigger = block
        .select(&PRINT_LINK)
        .filter_map(|a| a.value().attr("onclick"))
        .find_map(|onclick| PRINT_REF.captures(onclick));
    if let Some(caps) = trigger {
        requisition.requisition_id = caps[1].to_string();
        requisition.line_index = caps[2].to_string();
    }

    requisition.items = block
        .select(&ITEM_LINK)
        .filter_map(|a| {
            let onclick = a.value().attr("onclick")?;
            let caps = ITEM_REF.captures(onclick)?;
            Some(ExamItem {
                code: caps[1].to_string(),
                name: element_text(&a),
            })
        })
        .collect();
}
