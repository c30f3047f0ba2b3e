//! Print-view queries for exam selections.
//!
//! The print view takes the selected exams as `idPrint_<line>=<code>` pairs
//! joined by `&`, base64-encoded into a single `param`.

use base64::{engine::general_purpose, Engine as _};
use tracing::debug;

use crate::models::{ExamItem, ExamRequisition, PrintQuery};

/// Build the print query for `items` of the requisition at `line_index`.
pub fn build_print_query(requisition_id: &str, line_index: &str, items: &[ExamItem]) -> PrintQuery {
    let query_string = items
        .iter()
        .map(|item| format!("idPrint_{line_index}={}", item.code))
        .collect::<Vec<_>>()
        .join("&");
    let encoded_param = general_purpose::STANDARD.encode(query_string.as_bytes());
    PrintQuery {
        requisition_id: requisition_id.to_string(),
        line_index: line_index.to_string(),
        query_string,
        encoded_param,
        item_count: items.len(),
    }
}

/// One query per requisition that has items.
pub fn build_print_queries(requisitions: &[ExamRequisition]) -> Vec<PrintQuery> {
    let queries: Vec<PrintQuery> = requisitions
        .iter()
        .filter(|r| !r.items.is_empty())
        .map(|r| build_print_query(&r.requisition_id, &r.line_index, &r.items))
        .collect();
    debug!(
        requisitions = requisitions.len(),
        queries = queries.len(),
        "built print queries"
    );
    queries
}

/// Decode an encoded `param` back to its query string.
pub fn decode_print_param(encoded: &str) -> Option<String> {
    let bytes = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    String::from_utf8(bytes).ok()
}

/// Exam codes selected in a query string.
pub fn print_codes(query_string: &str) -> Vec<String> {
    query_string
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(key, _)| key.starts_with("idPrint_"))
        .map(|(_, code)| code.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(code: &str) -> ExamItem {
        ExamItem {
            code: code.into(),
            name: format!("Exame {code}"),
        }
    }

    #[test]
    fn test_query_string_format() {
        let q = build_print_query("4411", "3", &[item("HMG"), item("TTPA")]);
        assert_eq!(q.query_string, "idPrint_3=HMG&idPrint_3=TTPA");
        assert_eq!(q.encoded_param, "aWRQcmludF8zPUhNRyZpZFByaW50XzM9VFRQQQ==");
        assert_eq!(q.item_count, 2);
        assert_eq!(q.requisition_id, "4411");
    }

    #[test]
    fn test_decode_and_codes() {
        let q = build_print_query("1", "0", &[item("URE"), item("CRE")]);
        let decoded = decode_print_param(&q.encoded_param).unwrap();
        assert_eq!(decoded, q.query_string);
        assert_eq!(print_codes(&decoded), vec!["URE", "CRE"]);
        assert!(decode_print_param("***").is_none());
    }

    #[test]
    fn test_requisitions_without_items_are_skipped() {
        let with_items = ExamRequisition {
            requisition_id: "10".into(),
            line_index: "1".into(),
            items: vec![item("HMG")],
            ..Default::default()
        };
        let empty = ExamRequisition {
            requisition_id: "11".into(),
            ..Default::default()
        };
        let queries = build_print_queries(&[with_items, empty]);
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].requisition_id, "10");
    }

    #[test]
    fn test_empty_selection() {
        let q = build_print_query("1", "0", &[]);
        assert_eq!(q.query_string, "");
        assert_eq!(q.encoded_param, "");
        assert_eq!(q.item_count, 0);
    }
}
