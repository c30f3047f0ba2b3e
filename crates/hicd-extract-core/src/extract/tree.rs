//! Tree-based fallback: parse the whole document and try selectors in order.

use scraper::{ElementRef, Html, Selector};
use tracing::{trace, warn};

use crate::error::{ExtractError, ExtractResult};

use super::markup::{clean_multiline, normalize_ws};
use super::{Cell, Row};

/// Compile a CSS selector, mapping the parser's borrowed error to an owned one.
pub fn compile_selector(pattern: &str) -> ExtractResult<Selector> {
    Selector::parse(pattern).map_err(|e| ExtractError::Selector(format!("{pattern}: {e}")))
}

/// An ordered list of record selectors. The first selector yielding at least
/// one element wins.
#[derive(Debug, Clone)]
pub struct SelectorChain {
    selectors: Vec<(String, Selector)>,
}

impl SelectorChain {
    /// Compile `patterns`. Patterns that fail to compile are logged and skipped.
    pub fn new(patterns: &[&str]) -> Self {
        let selectors = patterns
            .iter()
            .filter_map(|p| match compile_selector(p) {
                Ok(sel) => Some((p.to_string(), sel)),
                Err(err) => {
                    warn!(%err, "dropping fallback selector");
                    None
                }
            })
            .collect();
        Self { selectors }
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Resolve the record set: (index of the winning selector, its elements).
    pub fn resolve<'a>(&self, doc: &'a Html) -> Option<(usize, Vec<ElementRef<'a>>)> {
        self.selectors
            .iter()
            .enumerate()
            .find_map(|(idx, (pattern, sel))| {
                let found: Vec<ElementRef<'a>> = doc.select(sel).collect();
                trace!(selector = %pattern, count = found.len(), "fallback selector");
                (!found.is_empty()).then_some((idx, found))
            })
    }
}

/// Flattened text of an element.
pub fn element_text(el: &ElementRef<'_>) -> String {
    let parts: Vec<&str> = el.text().collect();
    normalize_ws(&parts.join(" "))
}

/// Build a [`Row`] from a tree element. With `field` the cells are its
/// descendants matching that selector; otherwise its direct element children.
pub fn row_from_element(el: &ElementRef<'_>, field: Option<&Selector>) -> Row {
    let cells: Vec<Cell> = match field {
        Some(sel) => el.select(sel).map(|c| cell_from_element(&c)).collect(),
        None => el
            .children()
            .filter_map(ElementRef::wrap)
            .map(|c| cell_from_element(&c))
            .collect(),
    };
    let html = el.inner_html();
    Row {
        attrs: attrs_of(el),
        text: element_text(el),
        multiline: clean_multiline(&html),
        html,
        cells,
    }
}

fn cell_from_element(el: &ElementRef<'_>) -> Cell {
    Cell {
        attrs: attrs_of(el),
        text: element_text(el),
        html: el.inner_html(),
    }
}

fn attrs_of(el: &ElementRef<'_>) -> Vec<(String, String)> {
    el.value()
        .attrs()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
        .collect()
}
