//! Two-strategy record extraction.
//!
//! The fast path scans raw markup for a container element and iterates its
//! repeated records without building a tree. Only when no container is found
//! does the fallback parse a full document and walk an ordered selector chain.

pub mod markup;
mod memo;
mod tree;

pub use memo::Memo;
pub use tree::{compile_selector, element_text, row_from_element, SelectorChain};

use scraper::{Html, Selector};
use tracing::{debug, warn};

use markup::{clean_multiline, elements, next_element, strip_comments, text_of, to_lowercase_fast};

/// Outcome of locating a container.
///
/// `NotFound` is distinct from `Found(vec![])`: only the former triggers the
/// fallback strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Located<T> {
    Found(T),
    NotFound,
}

impl<T> Located<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Located::Found(_))
    }
}

/// Which attribute identifies a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerAttr {
    /// `id` equals the value (case-insensitive)
    Id,
    /// `name` equals the value (case-insensitive)
    Name,
    /// `class` has the value as a token (case-insensitive)
    Class,
}

/// One identifying pattern for a container element.
#[derive(Debug, Clone, Copy)]
pub struct ContainerPattern {
    pub tag: &'static str,
    pub attr: ContainerAttr,
    pub value: &'static str,
}

impl ContainerPattern {
    pub const fn id(tag: &'static str, value: &'static str) -> Self {
        Self { tag, attr: ContainerAttr::Id, value }
    }

    pub const fn name(tag: &'static str, value: &'static str) -> Self {
        Self { tag, attr: ContainerAttr::Name, value }
    }

    pub const fn class(tag: &'static str, value: &'static str) -> Self {
        Self { tag, attr: ContainerAttr::Class, value }
    }

    fn matches(&self, tag: &str, attrs: &[(String, String)]) -> bool {
        if tag != self.tag {
            return false;
        }
        let key = match self.attr {
            ContainerAttr::Id => "id",
            ContainerAttr::Name => "name",
            ContainerAttr::Class => "class",
        };
        attrs.iter().filter(|(k, _)| k == key).any(|(_, v)| match self.attr {
            ContainerAttr::Class => v
                .split_whitespace()
                .any(|t| t.eq_ignore_ascii_case(self.value)),
            _ => v.trim().eq_ignore_ascii_case(self.value),
        })
    }
}

/// How an [`ElementPattern`] tests the `class` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassMatch {
    /// One whitespace-separated token equals the value, like CSS `.value`
    Token(&'static str),
    /// The attribute contains the value anywhere, like CSS `[class*=value]`
    Contains(&'static str),
}

impl ClassMatch {
    fn matches(&self, class: &str) -> bool {
        match self {
            ClassMatch::Token(token) => class.split_whitespace().any(|t| t == *token),
            ClassMatch::Contains(needle) => class.contains(needle),
        }
    }
}

/// Matches an element by tag and/or its `class` attribute.
#[derive(Debug, Clone, Copy)]
pub struct ElementPattern {
    pub tag: Option<&'static str>,
    pub class: Option<ClassMatch>,
}

impl ElementPattern {
    pub const fn tag(tag: &'static str) -> Self {
        Self { tag: Some(tag), class: None }
    }

    /// `tag.token`
    pub const fn class(tag: &'static str, token: &'static str) -> Self {
        Self { tag: Some(tag), class: Some(ClassMatch::Token(token)) }
    }

    /// `[class*=needle]` on any tag
    pub const fn any_with_class(needle: &'static str) -> Self {
        Self { tag: None, class: Some(ClassMatch::Contains(needle)) }
    }

    fn matches(&self, tag: &str, attrs: &[(String, String)]) -> bool {
        if self.tag.is_some_and(|t| t != tag) {
            return false;
        }
        match self.class {
            None => true,
            Some(class) => attrs
                .iter()
                .any(|(k, v)| k == "class" && class.matches(v)),
        }
    }
}

/// Shape of a record listing: where the container is, what a record looks
/// like inside it, and how to find its fields.
#[derive(Debug, Clone, Copy)]
pub struct RecordLayout {
    /// Container patterns, tried in order
    pub containers: &'static [ContainerPattern],
    /// Repeated record element inside the container
    pub record: ElementPattern,
    /// Field elements inside a record; `None` means direct child elements
    pub field: Option<ElementPattern>,
    /// CSS selectors that select records directly, tried in order
    pub fallback: &'static [&'static str],
    /// CSS selector for fields in the fallback path
    pub fallback_field: Option<&'static str>,
    /// Keep records without fields. Listings that count records positionally
    /// need their empty spacer records.
    pub keep_empty: bool,
}

/// One cell (field element) of a record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub html: String,
}

/// One record pulled out of a listing, independent of the strategy that found it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    /// Attributes of the record element itself
    pub attrs: Vec<(String, String)>,
    pub cells: Vec<Cell>,
    /// Inner markup of the record element
    pub html: String,
    /// Inner text, whitespace-collapsed
    pub text: String,
    /// Inner text with line breaks kept
    pub multiline: String,
}

impl Row {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn cell_text(&self, idx: usize) -> &str {
        self.cells.get(idx).map(|c| c.text.as_str()).unwrap_or("")
    }

    /// Value of a `label | value` pair: the cell right after the first cell
    /// whose text contains `label`.
    pub fn labeled(&self, label: &str) -> Option<&Cell> {
        let idx = self.cells.iter().position(|c| c.text.contains(label))?;
        self.cells.get(idx + 1)
    }

    fn is_placeholder(&self, expects_fields: bool, keep_empty: bool) -> bool {
        if keep_empty {
            false
        } else if expects_fields {
            self.cells.is_empty()
        } else {
            self.cells.is_empty() && self.text.is_empty()
        }
    }
}

/// True when the input cannot hold any markup worth scanning.
pub fn is_malformed(markup: &str) -> bool {
    markup.trim().is_empty() || !markup.contains('<')
}

/// Record extractor for one [`RecordLayout`].
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    layout: RecordLayout,
    chain: SelectorChain,
    fallback_field: Option<Selector>,
}

impl RecordExtractor {
    pub fn new(layout: RecordLayout) -> Self {
        let fallback_field = layout.fallback_field.and_then(|p| match compile_selector(p) {
            Ok(sel) => Some(sel),
            Err(err) => {
                warn!(%err, "dropping fallback field selector");
                None
            }
        });
        Self {
            layout,
            chain: SelectorChain::new(layout.fallback),
            fallback_field,
        }
    }

    /// Fast path, then fallback when the container is not found.
    ///
    /// Malformed input yields an empty list without trying either strategy.
    pub fn extract(&self, markup: &str) -> Vec<Row> {
        if is_malformed(markup) {
            debug!("input is not markup, nothing to extract");
            return Vec::new();
        }
        match self.fast_path(markup) {
            Located::Found(rows) => {
                debug!(records = rows.len(), "fast path");
                rows
            }
            Located::NotFound => {
                let rows = self.fallback(markup);
                debug!(records = rows.len(), "fallback path");
                rows
            }
        }
    }

    /// Locate the container by scanning and iterate its records.
    pub fn fast_path(&self, markup: &str) -> Located<Vec<Row>> {
        let source = strip_comments(markup);
        let source = source.as_ref();
        let Some(container) = self.locate_container(source) else {
            return Located::NotFound;
        };
        let inner = container.inner(source);

        let expects_fields = self.layout.field.is_some();
        let rows = elements(inner, |tag, attrs| self.layout.record.matches(tag, attrs))
            .into_iter()
            .map(|el| {
                let html = el.inner(inner);
                Row {
                    attrs: el.attrs.clone(),
                    cells: self.fields_of(html),
                    html: html.to_string(),
                    text: text_of(html),
                    multiline: clean_multiline(html),
                }
            })
            .filter(|row| !row.is_placeholder(expects_fields, self.layout.keep_empty))
            .collect();
        Located::Found(rows)
    }

    fn locate_container(&self, source: &str) -> Option<markup::Element> {
        let lc = to_lowercase_fast(source);
        self.layout.containers.iter().find_map(|pattern| {
            next_element(source, &lc, 0, |tag, attrs| pattern.matches(tag, attrs))
        })
    }

    fn fields_of(&self, record_html: &str) -> Vec<Cell> {
        let found = match self.layout.field {
            Some(field) => elements(record_html, |tag, attrs| field.matches(tag, attrs)),
            None => elements(record_html, |_, _| true),
        };
        found
            .into_iter()
            .map(|el| {
                let html = el.inner(record_html);
                Cell {
                    text: text_of(html),
                    html: html.to_string(),
                    attrs: el.attrs,
                }
            })
            .collect()
    }

    /// Build a document tree and walk the selector chain.
    pub fn fallback(&self, markup: &str) -> Vec<Row> {
        if self.chain.is_empty() {
            return Vec::new();
        }
        let doc = Html::parse_document(markup);
        let Some((idx, found)) = self.chain.resolve(&doc) else {
            return Vec::new();
        };
        debug!(selector = idx, "fallback selector matched");
        let expects_fields = self.fallback_field.is_some();
        found
            .iter()
            .map(|el| row_from_element(el, self.fallback_field.as_ref()))
            .filter(|row| !row.is_placeholder(expects_fields, self.layout.keep_empty))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: RecordLayout = RecordLayout {
        containers: &[
            ContainerPattern::id("table", "tbPacientes"),
            ContainerPattern::class("table", "patient-table"),
        ],
        record: ElementPattern::tag("tr"),
        field: Some(ElementPattern::tag("td")),
        fallback: &["tr[data-patient]", "table tr"],
        fallback_field: Some("td"),
        keep_empty: false,
    };

    const BLOCKS: RecordLayout = RecordLayout {
        containers: &[ContainerPattern::id("div", "blocks")],
        record: ElementPattern::class("div", "row"),
        field: Some(ElementPattern::any_with_class("col-lg-")),
        fallback: &[],
        fallback_field: None,
        keep_empty: true,
    };

    #[test]
    fn test_fast_path_finds_container_by_class() {
        let html = r#"
            <table class="grid PATIENT-TABLE">
              <tr><th>Reg</th><th>Nome</th></tr>
              <tr><td>123</td><td>Ana</td></tr>
              <!-- <tr><td>999</td><td>Exemplo</td></tr> -->
              <tr><td>456</td><td>Bia</td></tr>
            </table>"#;
        let ex = RecordExtractor::new(TABLE);
        let Located::Found(rows) = ex.fast_path(html) else {
            panic!("container should be found");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cell_text(0), "123");
        assert_eq!(rows[1].cell_text(1), "Bia");
    }

    #[test]
    fn test_found_but_empty_is_not_fallback() {
        let html = r#"<table id="tbpacientes"></table><table><tr data-patient="1"><td>1</td></tr></table>"#;
        let ex = RecordExtractor::new(TABLE);
        assert_eq!(ex.fast_path(html), Located::Found(vec![]));
        assert!(ex.extract(html).is_empty());
    }

    #[test]
    fn test_not_found_uses_fallback() {
        let html = r#"<div><table><tr data-patient="7"><td>7</td><td>Caio</td></tr></table></div>"#;
        let ex = RecordExtractor::new(TABLE);
        assert_eq!(ex.fast_path(html), Located::NotFound);
        let rows = ex.extract(html);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].attr("data-patient"), Some("7"));
        assert_eq!(rows[0].cell_text(1), "Caio");
    }

    #[test]
    fn test_malformed_input_is_empty() {
        let ex = RecordExtractor::new(TABLE);
        assert!(ex.extract("").is_empty());
        assert!(ex.extract("just some text").is_empty());
    }

    #[test]
    fn test_keep_empty_records() {
        let html = r#"<div id="blocks">
              <div class="row"><div class="col-lg-2">a</div></div>
              <div class="row"></div>
              <div class="row"><hr></div>
              <div class="row"><div class="col-lg-12">b</div></div>
            </div>"#;
        let Located::Found(rows) = RecordExtractor::new(BLOCKS).fast_path(html) else {
            panic!("container should be found");
        };
        assert_eq!(rows.len(), 4);
        assert!(rows[1].cells.is_empty());
        assert!(rows[2].cells.is_empty());
        assert_eq!(rows[3].cell_text(0), "b");
    }

    #[test]
    fn test_record_class_is_a_whole_token() {
        let html = r#"<div id="blocks">
              <div class="arrow"><div class="col-lg-2">x</div></div>
              <div class="row-fluid"><div class="col-lg-2">y</div></div>
              <div class="rowspan-x"><div class="col-lg-2">z</div></div>
              <div class="panel row"><div class="col-lg-10">ok</div></div>
            </div>"#;
        let Located::Found(rows) = RecordExtractor::new(BLOCKS).fast_path(html) else {
            panic!("container should be found");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cell_text(0), "ok");
    }

    #[test]
    fn test_class_match_kinds() {
        assert!(ClassMatch::Token("row").matches("panel row"));
        assert!(!ClassMatch::Token("row").matches("arrow row-fluid"));
        assert!(ClassMatch::Contains("col-lg-").matches("col-lg-10 text"));
        assert!(!ClassMatch::Contains("col-lg-").matches("col-md-4"));
    }

    #[test]
    fn test_labeled_cell() {
        let row = Row {
            cells: vec![
                Cell { text: "Profissional:".into(), ..Default::default() },
                Cell { text: "Dr. Jose".into(), ..Default::default() },
            ],
            ..Default::default()
        };
        assert_eq!(row.labeled("Profissional:").map(|c| c.text.as_str()), Some("Dr. Jose"));
        assert!(row.labeled("Atividade:").is_none());
    }
}
