//! Low-level markup scanning.
//!
//! Tag and attribute names are matched case-insensitively on ASCII. Nothing here
//! builds a tree: elements are located by scanning for `<tag` and then finding
//! the matching close, counting depth for nesting tags and stopping at the next
//! sibling for tags whose end tag is optional.

use std::borrow::Cow;

/// Tags whose end tag may be omitted; a new open tag of the same name closes them.
const IMPLIED_END: &[&str] = &["option", "tr", "td", "th", "li", "p", "dt", "dd"];

/// Tags that never have content.
const VOID: &[&str] = &["br", "hr", "img", "input", "meta", "link", "col", "wbr"];

/// Tags replaced by a space when flattening to text.
const BLOCK: &[&str] = &[
    "br", "p", "div", "td", "th", "tr", "li", "table", "fieldset", "legend", "option", "h1", "h2",
    "h3", "h4",
];

/// One element located in a markup string. Offsets index into the scanned string.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Lowercased tag name
    pub tag: String,
    /// Attributes, names lowercased, values entity-decoded
    pub attrs: Vec<(String, String)>,
    pub start: usize,
    pub open_end: usize,
    pub inner_end: usize,
    pub end: usize,
}

impl Element {
    /// Attribute value by (lowercase) name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whitespace-separated class tokens.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn inner<'a>(&self, source: &'a str) -> &'a str {
        &source[self.open_end..self.inner_end]
    }

    pub fn outer<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// ASCII-only lowercasing that keeps byte offsets stable.
pub fn to_lowercase_fast(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

/// Remove `<!-- ... -->` blocks. An unterminated comment swallows the rest.
pub fn strip_comments(s: &str) -> Cow<'_, str> {
    if !s.contains("<!--") {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find("<!--") {
        out.push_str(&rest[..open]);
        match rest[open + 4..].find("-->") {
            Some(close) => rest = &rest[open + 4 + close + 3..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Read the tag at byte `i` (which must be `<`). Returns (closing, name).
fn tag_at(lc: &str, i: usize) -> Option<(bool, &str)> {
    let bytes = lc.as_bytes();
    let mut j = i + 1;
    let closing = bytes.get(j) == Some(&b'/');
    if closing {
        j += 1;
    }
    let name_start = j;
    while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'-') {
        j += 1;
    }
    if j == name_start || !bytes[name_start].is_ascii_alphabetic() {
        return None;
    }
    Some((closing, &lc[name_start..j]))
}

/// A `<` that starts a tag, end tag, comment or doctype rather than literal text.
fn is_markup(lc: &str, i: usize) -> bool {
    tag_at(lc, i).is_some() || lc[i + 1..].starts_with('!')
}

/// End of an opening tag (index just past `>`), skipping `>` inside quoted values.
fn open_tag_end(s: &str, start: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (off, ch) in s[start..].char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '>') => return Some(start + off + 1),
            _ => {}
        }
    }
    None
}

/// Parse attributes out of an opening tag such as `<td class="x" colspan=2 nowrap>`.
pub fn parse_attrs(open_tag: &str) -> Vec<(String, String)> {
    let body = open_tag
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim_end_matches('/');
    let mut chars = body.char_indices().peekable();
    // skip tag name
    while let Some((_, c)) = chars.peek() {
        if c.is_whitespace() {
            break;
        }
        chars.next();
    }

    let mut attrs = Vec::new();
    loop {
        while matches!(chars.peek(), Some((_, c)) if c.is_whitespace()) {
            chars.next();
        }
        let Some(&(name_start, _)) = chars.peek() else {
            break;
        };
        let mut name_end = body.len();
        while let Some(&(i, c)) = chars.peek() {
            if c == '=' || c.is_whitespace() {
                name_end = i;
                break;
            }
            chars.next();
        }
        let name = body[name_start..name_end].to_ascii_lowercase();
        while matches!(chars.peek(), Some((_, c)) if c.is_whitespace()) {
            chars.next();
        }
        if !matches!(chars.peek(), Some((_, '='))) {
            if !name.is_empty() {
                attrs.push((name, String::new()));
            }
            continue;
        }
        chars.next();
        while matches!(chars.peek(), Some((_, c)) if c.is_whitespace()) {
            chars.next();
        }
        let value = match chars.peek().copied() {
            Some((i, q)) if q == '"' || q == '\'' => {
                chars.next();
                let mut end = body.len();
                for (j, c) in chars.by_ref() {
                    if c == q {
                        end = j;
                        break;
                    }
                }
                &body[i + 1..end]
            }
            Some((i, _)) => {
                let mut end = body.len();
                while let Some(&(j, c)) = chars.peek() {
                    if c.is_whitespace() {
                        end = j;
                        break;
                    }
                    chars.next();
                }
                &body[i..end]
            }
            None => "",
        };
        if !name.is_empty() {
            attrs.push((name, decode_entities(value)));
        }
    }
    attrs
}

/// Find where the element opened at `open_end` ends. Returns (inner_end, end).
fn element_close(lc: &str, tag: &str, open_end: usize) -> (usize, usize) {
    if VOID.contains(&tag) {
        return (open_end, open_end);
    }
    let implied = IMPLIED_END.contains(&tag);
    let mut depth = 0usize;
    let mut pos = open_end;
    while let Some(rel) = lc[pos..].find('<') {
        let i = pos + rel;
        match tag_at(lc, i) {
            Some((true, name)) if name == tag => {
                if depth == 0 {
                    let end = lc[i..].find('>').map(|e| i + e + 1).unwrap_or(lc.len());
                    return (i, end);
                }
                depth -= 1;
            }
            Some((false, name)) if name == tag => {
                if implied {
                    return (i, i);
                }
                depth += 1;
            }
            // a closing parent ends an implied-end element
            Some((true, name)) if implied && is_implied_parent(tag, name) => return (i, i),
            _ => {}
        }
        pos = i + 1;
    }
    (lc.len(), lc.len())
}

fn is_implied_parent(tag: &str, closing: &str) -> bool {
    matches!(
        (tag, closing),
        ("option", "select")
            | ("tr", "table" | "tbody" | "thead" | "tfoot")
            | ("td" | "th", "tr" | "table")
            | ("li", "ul" | "ol")
            | ("p", "div" | "td")
    )
}

/// Locate the next element at or after `from` accepted by `accept`.
///
/// `lc` must be `to_lowercase_fast(s)`.
pub fn next_element<F>(s: &str, lc: &str, from: usize, mut accept: F) -> Option<Element>
where
    F: FnMut(&str, &[(String, String)]) -> bool,
{
    let mut pos = from;
    while let Some(rel) = lc.get(pos..)?.find('<') {
        let i = pos + rel;
        let Some((false, name)) = tag_at(lc, i) else {
            pos = i + 1;
            continue;
        };
        let Some(open_end) = open_tag_end(s, i) else {
            return None;
        };
        let attrs = parse_attrs(&s[i..open_end]);
        if accept(name, &attrs) {
            let tag = name.to_string();
            let (inner_end, end) = element_close(lc, &tag, open_end);
            return Some(Element {
                tag,
                attrs,
                start: i,
                open_end,
                inner_end,
                end,
            });
        }
        pos = open_end;
    }
    None
}

/// All non-overlapping elements accepted by `accept`, in document order.
/// An accepted element's subtree is not searched further.
pub fn elements<F>(s: &str, mut accept: F) -> Vec<Element>
where
    F: FnMut(&str, &[(String, String)]) -> bool,
{
    let lc = to_lowercase_fast(s);
    let mut out = Vec::new();
    let mut pos = 0usize;
    while let Some(el) = next_element(s, &lc, pos, &mut accept) {
        pos = el.end.max(el.open_end);
        out.push(el);
    }
    out
}

/// Decode the entities this system emits: named latin-1 accents, the XML five,
/// `&nbsp;` and numeric references.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let semi = tail
            .char_indices()
            .take_while(|(i, _)| *i < 12)
            .find(|(_, c)| *c == ';')
            .map(|(i, _)| i);
        let decoded = semi.and_then(|semi| decode_entity(&tail[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    let c = match name {
        "nbsp" => ' ',
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "ordm" => 'º',
        "ordf" => 'ª',
        "deg" => '°',
        "sup2" => '²',
        "sup3" => '³',
        "micro" => 'µ',
        "aacute" => 'á',
        "Aacute" => 'Á',
        "agrave" => 'à',
        "Agrave" => 'À',
        "acirc" => 'â',
        "Acirc" => 'Â',
        "atilde" => 'ã',
        "Atilde" => 'Ã',
        "eacute" => 'é',
        "Eacute" => 'É',
        "ecirc" => 'ê',
        "Ecirc" => 'Ê',
        "iacute" => 'í',
        "Iacute" => 'Í',
        "oacute" => 'ó',
        "Oacute" => 'Ó',
        "ocirc" => 'ô',
        "Ocirc" => 'Ô',
        "otilde" => 'õ',
        "Otilde" => 'Õ',
        "uacute" => 'ú',
        "Uacute" => 'Ú',
        "uuml" => 'ü',
        "ccedil" => 'ç',
        "Ccedil" => 'Ç',
        _ => return None,
    };
    Some(c)
}

/// Remove all tags. Block-level tags become a space so adjacent cells don't fuse.
pub fn strip_tags(s: &str) -> String {
    let lc = to_lowercase_fast(s);
    let mut out = String::with_capacity(s.len());
    let mut pos = 0usize;
    while let Some(rel) = s[pos..].find('<') {
        let i = pos + rel;
        out.push_str(&s[pos..i]);
        if !is_markup(&lc, i) {
            out.push('<');
            pos = i + 1;
            continue;
        }
        let Some(end) = open_tag_end(s, i) else {
            pos = s.len();
            break;
        };
        if let Some((_, name)) = tag_at(&lc, i) {
            if BLOCK.contains(&name) {
                out.push(' ');
            }
        }
        pos = end;
    }
    out.push_str(&s[pos..]);
    out
}

/// Collapse runs of whitespace into a single space and trim.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

/// Flatten a markup fragment to single-line text.
pub fn text_of(html: &str) -> String {
    normalize_ws(&decode_entities(&strip_tags(html)))
}

/// Flatten a note body keeping line structure: `<br>` and block ends become
/// newlines, each line is whitespace-collapsed, blank runs are dropped.
pub fn clean_multiline(html: &str) -> String {
    let lc = to_lowercase_fast(html);
    let mut marked = String::with_capacity(html.len());
    let mut pos = 0usize;
    while let Some(rel) = html[pos..].find('<') {
        let i = pos + rel;
        marked.push_str(&html[pos..i]);
        if !is_markup(&lc, i) {
            marked.push('<');
            pos = i + 1;
            continue;
        }
        let Some(end) = open_tag_end(html, i) else {
            pos = html.len();
            break;
        };
        match tag_at(&lc, i) {
            Some((_, "br")) | Some((true, "p")) | Some((true, "div")) | Some((true, "li")) => {
                marked.push('\n')
            }
            Some((_, name)) if BLOCK.contains(&name) => marked.push(' '),
            _ => {}
        }
        pos = end;
    }
    marked.push_str(&html[pos..]);

    let decoded = decode_entities(&marked);
    let lines: Vec<String> = decoded
        .lines()
        .map(normalize_ws)
        .filter(|l| !l.is_empty())
        .collect();
    lines.join("\n")
}

/// Comparison form of a field label: lowercase, unaccented, no whitespace.
/// "Clínica / Leito:" and "Clinica/Leito:" fold to the same string.
pub fn fold_label(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}
