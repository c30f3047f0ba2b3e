//! History of present illness (HDA) extraction.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Minimum length of a labeled capture.
const MIN_LABELED: usize = 20;
/// Sentences shorter than this are ignored by the fallback.
const MIN_SENTENCE: usize = 30;
/// Minimum length of a fallback sentence.
const MIN_FALLBACK: usize = 50;

/// Section labels in priority order, each followed by the number of extra
/// sentences the capture may run on for.
const SECTIONS: &[(&str, usize)] = &[
    ("HDA", 5),
    ("História da doença atual", 5),
    ("História atual", 5),
    ("Doença atual", 5),
    ("Quadro atual", 5),
    ("Evolução", 3),
];

static SECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SECTIONS
        .iter()
        .map(|(label, extra)| {
            Regex::new(&format!(r"(?i){label}[:\s]*([^.]+(?:\.[^.]*){{0,{extra}}})"))
                .expect("valid HDA section regex")
        })
        .collect()
});

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]").expect("valid sentence regex"));

/// A short label followed by a number, as in "Hb 8,3" or "Creat: 1.2".
static LAB_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\p{L}{2,12}\s*[:=]?\s*-?\d+(?:[.,]\d+)?").expect("valid lab pair regex")
});

static LAB_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:exames?|labs?|laborat[oó]rio|resultados?)\b")
        .expect("valid lab heading regex")
});

/// Extract the history of present illness from a note's flattened text.
///
/// Labeled sections are tried in order and the first capture longer than 20
/// characters wins. Without a labeled section, the first sentence longer than
/// 50 characters that is not a lab result line is used.
pub fn extract_hda(text: &str) -> Option<String> {
    for (pattern, (label, _)) in SECTION_PATTERNS.iter().zip(SECTIONS) {
        let Some(caps) = pattern.captures(text) else {
            continue;
        };
        let hda = caps[1].trim();
        if hda.chars().count() > MIN_LABELED {
            debug!(label, chars = hda.chars().count(), "found labeled HDA");
            return Some(hda.to_string());
        }
    }

    let sentence = SENTENCE_END
        .split(text)
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_SENTENCE)
        .find(|s| s.chars().count() > MIN_FALLBACK && !is_lab_line(s))?;
    debug!(chars = sentence.chars().count(), "using leading sentence as HDA");
    Some(sentence.to_string())
}

/// Whether a sentence reads like a list of lab values rather than narrative.
pub fn is_lab_line(sentence: &str) -> bool {
    LAB_HEADING.is_match(sentence) || LAB_PAIR.find_iter(sentence).count() >= 3
}
