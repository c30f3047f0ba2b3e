//! Queries over an extracted note list.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use crate::dates::parse_datetime;
use crate::models::ClinicalNote;

/// Notes dated within `[from, to]`. Notes with an unparsable date are excluded.
pub fn notes_in_period(
    notes: &[ClinicalNote],
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Vec<&ClinicalNote> {
    notes
        .iter()
        .filter(|n| parse_datetime(&n.noted_at).is_some_and(|at| at >= from && at <= to))
        .collect()
}

/// Notes whose author name contains `needle`, ignoring case.
pub fn notes_by_author<'a>(notes: &'a [ClinicalNote], needle: &str) -> Vec<&'a ClinicalNote> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    notes
        .iter()
        .filter(|n| n.author_name.to_lowercase().contains(&needle))
        .collect()
}

/// Distinct non-empty author names, sorted.
pub fn unique_authors(notes: &[ClinicalNote]) -> Vec<String> {
    notes
        .iter()
        .map(|n| n.author_name.trim())
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn note(author: &str, at: &str) -> ClinicalNote {
        ClinicalNote {
            author_name: author.into(),
            noted_at: at.into(),
            ..Default::default()
        }
    }

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_period_is_inclusive() {
        let notes = vec![
            note("A", "01/03/2024 00:00"),
            note("B", "05/03/2024 12:00"),
            note("C", "10/03/2024 00:00"),
            note("D", "sem data"),
        ];
        let found = notes_in_period(&notes, day(1), day(10));
        let authors: Vec<_> = found.iter().map(|n| n.author_name.as_str()).collect();
        assert_eq!(authors, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_by_author_ignores_case() {
        let notes = vec![note("Ana Lima", ""), note("Bruno", ""), note("ANA PAULA", "")];
        assert_eq!(notes_by_author(&notes, "ana").len(), 2);
        assert!(notes_by_author(&notes, "  ").is_empty());
    }

    #[test]
    fn test_unique_authors_sorted() {
        let notes = vec![note("Bruno", ""), note("Ana", ""), note("Bruno ", ""), note("", "")];
        assert_eq!(unique_authors(&notes), vec!["Ana", "Bruno"]);
    }
}
