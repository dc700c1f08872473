//! Match resolution
//!
//! Evaluates catalog lookup results against a search key: an exact
//! case-insensitive match wins, and longer catalog numbers extending the key
//! are reported as conflicts (the recognizer may have truncated a longer
//! printed number).

use crate::catalog::CatalogItem;

/// A decisive catalog match for a scanned key
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// The catalog item whose number exactly equals the scanned key
    pub matched_item: CatalogItem,
    /// Catalog items whose numbers strictly extend the scanned key,
    /// surfaced as a truncation warning, never as alternative matches
    pub conflicts: Vec<CatalogItem>,
}

/// Outcome of evaluating one lookup result list
#[derive(Debug, Clone)]
pub enum Resolution {
    /// No exact match; the engine keeps scanning
    NoMatch,
    /// Exact match, possibly with longer-variant conflicts
    Matched(MatchResult),
}

/// Resolve lookup results for `key`.
///
/// Exact match takes priority over any number of conflicting longer
/// variants; the scanned text is the primary result.
pub fn resolve(key: &str, results: &[CatalogItem]) -> Resolution {
    let key_lower = key.to_lowercase();

    let exact = results
        .iter()
        .find(|item| item.number.to_lowercase() == key_lower);

    let Some(exact) = exact else {
        return Resolution::NoMatch;
    };

    let conflicts: Vec<CatalogItem> = results
        .iter()
        .filter(|item| {
            let number = item.number.to_lowercase();
            number != key_lower && number.starts_with(&key_lower)
        })
        .cloned()
        .collect();

    Resolution::Matched(MatchResult {
        matched_item: exact.clone(),
        conflicts,
    })
}
