//! Search-key normalization
//!
//! Reduces candidate text to a canonical key so prefixed and bare variants
//! of the same number ("P/N C123-1", "PN: C123-1", "C123-1") dedup to one
//! lookup.

/// Characters stripped between a prefix token and the number proper
const PREFIX_TRAILERS: &[char] = &[':', '-', ' ', '\t'];

/// Normalize candidate text into its canonical search key.
///
/// Trims surrounding whitespace and strips a leading prefix token
/// (case-insensitive, longest token first) together with any separator
/// characters that follow it. Runs identically on single-fragment and
/// merged-fragment text.
pub fn normalize(text: &str) -> String {
    let trimmed = text.trim();

    // Longest-first so "P/N:" wins over "P/N"
    let mut tokens: Vec<&str> = super::PREFIX_TOKENS.to_vec();
    tokens.sort_by_key(|t| std::cmp::Reverse(t.len()));

    for token in tokens {
        if let Some(head) = trimmed.get(..token.len()) {
            if head.eq_ignore_ascii_case(token) {
                return trimmed[token.len()..]
                    .trim_start_matches(PREFIX_TRAILERS)
                    .to_string();
            }
        }
    }

    trimmed.to_string()
}
