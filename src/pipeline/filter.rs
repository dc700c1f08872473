//! Fragment plausibility filter
//!
//! Classifies a raw recognized-text fragment as plausibly part of a part
//! number or discards it before merging. Pure function of the text.

/// Characters allowed in a part-number fragment besides alphanumerics
const ALLOWED_SEPARATORS: &[char] = &['-', '_', '.', '/', ':', ' '];

/// Maximum plausible part-number fragment length
const MAX_LEN: usize = 25;

/// Minimum plausible part-number fragment length
const MIN_LEN: usize = 2;

/// Decide whether a recognized fragment could be (part of) a part number.
///
/// Known prefix tokens ("P/N", "PN", ...) pass outright even though they are
/// short and digit-free; they only become useful once merged with an
/// adjacent numeric fragment. Everything else must look like an identifier:
/// bounded length, at least one digit, restricted charset, and not a bare
/// one- or two-digit number (page numbers, quantities, similar noise).
pub fn is_plausible_part_number(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }

    if super::PREFIX_TOKENS
        .iter()
        .any(|t| t.eq_ignore_ascii_case(trimmed))
    {
        return true;
    }

    let len = trimmed.chars().count();
    if !(MIN_LEN..=MAX_LEN).contains(&len) {
        return false;
    }

    if !trimmed.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || ALLOWED_SEPARATORS.contains(&c))
    {
        return false;
    }

    // Reject short purely numeric strings (page numbers etc.)
    let purely_numeric = trimmed.chars().all(|c| c.is_ascii_digit());
    if purely_numeric && len < 3 {
        return false;
    }

    true
}
