//! Frame-local candidate pipeline
//!
//! Pure, synchronous stages run once per frame: plausibility filtering,
//! spatial merging of adjacent fragments, and search-key normalization.
//! Nothing in here blocks or touches shared state.

pub mod filter;
pub mod merge;
pub mod normalize;

pub use filter::is_plausible_part_number;
pub use merge::merge_fragments;
pub use normalize::normalize;

/// Separator/prefix tokens that label a part number on equipment placards.
///
/// Kept by the filter despite being short (they exist only to be merged with
/// an adjacent numeric fragment) and stripped by the normalizer.
pub const PREFIX_TOKENS: &[&str] = &["P/N", "PN", "P/N:", "PN:"];
