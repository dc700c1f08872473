//! Spatial merge unit
//!
//! Recognizers frequently split one printed part number into several
//! fragments ("P/N" and "C123-1", or a number broken at a hyphen). This
//! stage greedily merges fragments that sit on the same visual line and are
//! horizontally adjacent, producing per-frame candidates.

use crate::config::MergeConfig;
use crate::frame::{Candidate, TextFragment};

/// Merge same-line, horizontally adjacent fragments into candidates.
///
/// Iterative within the frame: each incoming fragment is tested against the
/// accumulated merged list and folded into the first entry it pairs with,
/// else it starts a new entry. Ties go to first-match order in the per-frame
/// iteration; the result is frame-local, not globally optimal.
pub fn merge_fragments(fragments: Vec<TextFragment>, config: &MergeConfig) -> Vec<Candidate> {
    let mut merged: Vec<Candidate> = Vec::with_capacity(fragments.len());

    for fragment in fragments {
        let slot = merged
            .iter()
            .position(|c| should_merge(c, &fragment, config));

        match slot {
            Some(i) => {
                let folded = merge_pair(&merged[i], &fragment);
                merged[i] = folded;
            }
            None => merged.push(Candidate {
                text: fragment.text,
                bounds: fragment.bounds,
            }),
        }
    }

    merged
}

/// Same visual line and horizontally adjacent?
fn should_merge(candidate: &Candidate, fragment: &TextFragment, config: &MergeConfig) -> bool {
    let same_line = candidate.bounds.vertical_overlap(&fragment.bounds) > config.vertical_overlap;
    let adjacent = candidate.bounds.horizontal_gap(&fragment.bounds) < config.horizontal_gap;
    same_line && adjacent
}

/// Merge two units left-to-right by min x, joining texts with one space and
/// taking the union of the bounding boxes.
fn merge_pair(candidate: &Candidate, fragment: &TextFragment) -> Candidate {
    let (left_text, right_text) = if candidate.bounds.x <= fragment.bounds.x {
        (candidate.text.as_str(), fragment.text.as_str())
    } else {
        (fragment.text.as_str(), candidate.text.as_str())
    };

    Candidate {
        text: format!("{} {}", left_text, right_text),
        bounds: candidate.bounds.union(&fragment.bounds),
    }
}
