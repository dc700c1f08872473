//! Fragment data structures for recognized frame content

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// One recognized-text item from a single camera frame
///
/// Produced by the external text recognizer; bounds are normalized
/// frame-relative coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextFragment {
    /// Recognized text content
    pub text: String,
    /// Bounding box in [0, 1] frame coordinates
    pub bounds: Rect,
}

impl TextFragment {
    /// Create a new text fragment
    pub fn new(text: impl Into<String>, bounds: Rect) -> Self {
        Self {
            text: text.into(),
            bounds,
        }
    }
}

/// A merged, per-frame part-number candidate
///
/// Exists only for the duration of one frame's processing; handed to the
/// normalizer and never persisted across frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Merged text content
    pub text: String,
    /// Union of the merged fragments' bounding boxes
    pub bounds: Rect,
}
