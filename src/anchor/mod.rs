//! Anchor resolution for character frames
//!
//! An anchor point marks where a character's visual center, foot contact row
//! and head top row sit inside a frame. Several interchangeable strategies can
//! produce one; they are tried in a fixed priority order:
//!
//! | Rank | Source | Input |
//! |------|--------|-------|
//! | 1 | [`AnchorSource::PrecomputedFile`] | JSON mapping keyed by frame file name |
//! | 2 | [`AnchorSource::PixelCentroid`] | alpha channel of the frame |
//! | 3 | [`AnchorSource::ExternalVisionHint`] | external vision service response |
//! | 4 | [`AnchorSource::BoundingBoxGeometric`] | content bounding box (always succeeds) |
//!
//! The chain lives in [`AnchorChain`]; adding a strategy means implementing
//! [`AnchorStrategy`] and registering it there.

mod chain;
mod file;
mod pixel;
mod vision;

pub use chain::{AnchorChain, AnchorStrategy, FrameContext, ResolvedAnchor, StrategyMiss};
pub use file::{AnchorFile, AnchorFileError};
pub use pixel::{find_anchor_points, PixelAnchorOptions, PixelAnchors, DEFAULT_FEET_DENSITY, DEFAULT_HEAD_DENSITY};
pub use vision::{
    parse_vision_response, HintDirectory, VisionAnalyzer, VisionAnchors, VisionError, VisionHint,
};

use crate::classify::ContentBBox;
use serde::{Deserialize, Serialize};

/// Semantic reference points of a character.
///
/// Coordinates are in the pixel space of the frame they were resolved from
/// until [`AnchorPoint::to_local`] moves them into a content crop.
/// `head_y <= center_y <= feet_y` is expected but not enforced; see
/// [`AnchorPoint::is_ordered`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub center_x: f64,
    pub center_y: f64,
    pub feet_y: f64,
    pub head_y: f64,
}

impl AnchorPoint {
    pub fn new(center_x: f64, center_y: f64, feet_y: f64, head_y: f64) -> Self {
        Self { center_x, center_y, feet_y, head_y }
    }

    /// Translate into the coordinate space of the crop starting at the bbox's top-left corner.
    pub fn to_local(&self, bbox: &ContentBBox) -> Self {
        let (left, top) = (bbox.left as f64, bbox.top as f64);
        Self {
            center_x: self.center_x - left,
            center_y: self.center_y - top,
            feet_y: self.feet_y - top,
            head_y: self.head_y - top,
        }
    }

    /// Whether head, center and feet appear top to bottom.
    pub fn is_ordered(&self) -> bool {
        self.head_y <= self.center_y && self.center_y <= self.feet_y
    }
}

impl std::fmt::Display for AnchorPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "center=({:.1},{:.1}) feet_y={:.1} head_y={:.1}",
            self.center_x, self.center_y, self.feet_y, self.head_y
        )
    }
}

/// Where an anchor point came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorSource {
    BoundingBoxGeometric,
    PixelCentroid,
    ExternalVisionHint,
    PrecomputedFile,
}

impl AnchorSource {
    /// Priority rank; the chain tries higher ranks first.
    pub fn rank(&self) -> u8 {
        match self {
            AnchorSource::PrecomputedFile => 3,
            AnchorSource::PixelCentroid => 2,
            AnchorSource::ExternalVisionHint => 1,
            AnchorSource::BoundingBoxGeometric => 0,
        }
    }
}

impl std::fmt::Display for AnchorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnchorSource::PrecomputedFile => write!(f, "anchor-file"),
            AnchorSource::PixelCentroid => write!(f, "pixel"),
            AnchorSource::ExternalVisionHint => write!(f, "vision"),
            AnchorSource::BoundingBoxGeometric => write!(f, "bbox"),
        }
    }
}

/// Anchor derived purely from the content bounding box.
///
/// Center is the integer midpoint, feet the (exclusive) bottom edge and head
/// the top edge.
pub fn geometric_anchor(bbox: &ContentBBox) -> AnchorPoint {
    AnchorPoint {
        center_x: (bbox.left + bbox.width() / 2) as f64,
        center_y: (bbox.top + bbox.height() / 2) as f64,
        feet_y: bbox.bottom as f64,
        head_y: bbox.top as f64,
    }
}
