//! Uniform canvas sizing and anchor-based placement

use crate::anchor::AnchorPoint;
use crate::frame::TRANSPARENT;
use clap::ValueEnum;
use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};

/// Default padding factor applied to the largest content size.
pub const DEFAULT_CANVAS_PADDING: f64 = 1.1;

/// Fraction of the canvas height where feet land with [`VerticalAnchor::Bottom`].
const FEET_LINE: f64 = 0.9;

/// Fraction of the canvas height where the head lands with [`VerticalAnchor::Top`].
const HEAD_LINE: f64 = 0.1;

/// Vertical alignment policy.
///
/// | Policy | Aligned point | Canvas row |
/// |--------|---------------|------------|
/// | `center` | anchor center | `height / 2` |
/// | `bottom` | feet row | `round(height * 0.9)` |
/// | `top` | head row | `round(height * 0.1)` |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAnchor {
    /// Keep the visual center steady (idle, breathing loops)
    #[default]
    Center,
    /// Keep feet on one ground line (walk, jump)
    Bottom,
    /// Keep the head at a fixed height
    Top,
}

impl std::fmt::Display for VerticalAnchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerticalAnchor::Center => write!(f, "center"),
            VerticalAnchor::Bottom => write!(f, "bottom"),
            VerticalAnchor::Top => write!(f, "top"),
        }
    }
}

/// Target canvas shared by every frame of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
    pub vertical_anchor: VerticalAnchor,
}

impl CanvasSpec {
    pub fn new(width: u32, height: u32, vertical_anchor: VerticalAnchor) -> Self {
        Self { width, height, vertical_anchor }
    }

    /// Size a canvas from content sizes: the largest width and height, each
    /// multiplied by `padding` and rounded down.
    ///
    /// Explicit `width`/`height` replace the computed value for that axis.
    /// Returns `None` if `sizes` is empty.
    pub fn auto(
        sizes: impl IntoIterator<Item = (u32, u32)>,
        padding: f64,
        width: Option<u32>,
        height: Option<u32>,
        vertical_anchor: VerticalAnchor,
    ) -> Option<Self> {
        let (max_w, max_h) = sizes
            .into_iter()
            .fold(None, |acc: Option<(u32, u32)>, (w, h)| match acc {
                Some((mw, mh)) => Some((mw.max(w), mh.max(h))),
                None => Some((w, h)),
            })?;

        let pad = |v: u32| (v as f64 * padding).floor() as u32;
        Some(Self {
            width: width.unwrap_or_else(|| pad(max_w)),
            height: height.unwrap_or_else(|| pad(max_h)),
            vertical_anchor,
        })
    }

    pub fn center_x(&self) -> i64 {
        (self.width / 2) as i64
    }

    pub fn center_y(&self) -> i64 {
        (self.height / 2) as i64
    }

    /// A fully transparent canvas of this size.
    pub fn blank(&self) -> RgbaImage {
        RgbaImage::from_pixel(self.width, self.height, TRANSPARENT)
    }

    /// Top-left position at which to paste a content crop.
    ///
    /// `anchor` must be in content-local coordinates. Fractional anchor
    /// values are truncated toward zero before subtracting.
    pub fn paste_offset(&self, anchor: &AnchorPoint) -> (i64, i64) {
        let x = self.center_x() - anchor.center_x as i64;
        let y = match self.vertical_anchor {
            VerticalAnchor::Center => self.center_y() - anchor.center_y as i64,
            VerticalAnchor::Bottom => line(self.height, FEET_LINE) - anchor.feet_y as i64,
            VerticalAnchor::Top => line(self.height, HEAD_LINE) - anchor.head_y as i64,
        };
        (x, y)
    }

    /// Composite a content crop onto a fresh transparent canvas.
    ///
    /// Pixels falling outside the canvas are clipped.
    ///
    /// # Returns
    ///
    /// The canvas and the paste offset used.
    pub fn place(&self, content: &RgbaImage, anchor: &AnchorPoint) -> (RgbaImage, (i64, i64)) {
        let mut canvas = self.blank();
        let (x, y) = self.paste_offset(anchor);
        imageops::replace(&mut canvas, content, x, y);
        (canvas, (x, y))
    }
}

/// Canvas row at `fraction` of `height`, rounded.
fn line(height: u32, fraction: f64) -> i64 {
    (height as f64 * fraction).round() as i64
}
